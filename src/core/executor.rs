//! RZ-012: Executor: orchestration of one env invocation.
//!
//! flags → wrapper check → (expand) → patch → encode → resolve →
//! recover on failure, or bake + hand off on success.
//!
//! Nothing touches the filesystem before the patch-mode and wrapper checks
//! pass. From the moment `ContextFiles` exists, every early return drops it
//! and so deletes the bake, source and dot files.

use super::artifacts::{ContextFiles, HandedOff};
use super::codegen;
use super::config::ShellConfig;
use super::error::EnvError;
use super::patch;
use super::recovery::{DotRenderer, FailureRecovery, ResolveState};
use super::request;
use super::resolver::{ResolutionInvoker, ResolveInputs, Resolver};
use super::types::*;
use super::wrapper::{self, ScratchDir, WrapperExpander, WrapperExpansion};
use std::io::Write;
use std::path::PathBuf;

/// Everything one run needs besides the environment snapshot.
pub struct RunConfig<'a> {
    pub options: &'a EnvOptions,
    pub resolver: &'a dyn Resolver,
    pub renderer: &'a dyn DotRenderer,
    pub expander: &'a dyn WrapperExpander,
    /// Name used in wrapper-expansion error messages
    pub expander_name: &'a str,
    pub shell: &'a ShellConfig,
}

/// A resolved environment ready for the shell spawner.
#[derive(Debug, Clone)]
pub struct EnvSession {
    /// Encoded request passed to the resolver
    pub request: String,
    /// Unpatched package text (post wrapper expansion)
    pub raw_request: String,
    /// Bake and source files, now owned by the spawner
    pub files: HandedOff,
    /// Variables for the new shell
    pub exports: EnvExports,
}

/// Run the full workflow.
pub fn run_env(cfg: &RunConfig, ctx: &EnvironmentContext) -> Result<EnvSession, EnvError> {
    let opts = cfg.options;
    let mode = PatchMode::from_flags(opts.add_loose, opts.add_strict)?;
    if opts.packages.is_empty() {
        return Err(EnvError::Config("no packages requested".to_string()));
    }
    wrapper::check_patch_compatibility(&opts.packages, ctx.raw_request.as_deref(), mode)?;

    // Wrapper requests resolve against their expanded manifest; the scratch
    // dir doubles as the temp dir for the context files.
    let scratch = if wrapper::has_wrapper_syntax(&opts.packages) {
        Some(ScratchDir::create(opts.tmpdir.as_deref())?)
    } else {
        None
    };
    let expansion = match scratch {
        Some(ref dir) => Some(wrapper::expand_wrappers(
            cfg.expander,
            &opts.packages,
            dir.path(),
            cfg.expander_name,
        )?),
        None => None,
    };
    let packages: &[String] = match expansion {
        Some(ref e) => &e.packages,
        None => &opts.packages,
    };
    let raw_request = packages.join(" ");

    let prior = patch::prior_source(mode, ctx).unwrap_or_default();
    let merged = patch::patch(prior, packages, mode).map_err(as_resolution_failure)?;
    if merged.patched && !opts.quiet {
        eprintln!("{}", patch::describe(&merged.request));
    }
    let request_text = request::encode(&merged.request);

    let dir = match scratch {
        Some(ref s) => s.path().to_path_buf(),
        None => opts.tmpdir.clone().unwrap_or_else(std::env::temp_dir),
    };
    let files = ContextFiles::create(&dir)?;

    let inputs = ResolveInputs {
        request: request_text.clone(),
        package_paths: expansion.iter().map(|e| e.package_path.clone()).collect(),
        allow_cache: expansion.as_ref().map_or(true, WrapperExpansion::use_cache),
    };
    let outcome = ResolutionInvoker::new(cfg.resolver).invoke(opts, &inputs, &files);

    match ResolveState::Resolving.advance(outcome)? {
        ResolveState::Failed {
            attempts,
            dot_file,
            message,
        } => {
            let err = FailureRecovery::new(cfg.renderer, opts.view_fail).recover(
                attempts,
                &dot_file,
                &message,
            );
            drop(files);
            return Err(err);
        }
        state => tracing::debug!(?state, "resolution finished"),
    }

    if expansion.is_some() {
        append_raw_request(&files, &raw_request)?;
    }

    let exports = build_exports(opts, ctx, &raw_request, files.bake().to_path_buf());

    if !opts.stdin {
        let contents = codegen::source_file_contents(
            files.bake(),
            opts.rcfile.as_deref(),
            opts.quiet,
            cfg.shell,
        );
        std::fs::write(files.source(), contents)
            .map_err(|e| EnvError::io("cannot write", files.source(), e))?;
    }

    if let Some(dir) = scratch {
        let kept = dir.keep();
        tracing::debug!(scratch = %kept.display(), "keeping wrapper scratch dir");
    }

    tracing::info!(request = %request_text, context = %files.bake().display(), "environment resolved");
    Ok(EnvSession {
        request: request_text,
        raw_request,
        files: files.hand_off(),
        exports,
    })
}

/// A request the resolver can never accept fails the resolution.
fn as_resolution_failure(err: EnvError) -> EnvError {
    match err {
        EnvError::MalformedRequest { .. } => EnvError::ResolutionFailure {
            attempts: None,
            message: err.to_string(),
        },
        other => other,
    }
}

/// Wrapper environments record their expanded request in the bake file.
fn append_raw_request(files: &ContextFiles, raw_request: &str) -> Result<(), EnvError> {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(files.bake())
        .map_err(|e| EnvError::io("cannot open", files.bake(), e))?;
    writeln!(
        f,
        "export {}={}",
        RAW_REQUEST_VAR,
        codegen::shell_quote(raw_request)
    )
    .map_err(|e| EnvError::io("cannot write", files.bake(), e))
}

/// Variables the new shell inherits.
fn build_exports(
    opts: &EnvOptions,
    ctx: &EnvironmentContext,
    raw_request: &str,
    bake: PathBuf,
) -> EnvExports {
    let mut exports = EnvExports::default();
    if ctx.raw_request.is_none() {
        exports.push(RAW_REQUEST_VAR, raw_request);
    }
    exports.push(CONTEXT_FILE_VAR, bake.to_string_lossy());
    exports.push(PROMPT_VAR, format!("{}{}", ctx.prompt, opts.prompt));
    if opts.propagate_rcfile {
        if let Some(ref rc) = opts.rcfile {
            exports.push(RCFILE_VAR, rc.to_string_lossy());
        }
    }
    exports
}
