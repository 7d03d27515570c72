//! RZ-007: Resolution invoker: hand the merged request to the resolver.
//!
//! The invoker owns output capture, so it always asks the resolver to run
//! quiet whatever the caller's verbosity. It only distinguishes success from
//! failure and keeps the failed-attempt count the resolver reports.

use super::artifacts::ContextFiles;
use super::types::{
    EnvOptions, ResolutionOptions, ResolutionOutcome, ResolveFailure, PACKAGES_PATH_VAR,
};
use crate::transport::{self, ToolCommand};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// External resolver contract: on success the bake file at
/// `options.env_file` has been written.
pub trait Resolver {
    fn resolve(&self, options: &ResolutionOptions) -> Result<(), ResolveFailure>;
}

/// Per-resolution inputs that don't come from the CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ResolveInputs {
    /// Encoded request text
    pub request: String,
    /// Prepended to the package search path
    pub package_paths: Vec<PathBuf>,
    /// False when a wrapper expansion forced the cache off
    pub allow_cache: bool,
}

/// Build the option snapshot for one resolution.
pub fn build_options(
    opts: &EnvOptions,
    inputs: &ResolveInputs,
    files: &ContextFiles,
) -> ResolutionOptions {
    ResolutionOptions {
        request: inputs.request.clone(),
        mode: opts.mode.clone(),
        time: (opts.time > 0).then_some(opts.time),
        ignore_blacklist: opts.ignore_blacklist,
        ignore_archiving: opts.ignore_archiving,
        assume_transitivity: !opts.no_assume_transitivity,
        use_cache: inputs.allow_cache && !opts.no_cache,
        no_os: opts.no_os,
        build_requires: opts.build_requires,
        no_local: opts.no_local,
        max_fails: opts.view_fail,
        quiet: true,
        meta_info: "tools".to_string(),
        env_file: files.bake().to_path_buf(),
        dot_file: files.dot().to_path_buf(),
        package_paths: inputs.package_paths.clone(),
    }
}

/// Synchronous call into a resolver.
pub struct ResolutionInvoker<'a> {
    resolver: &'a dyn Resolver,
}

impl<'a> ResolutionInvoker<'a> {
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        Self { resolver }
    }

    pub fn invoke(
        &self,
        opts: &EnvOptions,
        inputs: &ResolveInputs,
        files: &ContextFiles,
    ) -> ResolutionOutcome {
        let options = build_options(opts, inputs, files);
        tracing::info!(request = %options.request, mode = %options.mode, "resolving");

        match self.resolver.resolve(&options) {
            Ok(()) => ResolutionOutcome::Success {
                env_file: options.env_file,
            },
            Err(failure) => ResolutionOutcome::Failure {
                attempt_count: failure.attempts,
                dot_graph: options.dot_file,
                message: failure.message,
            },
        }
    }
}

/// Resolver backed by an external program speaking the `rez-config` flags.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    pub program: String,
    /// Existing REZ_PACKAGES_PATH the prepended paths are joined onto
    pub packages_path: Option<String>,
}

impl CommandResolver {
    /// Command line for one resolution.
    pub fn command(&self, options: &ResolutionOptions) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program)
            .arg("--print-env")
            .arg(format!("--meta-info={}", options.meta_info))
            .arg(format!("--meta-info-shallow={}", options.meta_info))
            .arg(format!("--dot-file={}", options.dot_file.display()))
            .arg(format!("--mode={}", options.mode));

        if let Some(t) = options.time {
            cmd = cmd.arg(format!("--time={}", t));
        }
        if let Some(n) = options.max_fails {
            cmd = cmd.arg(format!("--max-fails={}", n));
        }
        let toggles = [
            (!options.assume_transitivity, "--no-assume-dt"),
            (options.ignore_archiving, "--ignore-archiving"),
            (options.ignore_blacklist, "--ignore-blacklist"),
            (options.build_requires, "--build-requires"),
            (options.no_os, "--no-os"),
            (options.no_local, "--no-local"),
            (!options.use_cache, "--no-cache"),
            (options.quiet, "--quiet"),
        ];
        for (on, flag) in toggles {
            if on {
                cmd = cmd.arg(flag);
            }
        }

        cmd = cmd.args(options.request.split_whitespace());

        if let Some(path) = self.search_path(options) {
            cmd = cmd.env(PACKAGES_PATH_VAR, path);
        }
        cmd.stdout_to(&options.env_file)
    }

    fn search_path(&self, options: &ResolutionOptions) -> Option<String> {
        if options.package_paths.is_empty() {
            return None;
        }
        let mut entries: Vec<String> = options
            .package_paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        if let Some(existing) = self.packages_path.as_deref().filter(|p| !p.is_empty()) {
            entries.push(existing.to_string());
        }
        Some(entries.join(":"))
    }
}

impl Resolver for CommandResolver {
    fn resolve(&self, options: &ResolutionOptions) -> Result<(), ResolveFailure> {
        let out = transport::exec(&self.command(options)).map_err(|e| ResolveFailure {
            attempts: None,
            message: e,
        })?;
        if out.success() {
            return Ok(());
        }
        let stderr = out.stderr.trim();
        Err(ResolveFailure {
            attempts: parse_attempts(stderr),
            message: if stderr.is_empty() {
                format!("{} exited with code {}", self.program, out.exit_code)
            } else {
                stderr.to_string()
            },
        })
    }
}

/// Failed-attempt count in resolver diagnostics, e.g. `3 failed attempts`
/// or `failed attempts: 3`.
static ATTEMPTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(\d+)\s+failed\s+attempts?|failed\s+attempts?\s*[:=]?\s*(\d+))")
        .expect("attempt-count pattern is valid")
});

pub fn parse_attempts(text: &str) -> Option<u32> {
    let caps = ATTEMPTS_RE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}
