//! RZ-013: CLI flags, the process-environment boundary and dispatch.
//!
//! This is the only module that reads the process environment. Everything
//! below it works on an explicit `EnvironmentContext`.

use crate::core::codegen::{ScriptHandoff, ShellSpawner};
use crate::core::config::{self, EnvConfig, CONFIG_ENV_VAR};
use crate::core::error::EnvError;
use crate::core::executor::{self, RunConfig};
use crate::core::recovery::CommandDotRenderer;
use crate::core::resolver::CommandResolver;
use crate::core::types::{EnvOptions, EnvironmentContext};
use crate::core::wrapper::CommandWrapperExpander;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Invoke a shell based on a package request.
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// List of package names
    #[arg(required = true, num_args = 1..)]
    pub pkg: Vec<String>,

    /// Set the package resolution mode [default: latest]
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Suppress unnecessary output
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't implicitly request the operating system package
    #[arg(short = 'o', long = "no-os", visible_alias = "no_os")]
    pub no_os: bool,

    /// Include build-only package requirements
    #[arg(short = 'b', long = "build-requires", visible_alias = "build")]
    pub build_requires: bool,

    /// Disable caching
    #[arg(long)]
    pub no_cache: bool,

    /// Include archived packages
    #[arg(short = 'g', long = "ignore-archiving", visible_alias = "ignore_archiving")]
    pub ignore_archiving: bool,

    /// Include blacklisted packages
    #[arg(short = 'u', long = "ignore-blacklist", visible_alias = "ignore_blacklist")]
    pub ignore_blacklist: bool,

    /// Do not assume dependency transitivity
    #[arg(short = 'd', long = "no-assume-dt", visible_alias = "no_assume_dt")]
    pub no_assume_dt: bool,

    /// Ignore packages newer than the given epoch time
    #[arg(short = 'i', long, default_value_t = 0)]
    pub time: u64,

    /// Don't load local packages
    #[arg(long)]
    pub no_local: bool,

    /// Set the prompt decorator
    #[arg(short, long, default_value = ">")]
    pub prompt: String,

    /// Source this file after the new shell is invoked
    #[arg(short, long)]
    pub rcfile: Option<PathBuf>,

    /// Set the temp directory manually, system temp otherwise
    #[arg(long)]
    pub tmpdir: Option<PathBuf>,

    /// Propagate rcfile into subshells
    #[arg(long = "propogate-rcfile", visible_alias = "propagate-rcfile")]
    pub propagate_rcfile: bool,

    /// Read commands from stdin, rather than starting an interactive shell
    #[arg(short, long)]
    pub stdin: bool,

    /// Add mode (loose). Packages override or add to the existing request list
    #[arg(short = 'a', long = "add-loose", visible_alias = "add_loose")]
    pub add_loose: bool,

    /// Add mode (strict). Packages override or add to the existing resolve list
    #[arg(short = 't', long = "add-strict", visible_alias = "add_strict")]
    pub add_strict: bool,

    /// View the dot graph for the Nth failed config attempt
    #[arg(
        short = 'f',
        long = "view-fail",
        visible_alias = "view_fail",
        default_value_t = -1,
        allow_negative_numbers = true
    )]
    pub view_fail: i64,

    /// Config file [default: $REZ_ENV_CONFIG, then ~/.rez-env.yaml]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl EnvArgs {
    /// Flags as workflow options, with config defaults filling the gaps.
    pub fn to_options(&self, config: &EnvConfig) -> EnvOptions {
        EnvOptions {
            packages: self.pkg.clone(),
            mode: self
                .mode
                .clone()
                .unwrap_or_else(|| config.defaults.mode.clone()),
            quiet: self.quiet,
            no_os: self.no_os,
            build_requires: self.build_requires,
            no_cache: self.no_cache,
            ignore_archiving: self.ignore_archiving,
            ignore_blacklist: self.ignore_blacklist,
            no_assume_transitivity: self.no_assume_dt,
            time: self.time,
            no_local: self.no_local,
            prompt: self.prompt.clone(),
            rcfile: self.rcfile.clone(),
            tmpdir: self.tmpdir.clone().or_else(|| config.defaults.tmpdir.clone()),
            propagate_rcfile: self.propagate_rcfile,
            stdin: self.stdin,
            add_loose: self.add_loose,
            add_strict: self.add_strict,
            view_fail: u32::try_from(self.view_fail).ok(),
        }
    }
}

/// Snapshot the process environment.
pub fn read_environment() -> EnvironmentContext {
    let has_bashrc = dirs::home_dir()
        .map(|home| home.join(".bashrc").exists())
        .unwrap_or(false);
    EnvironmentContext::from_lookup(|name| std::env::var(name).ok(), has_bashrc)
}

/// Load config from `--config`, `$REZ_ENV_CONFIG`, or the home directory.
pub fn load_config(args: &EnvArgs) -> Result<EnvConfig, EnvError> {
    let from_env = std::env::var(CONFIG_ENV_VAR).ok();
    let path = config::locate_config(args.config.as_deref(), from_env.as_deref());
    if let Some(ref p) = path {
        tracing::debug!(path = %p.display(), "loading config");
    }
    config::load_config(path.as_deref())
}

/// Run rez-env: resolve, then write the hand-off script to `out`.
pub fn dispatch<W: Write>(
    args: &EnvArgs,
    config: &EnvConfig,
    ctx: &EnvironmentContext,
    out: W,
) -> Result<(), EnvError> {
    let options = args.to_options(config);

    let resolver = CommandResolver {
        program: config.tools.resolver.clone(),
        packages_path: ctx.packages_path.clone(),
    };
    let renderer = CommandDotRenderer {
        program: config.tools.dot_renderer.clone(),
    };
    let expander = CommandWrapperExpander {
        program: config.tools.wrapper_expander.clone(),
    };

    let cfg = RunConfig {
        options: &options,
        resolver: &resolver,
        renderer: &renderer,
        expander: &expander,
        expander_name: &config.tools.wrapper_expander,
        shell: &config.shell,
    };
    let session = executor::run_env(&cfg, ctx)?;

    ScriptHandoff::new(out).spawn(&session, &options, ctx)
}
