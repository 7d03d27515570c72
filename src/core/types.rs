//! RZ-002: Core types: package specs, structured requests, patch modes,
//! resolution options and outcomes, and the explicit environment context.

use super::error::EnvError;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Package specs and requests
// ============================================================================

/// Characters that end the family name of a package spec.
const FAMILY_TERMINATORS: &[char] = &['-', '=', '<', '>', '+', '@', '#', '('];

/// A single package request token, e.g. `foo`, `foo-1.0`, `~bar-2+`, `!baz`.
///
/// Opaque to this crate apart from its family name, which drives
/// last-wins override when patching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec(String);

impl PackageSpec {
    /// Build a spec from a token. Rejects empty tokens and tokens that would
    /// not survive an encode/parse cycle.
    pub fn new(token: &str) -> Result<Self, EnvError> {
        if token.is_empty() {
            return Err(EnvError::malformed(token, "empty package token"));
        }
        if token.chars().any(|c| c.is_whitespace() || c == '|') {
            return Err(EnvError::malformed(
                token,
                "package token may not contain whitespace or '|'",
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family name used for override matching. A leading weak (`~`) or
    /// conflict (`!`) marker is ignored so `!foo` overrides `foo`.
    pub fn family(&self) -> &str {
        let bare = self
            .0
            .strip_prefix('~')
            .or_else(|| self.0.strip_prefix('!'))
            .unwrap_or(&self.0);
        match bare.find(FAMILY_TERMINATORS) {
            Some(0) | None => bare,
            Some(end) => &bare[..end],
        }
    }

    /// True if the token uses auto-wrapper bracket syntax.
    pub fn is_wrapper(&self) -> bool {
        self.0.contains('(')
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A structured request: packages common to every subshell, plus parallel
/// subshell groups. Text form is `base | subshellA | subshellB`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub base: Vec<PackageSpec>,
    pub subshells: Vec<Vec<PackageSpec>>,
}

impl Request {
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.subshells.is_empty()
    }

    /// All specs in text order (base first, then each subshell).
    pub fn tokens(&self) -> impl Iterator<Item = &PackageSpec> {
        self.base.iter().chain(self.subshells.iter().flatten())
    }
}

// ============================================================================
// Patch modes
// ============================================================================

/// How new packages combine with the running context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatchMode {
    /// Use the new packages only.
    #[default]
    Replace,
    /// Override/extend the requested (unresolved) prior context.
    LooseAdd,
    /// Override/extend the resolved (concrete) prior context.
    StrictAdd,
}

impl PatchMode {
    /// Build from the two CLI toggles. Both set is a configuration error.
    pub fn from_flags(add_loose: bool, add_strict: bool) -> Result<Self, EnvError> {
        match (add_loose, add_strict) {
            (true, true) => Err(EnvError::Config(
                "--add-loose and --add-strict are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(Self::LooseAdd),
            (false, true) => Ok(Self::StrictAdd),
            (false, false) => Ok(Self::Replace),
        }
    }

    pub fn is_patch(self) -> bool {
        self != Self::Replace
    }
}

// ============================================================================
// Invocation options
// ============================================================================

/// Caller-facing options for one env invocation (CLI flags, decoupled from clap).
#[derive(Debug, Clone)]
pub struct EnvOptions {
    /// Package request tokens as given on the command line
    pub packages: Vec<String>,
    /// Resolution strategy name
    pub mode: String,
    pub quiet: bool,
    pub no_os: bool,
    pub build_requires: bool,
    pub no_cache: bool,
    pub ignore_archiving: bool,
    pub ignore_blacklist: bool,
    pub no_assume_transitivity: bool,
    /// Epoch cutoff; 0 means no cutoff
    pub time: u64,
    pub no_local: bool,
    /// Prompt decoration appended to REZ_ENV_PROMPT
    pub prompt: String,
    /// Sourced after the new shell starts
    pub rcfile: Option<PathBuf>,
    pub tmpdir: Option<PathBuf>,
    pub propagate_rcfile: bool,
    /// Batch mode: read commands from stdin instead of an interactive shell
    pub stdin: bool,
    pub add_loose: bool,
    pub add_strict: bool,
    /// Failed attempt index to visualize (None = don't render)
    pub view_fail: Option<u32>,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            mode: "latest".to_string(),
            quiet: false,
            no_os: false,
            build_requires: false,
            no_cache: false,
            ignore_archiving: false,
            ignore_blacklist: false,
            no_assume_transitivity: false,
            time: 0,
            no_local: false,
            prompt: ">".to_string(),
            rcfile: None,
            tmpdir: None,
            propagate_rcfile: false,
            stdin: false,
            add_loose: false,
            add_strict: false,
            view_fail: None,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Immutable snapshot of everything the resolver is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOptions {
    /// Encoded request text
    pub request: String,
    pub mode: String,
    pub time: Option<u64>,
    pub ignore_blacklist: bool,
    pub ignore_archiving: bool,
    pub assume_transitivity: bool,
    pub use_cache: bool,
    pub no_os: bool,
    pub build_requires: bool,
    pub no_local: bool,
    /// Failed attempt index whose graph the resolver should keep
    pub max_fails: Option<u32>,
    pub quiet: bool,
    pub meta_info: String,
    /// Where the resolver writes the bake file
    pub env_file: PathBuf,
    /// Where the resolver writes the dot graph
    pub dot_file: PathBuf,
    /// Package search path entries prepended for this resolution only
    pub package_paths: Vec<PathBuf>,
}

/// Resolver-reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    pub attempts: Option<u32>,
    pub message: String,
}

/// Result of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Success {
        env_file: PathBuf,
    },
    Failure {
        attempt_count: Option<u32>,
        dot_graph: PathBuf,
        message: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

pub const RAW_REQUEST_VAR: &str = "REZ_RAW_REQUEST";
pub const REQUEST_VAR: &str = "REZ_REQUEST";
pub const RESOLVE_VAR: &str = "REZ_RESOLVE";
pub const CONTEXT_FILE_VAR: &str = "REZ_CONTEXT_FILE";
pub const PROMPT_VAR: &str = "REZ_ENV_PROMPT";
pub const PACKAGES_PATH_VAR: &str = "REZ_PACKAGES_PATH";
pub const RCFILE_VAR: &str = "REZ_ENV_RCFILE";
pub const TMP_DIR_VAR: &str = "REZ_TMP_DIR";

/// The slice of the process environment the workflow reads. Built once at
/// the CLI boundary; the core never touches `std::env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    /// Prior unexpanded request text (REZ_RAW_REQUEST)
    pub raw_request: Option<String>,
    /// Prior requested context (REZ_REQUEST)
    pub request: Option<String>,
    /// Prior resolved context (REZ_RESOLVE)
    pub resolve: Option<String>,
    /// Accumulated prompt (REZ_ENV_PROMPT)
    pub prompt: String,
    /// REZ_PACKAGES_PATH
    pub packages_path: Option<String>,
    /// REZ_PATH, used to re-source init.sh in batch shells
    pub rez_path: Option<String>,
    /// Whether ~/.bashrc exists
    pub has_bashrc: bool,
}

impl EnvironmentContext {
    /// Build from a variable lookup (the CLI passes `std::env::var`).
    pub fn from_lookup<F>(lookup: F, has_bashrc: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            raw_request: non_empty(RAW_REQUEST_VAR),
            request: non_empty(REQUEST_VAR),
            resolve: non_empty(RESOLVE_VAR),
            prompt: lookup(PROMPT_VAR).unwrap_or_default(),
            packages_path: non_empty(PACKAGES_PATH_VAR),
            rez_path: non_empty("REZ_PATH"),
            has_bashrc,
        }
    }
}

/// Variables the workflow exports to the new shell, in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvExports(pub Vec<(String, String)>);

impl EnvExports {
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.0.push((name.to_string(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}
