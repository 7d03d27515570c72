//! RZ-005: Auto-wrapper detection and expansion.
//!
//! Bracket syntax (`maya(tools)`) in a request hands the package list to an
//! external expander. The expander writes `packages.txt` into a scratch
//! directory; that directory is then prepended to the package search path
//! for this resolution only, and caching is disabled.

use super::artifacts::remove_quietly;
use super::error::EnvError;
use super::types::{PatchMode, TMP_DIR_VAR};
use crate::transport::{self, ToolCommand};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Manifest the expander leaves in the scratch directory.
pub const PACKAGES_MANIFEST: &str = "packages.txt";

/// Marker that introduces wrapper syntax in a token.
pub const WRAPPER_MARKER: char = '(';

/// True if any token uses wrapper bracket syntax.
pub fn has_wrapper_syntax<S: AsRef<str>>(tokens: &[S]) -> bool {
    tokens.iter().any(|t| t.as_ref().contains(WRAPPER_MARKER))
}

/// Reject patch modes that would cross an auto-wrapper boundary, in either
/// direction. Runs before any temp file or resolver call.
pub fn check_patch_compatibility<S: AsRef<str>>(
    packages: &[S],
    raw_request: Option<&str>,
    mode: PatchMode,
) -> Result<(), EnvError> {
    if !mode.is_patch() {
        return Ok(());
    }
    if has_wrapper_syntax(packages) {
        return Err(EnvError::UnsupportedOperation(
            "patching of auto-wrapper environments is not yet supported".to_string(),
        ));
    }
    let prior: Vec<&str> = raw_request.unwrap_or_default().split_whitespace().collect();
    if has_wrapper_syntax(&prior) {
        return Err(EnvError::UnsupportedOperation(
            "patching from auto-wrapper environments is not yet supported".to_string(),
        ));
    }
    Ok(())
}

/// Input to a wrapper expansion.
#[derive(Debug, Clone)]
pub struct WrapperJob<'a> {
    pub packages: &'a [String],
    pub scratch_dir: &'a Path,
}

/// External step that rewrites a wrapper request into plain packages.
pub trait WrapperExpander {
    /// Expand `job.packages`, leaving `packages.txt` in `job.scratch_dir`.
    fn expand(&self, job: &WrapperJob<'_>) -> Result<(), String>;
}

/// Expander backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandWrapperExpander {
    pub program: String,
}

impl WrapperExpander for CommandWrapperExpander {
    fn expand(&self, job: &WrapperJob<'_>) -> Result<(), String> {
        let cmd = ToolCommand::new(&self.program)
            .args(job.packages.iter().cloned())
            .env(TMP_DIR_VAR, job.scratch_dir.to_string_lossy());
        let out = transport::exec(&cmd)?;
        if out.success() {
            Ok(())
        } else {
            Err(format!("exit code {}: {}", out.exit_code, out.stderr.trim()))
        }
    }
}

/// Result of a successful expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperExpansion {
    /// Flat package list read from the manifest
    pub packages: Vec<String>,
    /// Scratch dir, prepended to the package search path
    pub package_path: PathBuf,
}

impl WrapperExpansion {
    /// Wrapper resolutions never use the resolver cache.
    pub fn use_cache(&self) -> bool {
        false
    }
}

/// Scratch directory for one wrapper expansion.
///
/// Removed on drop unless kept: a directory this invocation created goes
/// entirely, a caller-supplied `--tmpdir` only loses the manifest.
#[derive(Debug)]
pub struct ScratchDir {
    owned: Option<TempDir>,
    path: PathBuf,
    armed: bool,
}

impl ScratchDir {
    /// Use the caller's tmpdir, or create a fresh `rez-wrappers.*` directory.
    pub fn create(tmpdir: Option<&Path>) -> Result<Self, EnvError> {
        if let Some(dir) = tmpdir {
            return Ok(Self {
                owned: None,
                path: dir.to_path_buf(),
                armed: true,
            });
        }
        let base = std::env::temp_dir();
        let dir = tempfile::Builder::new()
            .prefix("rez-wrappers.")
            .tempdir_in(&base)
            .map_err(|e| EnvError::io("cannot create scratch dir in", &base, e))?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            owned: Some(dir),
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory past this process; the generated wrapper packages
    /// are on the search path of the handed-off shell.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        match self.owned.take() {
            Some(dir) => dir.keep(),
            None => std::mem::take(&mut self.path),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.owned.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                if let Err(e) = dir.close() {
                    tracing::warn!(path = %path.display(), "cannot remove scratch dir: {}", e);
                }
            }
            None => remove_quietly(&self.path.join(PACKAGES_MANIFEST)),
        }
    }
}

/// Run the expander and read back the manifest.
pub fn expand_wrappers(
    expander: &dyn WrapperExpander,
    packages: &[String],
    scratch: &Path,
    tool_name: &str,
) -> Result<WrapperExpansion, EnvError> {
    tracing::info!(scratch = %scratch.display(), "expanding auto-wrapper request");
    expander
        .expand(&WrapperJob {
            packages,
            scratch_dir: scratch,
        })
        .map_err(|e| EnvError::tool(tool_name, e))?;

    let manifest = scratch.join(PACKAGES_MANIFEST);
    let content = std::fs::read_to_string(&manifest)
        .map_err(|e| EnvError::io("cannot read wrapper manifest", &manifest, e))?;

    Ok(WrapperExpansion {
        packages: content.split_whitespace().map(str::to_string).collect(),
        package_path: scratch.to_path_buf(),
    })
}
