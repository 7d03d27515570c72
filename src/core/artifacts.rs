//! RZ-006: Temp artifact ownership: bake file, source script, dot graph.
//!
//! The bake file is created exclusively with a random suffix so separate
//! invocations on one host never collide; the source and dot paths derive
//! from it. Dropping `ContextFiles` deletes all three. `hand_off` is the only
//! way to keep the bake and source files alive past the invocation.

use super::error::EnvError;
use std::path::{Path, PathBuf};

const CONTEXT_PREFIX: &str = ".rez-context.";

/// Temp files owned by one invocation.
#[derive(Debug)]
pub struct ContextFiles {
    bake: PathBuf,
    source: PathBuf,
    dot: PathBuf,
    armed: bool,
}

/// Files passed to the shell spawner, which becomes responsible for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandedOff {
    pub bake: PathBuf,
    pub source: PathBuf,
}

impl ContextFiles {
    /// Create a fresh bake file in `dir` and derive its companions.
    pub fn create(dir: &Path) -> Result<Self, EnvError> {
        let bake = tempfile::Builder::new()
            .prefix(CONTEXT_PREFIX)
            .rand_bytes(8)
            .tempfile_in(dir)
            .map_err(|e| EnvError::io("cannot create context file in", dir, e))?
            .into_temp_path()
            .keep()
            .map_err(|e| EnvError::io("cannot keep context file in", dir, e.error))?;

        let source = with_suffix(&bake, ".source");
        let dot = with_suffix(&bake, ".dot");
        tracing::debug!(bake = %bake.display(), "created context files");

        Ok(Self {
            bake,
            source,
            dot,
            armed: true,
        })
    }

    pub fn bake(&self) -> &Path {
        &self.bake
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dot(&self) -> &Path {
        &self.dot
    }

    /// Release the bake and source files to the shell spawner. The dot graph
    /// is never needed by the shell and is removed here.
    pub fn hand_off(mut self) -> HandedOff {
        remove_quietly(&self.dot);
        self.armed = false;
        HandedOff {
            bake: std::mem::take(&mut self.bake),
            source: std::mem::take(&mut self.source),
        }
    }
}

impl Drop for ContextFiles {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in [&self.bake, &self.source, &self.dot] {
            remove_quietly(path);
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

pub(crate) fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "cannot remove temp file: {}", e),
    }
}
