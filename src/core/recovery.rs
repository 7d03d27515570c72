//! RZ-008: Failure recovery: conflict-graph rendering after a failed
//! resolution.
//!
//! `Resolving -> Resolved | Failed`. On `Failed` the requested attempt's dot
//! graph is rendered with conflict edges only. Rendering is best effort: its
//! errors are logged and never replace the resolution failure.

use super::error::EnvError;
use super::types::ResolutionOutcome;
use crate::transport::{self, ToolCommand};
use std::path::{Path, PathBuf};

/// Where one invocation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    Resolving,
    Resolved {
        env_file: PathBuf,
    },
    Failed {
        attempts: Option<u32>,
        dot_file: PathBuf,
        message: String,
    },
}

impl ResolveState {
    /// Transition out of `Resolving` with the resolver's outcome.
    pub fn advance(self, outcome: ResolutionOutcome) -> Result<Self, EnvError> {
        match self {
            Self::Resolving => Ok(match outcome {
                ResolutionOutcome::Success { env_file } => Self::Resolved { env_file },
                ResolutionOutcome::Failure {
                    attempt_count,
                    dot_graph,
                    message,
                } => Self::Failed {
                    attempts: attempt_count,
                    dot_file: dot_graph,
                    message,
                },
            }),
            other => Err(EnvError::Config(format!(
                "resolution already finished ({:?})",
                other
            ))),
        }
    }
}

/// A request to render one failed attempt's graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotView<'a> {
    pub dot_file: &'a Path,
    pub attempt: u32,
    pub conflict_only: bool,
}

/// External dot-graph viewer.
pub trait DotRenderer {
    fn render(&self, view: &DotView<'_>) -> Result<(), String>;
}

/// Renderer backed by an external program speaking the `rez-dot` flags.
#[derive(Debug, Clone)]
pub struct CommandDotRenderer {
    pub program: String,
}

impl CommandDotRenderer {
    pub fn command(&self, view: &DotView<'_>) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program);
        if view.conflict_only {
            cmd = cmd.arg("--conflict-only");
        }
        cmd.arg(view.dot_file.to_string_lossy())
    }
}

impl DotRenderer for CommandDotRenderer {
    fn render(&self, view: &DotView<'_>) -> Result<(), String> {
        let out = transport::exec(&self.command(view))?;
        if out.success() {
            Ok(())
        } else {
            Err(format!("exit code {}: {}", out.exit_code, out.stderr.trim()))
        }
    }
}

/// Post-failure handling for one invocation.
pub struct FailureRecovery<'a> {
    renderer: &'a dyn DotRenderer,
    view_fail: Option<u32>,
}

impl<'a> FailureRecovery<'a> {
    pub fn new(renderer: &'a dyn DotRenderer, view_fail: Option<u32>) -> Self {
        Self { renderer, view_fail }
    }

    /// Render the requested attempt if asked, then produce the fatal error.
    pub fn recover(&self, attempts: Option<u32>, dot_file: &Path, message: &str) -> EnvError {
        tracing::debug!(?attempts, dot = %dot_file.display(), "resolution failed");

        if let Some(attempt) = self.view_fail {
            let view = DotView {
                dot_file,
                attempt,
                conflict_only: true,
            };
            if let Err(e) = self.renderer.render(&view) {
                tracing::warn!(attempt, "cannot render conflict graph: {}", e);
            }
        }

        EnvError::ResolutionFailure {
            attempts,
            message: message.to_string(),
        }
    }
}
