//! RZ-001: Error taxonomy for the env workflow.
//!
//! Every fatal path ends in one of these variants. The CLI maps all of them
//! to exit status 1; only the message differs.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building, patching, or resolving a request.
#[derive(Error, Debug)]
pub enum EnvError {
    /// Request text does not follow `base | subshell | ...`.
    #[error("malformed request '{text}': {reason}")]
    MalformedRequest { text: String, reason: String },

    /// Operation not supported for the current context (patching across
    /// auto-wrapper boundaries).
    #[error("{0}")]
    UnsupportedOperation(String),

    /// The resolver could not satisfy the request.
    #[error("{}", describe_failure(.attempts, .message))]
    ResolutionFailure {
        attempts: Option<u32>,
        message: String,
    },

    /// An external tool (wrapper expander, resolver process, dot renderer)
    /// could not be run or reported failure.
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// Invalid flags or config file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error on a temp artifact or manifest.
    #[error("{} {}: {}", .context, .path.display(), .source)]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_failure(attempts: &Option<u32>, message: &str) -> String {
    match attempts {
        Some(n) => format!("resolution failed after {} attempt(s): {}", n, message),
        None => format!("resolution failed: {}", message),
    }
}

impl EnvError {
    pub fn malformed(text: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub fn tool(tool: &str, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
