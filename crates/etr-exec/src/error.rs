//! Error types for the local collaborators.

use std::path::PathBuf;

/// Errors raised by processes, files and the event transport.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} step '{command}' exited with {status}")]
    StepFailed {
        step: &'static str,
        command: String,
        status: String,
    },

    #[error("test '{test_name}' timed out after {limit_ms}ms")]
    Timeout { test_name: String, limit_ms: u64 },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event transport is closed")]
    TransportClosed,

    #[error("event could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExecError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ExecError::Io { path, source }
    }
}

/// Result type for local collaborator operations.
pub type ExecResult<T> = std::result::Result<T, ExecError>;
