//! Domain-level error taxonomy for suite definitions.

/// Errors produced while loading or validating a suite definition.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("failed to read suite definition {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed suite definition: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid suite definition: {0}")]
    Invalid(String),
}

/// Result type for suite definition operations.
pub type Result<T> = std::result::Result<T, SuiteError>;
