//! Error types for the verdict module.

/// Errors produced while loading or validating verdict rules.
///
/// All of these are raised at load time; a [`super::VerdictMatcher`] that
/// exists has no malformed rules.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read verdict rule file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed verdict rules: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("verdict rules must be a JSON array of rule objects")]
    NotAnArray,

    #[error("rule {index} is not a JSON object")]
    RuleNotAnObject { index: usize },

    #[error(
        "rule {index} does not have exactly the required keywords \
         (missing: {missing:?}, unexpected: {unexpected:?}); \
         required keywords: description, condition, conclusion, verdict"
    )]
    RuleFields {
        index: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("rule {index} has no keywords in its condition")]
    EmptyCondition { index: usize },

    #[error(
        "rule {index} uses unsupported condition keyword '{keyword}'; \
         supported keywords: test_framework_exit_codes"
    )]
    UnsupportedKeyword { index: usize, keyword: String },

    #[error(
        "rule {index} uses unsupported operator '{op}'; \
         supported operators: eq, neq, gt, lt, gte, lte"
    )]
    UnsupportedOperator { index: usize, op: String },

    #[error(
        "rule {index} uses unsupported match '{mode}'; supported matches: all, some, none"
    )]
    UnsupportedMatch { index: usize, mode: String },

    #[error("rule {index} is invalid: {reason}")]
    InvalidRule { index: usize, reason: String },
}

/// Result type for verdict rule operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
