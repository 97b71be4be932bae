//! Error types for the lifecycle module.

use crate::domain::Outcome;
use crate::verdict::ExitCode;

/// Fatal errors surfaced by [`super::TestRunner::execute`].
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The run never got a sub suite id; nothing was executed.
    #[error("suite started event could not be published: {0}")]
    SuiteStart(#[source] anyhow::Error),

    /// Execution raised. Finalizing and draining completed before this was returned.
    #[error("suite execution failed{}: {message}", in_test(.test_name))]
    Execution {
        test_name: Option<String>,
        message: String,
        /// Codes of the recipes that completed before the failure.
        exit_codes: Vec<ExitCode>,
        outcome: Box<Outcome>,
    },

    #[error("event transport did not deliver all events before the timeout ({remaining} pending)")]
    DeliveryTimeout { remaining: usize },

    #[error("event transport failed to deliver {failed} event(s)")]
    DeliveryFailed { failed: usize },

    #[error("suite finished event could not be published: {0}")]
    SuiteFinish(#[source] anyhow::Error),
}

impl LifecycleError {
    /// Outcome published for the run, when the run got far enough to have one.
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            LifecycleError::Execution { outcome, .. } => Some(&**outcome),
            _ => None,
        }
    }
}

fn in_test(test_name: &Option<String>) -> String {
    match test_name {
        Some(name) => format!(" in test '{name}'"),
        None => String::new(),
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
