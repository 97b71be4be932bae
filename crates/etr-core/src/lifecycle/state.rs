use serde::{Deserialize, Serialize};

/// Phase of a suite run. Phases are entered in declaration order; a run that
/// fails to start goes from `Started` straight to `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Triggered,
    Started,
    Environment,
    Executing,
    Finalizing,
    Draining,
    Terminal,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Triggered => "TRIGGERED",
            LifecycleState::Started => "STARTED",
            LifecycleState::Environment => "ENVIRONMENT",
            LifecycleState::Executing => "EXECUTING",
            LifecycleState::Finalizing => "FINALIZING",
            LifecycleState::Draining => "DRAINING",
            LifecycleState::Terminal => "TERMINAL",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
