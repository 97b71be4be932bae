//! Verdict vocabulary and the suite outcome record.

use serde::{Deserialize, Serialize};

/// Whether execution completed as designed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conclusion {
    Successful,
    Failed,
    Inconclusive,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Successful => "SUCCESSFUL",
            Conclusion::Failed => "FAILED",
            Conclusion::Inconclusive => "INCONCLUSIVE",
        }
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the tests passed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Passed,
    Failed,
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed => "FAILED",
            Verdict::Inconclusive => "INCONCLUSIVE",
        }
    }

    /// Process exit status for a run that ended with this verdict.
    ///
    /// `0` only for [`Verdict::Passed`].
    pub fn exit_status(&self) -> i32 {
        match self {
            Verdict::Passed => 0,
            Verdict::Failed => 1,
            Verdict::Inconclusive => 2,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one suite execution, attached to the suite finished event.
///
/// Produced exactly once per run and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    pub conclusion: Conclusion,
    pub description: String,
    /// Error message when the run raised, otherwise the matched rule description.
    pub detailed_description: Option<String>,
}

impl Outcome {
    pub fn exit_status(&self) -> i32 {
        self.verdict.exit_status()
    }
}

/// Result of a single test case, as reported to plugins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestCaseResult {
    Error,
    Failed,
    Skipped,
    Passed,
}

impl TestCaseResult {
    /// Classify a recipe from its exit code.
    ///
    /// No exit code means the test framework never finished, which is an error
    /// rather than a failure.
    pub fn from_returncode(returncode: Option<i32>) -> Self {
        match returncode {
            Some(0) => TestCaseResult::Passed,
            Some(_) => TestCaseResult::Failed,
            None => TestCaseResult::Error,
        }
    }
}
