//! Turning collected exit codes into the published outcome.

use tracing::warn;

use crate::domain::{Conclusion, Outcome, Verdict};
use crate::verdict::{ExitCode, VerdictMatcher};

pub const UNMATCHED_DESCRIPTION: &str = "No verdict rule matched the test framework exit codes";

/// Resolve the outcome of a run.
///
/// When the run raised, `failure` carries the error message and an extra
/// `None` is evaluated after the collected codes for the recipe that never
/// produced one. `exit_codes` itself is not modified.
///
/// A raised run is always INCONCLUSIVE and never PASSED, whichever rule
/// matched first.
pub fn resolve_outcome(
    matcher: &VerdictMatcher,
    exit_codes: &[ExitCode],
    failure: Option<&str>,
) -> Outcome {
    let mut evaluated = exit_codes.to_vec();
    if failure.is_some() {
        evaluated.push(None);
    }

    let mut outcome = match matcher.evaluate(&evaluated) {
        Some(rule) => Outcome {
            verdict: rule.verdict,
            conclusion: rule.conclusion,
            description: rule.description.clone(),
            detailed_description: Some(
                failure.map_or_else(|| rule.description.clone(), str::to_string),
            ),
        },
        None => {
            warn!(exit_codes = ?evaluated, "{UNMATCHED_DESCRIPTION}");
            Outcome {
                verdict: Verdict::Inconclusive,
                conclusion: Conclusion::Inconclusive,
                description: UNMATCHED_DESCRIPTION.to_string(),
                detailed_description: failure.map(str::to_string),
            }
        }
    };

    if failure.is_some() {
        outcome.conclusion = Conclusion::Inconclusive;
        if outcome.verdict == Verdict::Passed {
            outcome.verdict = Verdict::Failed;
        }
    }
    outcome
}
