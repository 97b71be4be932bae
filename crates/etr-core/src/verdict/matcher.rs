//! First-match-wins verdict matcher.

use std::path::Path;

use tracing::debug;

use super::condition::{ConditionEvaluator, ExitCode};
use super::error::{ConfigError, ConfigResult};
use super::rule::{default_rules, parse_rules, Rule};

/// Ordered, validated verdict rules.
///
/// Construction validates every rule, so a matcher that exists never fails at
/// evaluation time. Rules are checked in declaration order and the first
/// match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictMatcher {
    rules: Vec<Rule>,
}

impl Default for VerdictMatcher {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl VerdictMatcher {
    /// Create a matcher over `rules`. An empty list selects the default rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        if rules.is_empty() {
            Self::default()
        } else {
            Self { rules }
        }
    }

    /// Load rules from rule file JSON text.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(Self::new(parse_rules(json)?))
    }

    /// Load rules from a rule file.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load rules from `path` if given, otherwise use the default rules.
    pub fn from_optional_path(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Return the first rule whose condition holds for `exit_codes`.
    pub fn evaluate(&self, exit_codes: &[ExitCode]) -> Option<&Rule> {
        let evaluator = ConditionEvaluator::new(exit_codes);
        let matched = self
            .rules
            .iter()
            .find(|rule| evaluator.evaluate(&rule.condition));
        debug!(
            exit_codes = ?exit_codes,
            matched = matched.map(|r| r.description.as_str()),
            "Evaluated verdict rules"
        );
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Conclusion, Verdict};
    use crate::verdict::condition::{Condition, Expression, MatchMode, Operator};

    fn verdict_of(codes: &[ExitCode]) -> (Verdict, Conclusion) {
        let matcher = VerdictMatcher::default();
        let rule = matcher.evaluate(codes).expect("default rules always match");
        (rule.verdict, rule.conclusion)
    }

    #[test]
    fn test_default_all_zero_passes() {
        assert_eq!(
            verdict_of(&[Some(0), Some(0), Some(0)]),
            (Verdict::Passed, Conclusion::Successful)
        );
    }

    #[test]
    fn test_default_error_code_fails() {
        assert_eq!(
            verdict_of(&[Some(0), Some(1)]),
            (Verdict::Failed, Conclusion::Successful)
        );
    }

    #[test]
    fn test_default_null_is_inconclusive() {
        assert_eq!(
            verdict_of(&[Some(0), None]),
            (Verdict::Failed, Conclusion::Inconclusive)
        );
    }

    #[test]
    fn test_default_empty_passes() {
        assert_eq!(verdict_of(&[]), (Verdict::Passed, Conclusion::Successful));
    }

    #[test]
    fn test_error_code_wins_over_null_by_order() {
        // Both rule 2 and rule 3 hold; rule 2 is declared first.
        assert_eq!(
            verdict_of(&[Some(2), None]),
            (Verdict::Failed, Conclusion::Successful)
        );
    }

    #[test]
    fn test_negative_code_unmatched_by_defaults() {
        let matcher = VerdictMatcher::default();
        assert!(matcher.evaluate(&[Some(-1)]).is_none());
    }

    #[test]
    fn test_empty_rules_select_defaults() {
        assert_eq!(VerdictMatcher::new(Vec::new()), VerdictMatcher::default());
    }

    #[test]
    fn test_first_match_wins() {
        let matcher = VerdictMatcher::new(vec![
            Rule::new(
                "Collection error",
                Condition::exit_codes(Expression::new(MatchMode::Some, Operator::Eq, Some(4))),
                Conclusion::Failed,
                Verdict::Inconclusive,
            ),
            Rule::new(
                "Any failure",
                Condition::exit_codes(Expression::new(MatchMode::Some, Operator::Gte, Some(1))),
                Conclusion::Successful,
                Verdict::Failed,
            ),
        ]);
        let rule = matcher.evaluate(&[Some(0), Some(4)]).unwrap();
        assert_eq!(rule.description, "Collection error");
        let rule = matcher.evaluate(&[Some(1)]).unwrap();
        assert_eq!(rule.description, "Any failure");
        assert!(matcher.evaluate(&[Some(0)]).is_none());
    }
}
