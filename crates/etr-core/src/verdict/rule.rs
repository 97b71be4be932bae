//! Verdict rules and their load-time validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::{Condition, ConditionKeyword, ExitCode, Expression, MatchMode, Operator};
use super::error::{ConfigError, ConfigResult};
use crate::domain::{Conclusion, Verdict};

/// Keywords every rule object carries, no more and no less.
pub const REQUIRED_RULE_KEYWORDS: [&str; 4] = ["description", "condition", "conclusion", "verdict"];

/// A single verdict rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub description: String,
    pub condition: Condition,
    pub conclusion: Conclusion,
    pub verdict: Verdict,
}

impl Rule {
    pub fn new(
        description: impl Into<String>,
        condition: Condition,
        conclusion: Conclusion,
        verdict: Verdict,
    ) -> Self {
        Self {
            description: description.into(),
            condition,
            conclusion,
            verdict,
        }
    }

    /// Validate and convert one rule object of a rule file.
    pub fn from_value(index: usize, value: &Value) -> ConfigResult<Self> {
        let object = value
            .as_object()
            .ok_or(ConfigError::RuleNotAnObject { index })?;

        let missing: Vec<String> = REQUIRED_RULE_KEYWORDS
            .iter()
            .filter(|k| !object.contains_key(**k))
            .map(|k| k.to_string())
            .collect();
        let unexpected: Vec<String> = object
            .keys()
            .filter(|k| !REQUIRED_RULE_KEYWORDS.contains(&k.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(ConfigError::RuleFields {
                index,
                missing,
                unexpected,
            });
        }

        let raw: RawRule =
            serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidRule {
                index,
                reason: e.to_string(),
            })?;
        raw.into_rule(index)
    }
}

/// Rule object as written in a rule file, before keyword and operator checks.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    description: String,
    condition: BTreeMap<String, RawExpression>,
    conclusion: Conclusion,
    verdict: Verdict,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpression {
    #[serde(rename = "match")]
    match_mode: String,
    op: String,
    #[serde(default)]
    value: ExitCode,
}

impl RawRule {
    fn into_rule(self, index: usize) -> ConfigResult<Rule> {
        if self.condition.is_empty() {
            return Err(ConfigError::EmptyCondition { index });
        }

        let mut clauses = Vec::with_capacity(self.condition.len());
        for (keyword, raw) in self.condition {
            let keyword = ConditionKeyword::parse(&keyword)
                .ok_or(ConfigError::UnsupportedKeyword { index, keyword })?;
            let match_mode =
                MatchMode::parse(&raw.match_mode).ok_or_else(|| ConfigError::UnsupportedMatch {
                    index,
                    mode: raw.match_mode.clone(),
                })?;
            let op = Operator::parse(&raw.op).ok_or_else(|| ConfigError::UnsupportedOperator {
                index,
                op: raw.op.clone(),
            })?;
            clauses.push((keyword, Expression::new(match_mode, op, raw.value)));
        }

        let condition = Condition::new(clauses).ok_or(ConfigError::EmptyCondition { index })?;
        Ok(Rule {
            description: self.description,
            condition,
            conclusion: self.conclusion,
            verdict: self.verdict,
        })
    }
}

/// Parse a rule file's JSON text into validated rules, in declaration order.
pub fn parse_rules(json: &str) -> ConfigResult<Vec<Rule>> {
    let value: Value = serde_json::from_str(json)?;
    let items = value.as_array().ok_or(ConfigError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Rule::from_value(index, item))
        .collect()
}

/// Built-in rules used when no rule file is supplied.
///
/// 1. all exit codes are 0: SUCCESSFUL / PASSED
/// 2. some exit code is at least 1: SUCCESSFUL / FAILED
/// 3. some recipe has no exit code: INCONCLUSIVE / FAILED
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "Executed, no errors",
            Condition::exit_codes(Expression::new(MatchMode::All, Operator::Eq, Some(0))),
            Conclusion::Successful,
            Verdict::Passed,
        ),
        Rule::new(
            "Executed with errors",
            Condition::exit_codes(Expression::new(MatchMode::Some, Operator::Gte, Some(1))),
            Conclusion::Successful,
            Verdict::Failed,
        ),
        Rule::new(
            "Abnormal termination due to an exception",
            Condition::exit_codes(Expression::new(MatchMode::Some, Operator::Eq, None)),
            Conclusion::Inconclusive,
            Verdict::Failed,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_json() -> Value {
        json!({
            "description": "Collection error",
            "condition": {
                "test_framework_exit_codes": {"match": "some", "op": "eq", "value": 4}
            },
            "conclusion": "FAILED",
            "verdict": "FAILED"
        })
    }

    #[test]
    fn test_valid_rule() {
        let rule = Rule::from_value(0, &rule_json()).unwrap();
        assert_eq!(rule.description, "Collection error");
        assert_eq!(rule.conclusion, Conclusion::Failed);
        assert_eq!(rule.verdict, Verdict::Failed);
        assert_eq!(
            rule.condition.clauses()[0].1,
            Expression::new(MatchMode::Some, Operator::Eq, Some(4))
        );
    }

    #[test]
    fn test_missing_conclusion() {
        let mut value = rule_json();
        value.as_object_mut().unwrap().remove("conclusion");
        match Rule::from_value(3, &value) {
            Err(ConfigError::RuleFields {
                index,
                missing,
                unexpected,
            }) => {
                assert_eq!(index, 3);
                assert_eq!(missing, vec!["conclusion".to_string()]);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected RuleFields, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_field() {
        let mut value = rule_json();
        value["priority"] = json!(1);
        assert!(matches!(
            Rule::from_value(0, &value),
            Err(ConfigError::RuleFields { .. })
        ));
    }

    #[test]
    fn test_empty_condition() {
        let mut value = rule_json();
        value["condition"] = json!({});
        assert!(matches!(
            Rule::from_value(0, &value),
            Err(ConfigError::EmptyCondition { index: 0 })
        ));
    }

    #[test]
    fn test_unsupported_keyword() {
        let mut value = rule_json();
        value["condition"] = json!({"test_framework_exit_code": {"match": "all", "op": "eq", "value": 0}});
        match Rule::from_value(1, &value) {
            Err(ConfigError::UnsupportedKeyword { index, keyword }) => {
                assert_eq!(index, 1);
                assert_eq!(keyword, "test_framework_exit_code");
            }
            other => panic!("expected UnsupportedKeyword, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_operator() {
        let mut value = rule_json();
        value["condition"]["test_framework_exit_codes"]["op"] = json!("ge");
        assert!(matches!(
            Rule::from_value(0, &value),
            Err(ConfigError::UnsupportedOperator { ref op, .. }) if op == "ge"
        ));
    }

    #[test]
    fn test_unsupported_match() {
        let mut value = rule_json();
        value["condition"]["test_framework_exit_codes"]["match"] = json!("any");
        assert!(matches!(
            Rule::from_value(0, &value),
            Err(ConfigError::UnsupportedMatch { .. })
        ));
    }

    #[test]
    fn test_invalid_verdict_value() {
        let mut value = rule_json();
        value["verdict"] = json!("GREEN");
        assert!(matches!(
            Rule::from_value(0, &value),
            Err(ConfigError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_missing_value_means_null() {
        let mut value = rule_json();
        value["condition"]["test_framework_exit_codes"]
            .as_object_mut()
            .unwrap()
            .remove("value");
        let rule = Rule::from_value(0, &value).unwrap();
        assert_eq!(rule.condition.clauses()[0].1.value, None);
    }

    #[test]
    fn test_parse_rules_requires_array() {
        assert!(matches!(parse_rules("{}"), Err(ConfigError::NotAnArray)));
        assert!(matches!(parse_rules("[1]"), Err(ConfigError::RuleNotAnObject { index: 0 })));
        assert!(matches!(parse_rules("not json"), Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_default_rules_order() {
        let rules = default_rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].description, "Executed, no errors");
        assert_eq!(rules[1].description, "Executed with errors");
        assert_eq!(rules[2].description, "Abnormal termination due to an exception");
    }

    #[test]
    fn test_default_rules_reparse_from_json() {
        let json = serde_json::to_string(&default_rules()).unwrap();
        assert_eq!(parse_rules(&json).unwrap(), default_rules());
    }
}
