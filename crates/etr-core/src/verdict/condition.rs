//! Condition evaluation against test framework exit codes.
//!
//! A [`Condition`] maps supported keywords to an [`Expression`]. An expression
//! applies one comparison to every exit code and aggregates the per-code
//! results with a [`MatchMode`].
//!
//! # Null exit codes
//!
//! `None` stands for a recipe that terminated without an exit code. It takes
//! part in `eq`/`neq` like any other value (`None eq None` holds, `None neq 0`
//! holds). Ordering operators never hold when either side is `None`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Exit code of one recipe; `None` means abnormal termination.
pub type ExitCode = Option<i32>;

/// How per-code results are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every code satisfies the comparison (true on an empty list).
    All,
    /// At least one code satisfies the comparison (false on an empty list).
    Some,
    /// No code satisfies the comparison (true on an empty list).
    None,
}

impl MatchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(MatchMode::All),
            "some" => Some(MatchMode::Some),
            "none" => Some(MatchMode::None),
            _ => None,
        }
    }
}

/// Comparison applied to each exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Operator::Eq),
            "neq" => Some(Operator::Neq),
            "gt" => Some(Operator::Gt),
            "lt" => Some(Operator::Lt),
            "gte" => Some(Operator::Gte),
            "lte" => Some(Operator::Lte),
            _ => None,
        }
    }

    /// Compare `code <op> value`.
    pub fn compare(&self, code: ExitCode, value: ExitCode) -> bool {
        match self {
            Operator::Eq => code == value,
            Operator::Neq => code != value,
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                let (Some(code), Some(value)) = (code, value) else {
                    return false;
                };
                match self {
                    Operator::Gt => code > value,
                    Operator::Lt => code < value,
                    Operator::Gte => code >= value,
                    _ => code <= value,
                }
            }
        }
    }
}

/// `{match, op, value}` applied to a list of exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Expression {
    #[serde(rename = "match")]
    pub match_mode: MatchMode,
    pub op: Operator,
    pub value: ExitCode,
}

impl Expression {
    pub fn new(match_mode: MatchMode, op: Operator, value: ExitCode) -> Self {
        Self {
            match_mode,
            op,
            value,
        }
    }
}

/// Keywords a condition may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKeyword {
    TestFrameworkExitCodes,
}

impl ConditionKeyword {
    pub const SUPPORTED: &'static [ConditionKeyword] = &[ConditionKeyword::TestFrameworkExitCodes];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKeyword::TestFrameworkExitCodes => "test_framework_exit_codes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::SUPPORTED.iter().copied().find(|k| k.as_str() == s)
    }
}

/// Non-empty conjunction of keyword expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    clauses: Vec<(ConditionKeyword, Expression)>,
}

impl Condition {
    /// Build a condition from keyword clauses. Returns `None` when `clauses` is empty.
    pub fn new(clauses: Vec<(ConditionKeyword, Expression)>) -> Option<Self> {
        if clauses.is_empty() {
            None
        } else {
            Some(Self { clauses })
        }
    }

    /// Condition on `test_framework_exit_codes` only.
    pub fn exit_codes(expression: Expression) -> Self {
        Self {
            clauses: vec![(ConditionKeyword::TestFrameworkExitCodes, expression)],
        }
    }

    pub fn clauses(&self) -> &[(ConditionKeyword, Expression)] {
        &self.clauses
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.clauses.len()))?;
        for (keyword, expression) in &self.clauses {
            map.serialize_entry(keyword.as_str(), expression)?;
        }
        map.end()
    }
}

/// Evaluates conditions against the exit codes of one run.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'a> {
    exit_codes: &'a [ExitCode],
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(exit_codes: &'a [ExitCode]) -> Self {
        Self { exit_codes }
    }

    /// All clauses must hold.
    pub fn evaluate(&self, condition: &Condition) -> bool {
        condition
            .clauses
            .iter()
            .all(|(keyword, expression)| match keyword {
                ConditionKeyword::TestFrameworkExitCodes => self.evaluate_expression(expression),
            })
    }

    pub fn evaluate_expression(&self, expression: &Expression) -> bool {
        let pred = |code: &ExitCode| expression.op.compare(*code, expression.value);
        match expression.match_mode {
            MatchMode::All => self.exit_codes.iter().all(pred),
            MatchMode::Some => self.exit_codes.iter().any(pred),
            MatchMode::None => !self.exit_codes.iter().any(pred),
        }
    }
}
