//! Verdict rules engine.
//!
//! Converts the exit codes collected from a suite's recipes into a verdict by
//! evaluating an ordered rule set, first match wins. Rule files are validated
//! when loaded: an unknown keyword, match mode or operator, a missing or extra
//! rule field, or an empty condition is a [`ConfigError`].
//!
//! # Modules
//!
//! - [`condition`]: `Expression`, `Condition`, `ConditionEvaluator`
//! - [`rule`]: `Rule`, rule file parsing, `default_rules()`
//! - [`matcher`]: `VerdictMatcher`
//! - [`error`]: `ConfigError` / `ConfigResult`

pub mod condition;
pub mod error;
pub mod matcher;
pub mod rule;

pub use condition::{
    Condition, ConditionEvaluator, ConditionKeyword, ExitCode, Expression, MatchMode, Operator,
};
pub use error::{ConfigError, ConfigResult};
pub use matcher::VerdictMatcher;
pub use rule::{default_rules, parse_rules, Rule, REQUIRED_RULE_KEYWORDS};
