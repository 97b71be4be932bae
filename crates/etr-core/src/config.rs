//! Runner configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::lifecycle::DrainPolicy;
use crate::verdict::{ConfigResult, VerdictMatcher};

/// Optional verdict rule file.
pub const VERDICT_RULE_FILE_ENV: &str = "VERDICT_RULE_FILE";
/// Host name announced in an environment defined event.
pub const HOSTNAME_ENV: &str = "HOSTNAME";
/// Execution space URL announced in an environment defined event.
pub const EXECUTION_SPACE_URL_ENV: &str = "EXECUTION_SPACE_URL";

/// Settings that are not part of the suite definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Verdict rule file; `None` selects the default rules.
    pub verdict_rule_file: Option<PathBuf>,
    pub hostname: Option<String>,
    pub execution_space_url: Option<String>,
    /// User reported on environment defined events.
    pub host_user: String,
    pub drain: DrainPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            verdict_rule_file: None,
            hostname: None,
            execution_space_url: None,
            host_user: "etr".to_string(),
            drain: DrainPolicy::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a config from `VERDICT_RULE_FILE`, `HOSTNAME` and
    /// `EXECUTION_SPACE_URL`.
    ///
    /// Empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        RunnerConfig {
            verdict_rule_file: var(VERDICT_RULE_FILE_ENV).map(PathBuf::from),
            hostname: var(HOSTNAME_ENV),
            execution_space_url: var(EXECUTION_SPACE_URL_ENV),
            ..Self::default()
        }
    }

    pub fn with_verdict_rule_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.verdict_rule_file = Some(path.into());
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    pub fn with_execution_space_url(mut self, url: &str) -> Self {
        self.execution_space_url = Some(url.to_string());
        self
    }

    pub fn with_drain_policy(mut self, drain: DrainPolicy) -> Self {
        self.drain = drain;
        self
    }

    /// Load the configured verdict rules.
    pub fn verdict_matcher(&self) -> ConfigResult<VerdictMatcher> {
        VerdictMatcher::from_optional_path(self.verdict_rule_file.as_deref())
    }
}
