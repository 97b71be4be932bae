//! Payloads of the lifecycle events the runner publishes.
//!
//! Only the fields the runner populates are modelled; how an [`EventBus`]
//! encodes them on the wire is up to the bus.
//!
//! [`EventBus`]: crate::lifecycle::EventBus

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::outcome::Outcome;
use super::suite::{PersistentLog, SuiteDefinition};

pub const SUB_SUITE_CATEGORIES: [&str; 2] = ["Regression test_suite", "Sub suite"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveLog {
    pub name: String,
    pub uri: String,
}

/// Published once, before any recipe runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteStarted {
    pub name: String,
    /// CONTEXT link.
    pub context: String,
    /// CAUSE link to the main suite, when known.
    pub main_suite_id: Option<String>,
    pub categories: Vec<String>,
    pub types: Vec<String>,
    pub live_logs: Vec<LiveLog>,
}

impl SuiteStarted {
    pub fn for_suite(suite: &SuiteDefinition) -> Self {
        let mut categories: Vec<String> =
            SUB_SUITE_CATEGORIES.iter().map(|c| c.to_string()).collect();
        categories.push(suite.iut.identity.clone());

        let live_logs = suite
            .log_area
            .livelogs
            .iter()
            .map(|uri| LiveLog {
                name: "console".to_string(),
                uri: uri.clone(),
            })
            .collect();

        Self {
            name: suite.name.clone(),
            context: suite.context.clone(),
            main_suite_id: suite.main_suite_id.clone(),
            categories,
            types: vec!["FUNCTIONAL".to_string()],
            live_logs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub user: String,
}

/// Describes where the sub suite executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentDefined {
    pub name: String,
    /// CONTEXT link to the sub suite started event.
    pub context: Uuid,
    pub host: Host,
}

/// Published once, after the verdict is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteFinished {
    /// CONTEXT link.
    pub context: String,
    pub outcome: Outcome,
    pub persistent_logs: Vec<PersistentLog>,
}
