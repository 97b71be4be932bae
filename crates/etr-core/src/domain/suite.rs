//! Suite definition, recipes and the per-run suite context.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{Result, SuiteError};

/// Item under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Iut {
    /// Identity of the IUT, typically a package URL.
    pub identity: String,

    /// Provider specific fields (type, namespace, version, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Iut {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Test case a recipe executes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub tracker: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One test execution unit within a suite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    pub id: String,

    pub test_case: TestCase,

    /// Test framework command line, run through the shell.
    pub command: String,

    /// Environment variables exported to every step of the recipe.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Appended to `command` as `--key value` pairs.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Commands run before the test framework command.
    #[serde(default)]
    pub pre_execution: Vec<String>,

    /// Commands that fetch the test code, run first.
    #[serde(default)]
    pub checkout: Vec<String>,
}

impl Recipe {
    /// Create a recipe with just a test name and a command.
    pub fn new(test_name: impl Into<String>, command: impl Into<String>) -> Self {
        let test_name = test_name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            test_case: TestCase {
                id: test_name,
                tracker: None,
                url: None,
            },
            command: command.into(),
            environment: BTreeMap::new(),
            parameters: BTreeMap::new(),
            pre_execution: Vec::new(),
            checkout: Vec::new(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_case.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogAreaConfig {
    /// Live log URI published on the suite started event.
    #[serde(default)]
    pub livelogs: Option<String>,
}

/// A sub suite as handed to this runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteDefinition {
    pub name: String,

    /// Correlating context id of the overall test activity.
    pub context: String,

    /// Id of the main suite this sub suite belongs to.
    #[serde(default)]
    pub main_suite_id: Option<String>,

    pub iut: Iut,

    /// Recipes, executed in this order.
    pub recipes: Vec<Recipe>,

    #[serde(default)]
    pub log_area: LogAreaConfig,

    /// Commands kept running against the IUT while recipes execute.
    #[serde(default)]
    pub monitoring: Vec<String>,
}

impl SuiteDefinition {
    /// Parse and validate a suite definition from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let suite: SuiteDefinition = serde_json::from_str(json)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Read, parse and validate a suite definition file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SuiteError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SuiteError::Invalid("suite name must not be empty".into()));
        }
        for (index, recipe) in self.recipes.iter().enumerate() {
            if recipe.test_case.id.trim().is_empty() {
                return Err(SuiteError::Invalid(format!(
                    "recipe {index} has an empty test case id"
                )));
            }
            if recipe.command.trim().is_empty() {
                return Err(SuiteError::Invalid(format!(
                    "recipe {index} ({}) has an empty command",
                    recipe.test_case.id
                )));
            }
        }
        Ok(())
    }
}

/// Identifiers threaded through one run.
///
/// Built once the suite started event has been acknowledged; read-only after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteContext {
    pub suite_name: String,
    pub context: String,
    pub main_suite_id: Option<String>,
    pub sub_suite_id: Uuid,
}

/// Reference to a log or artifact kept after the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistentLog {
    pub name: String,
    pub uri: String,
}

/// Acknowledgement for a published event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventHandle {
    pub event_id: Uuid,
    pub event_type: String,
}
