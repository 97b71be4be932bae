//! Domain model: suites, recipes, outcomes and event payloads.

pub mod error;
pub mod events;
pub mod outcome;
pub mod suite;

pub use error::{Result, SuiteError};
pub use events::{EnvironmentDefined, Host, LiveLog, SuiteFinished, SuiteStarted};
pub use outcome::{Conclusion, Outcome, TestCaseResult, Verdict};
pub use suite::{
    EventHandle, Iut, LogAreaConfig, PersistentLog, Recipe, SuiteContext, SuiteDefinition,
    TestCase,
};
