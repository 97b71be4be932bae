//! ETR Core Library
//!
//! Verdict rules and the suite execution lifecycle of the test runner.
//! Process, filesystem and transport collaborators live in `etr-exec`;
//! in-memory ones in [`fakes`].

pub mod config;
pub mod domain;
pub mod fakes;
pub mod lifecycle;
pub mod obs;
pub mod telemetry;
pub mod verdict;

pub use config::RunnerConfig;

pub use domain::{
    Conclusion, EnvironmentDefined, EventHandle, Host, Iut, LiveLog, LogAreaConfig, Outcome,
    PersistentLog, Recipe, SuiteContext, SuiteDefinition, SuiteError, SuiteFinished,
    SuiteStarted, TestCase, TestCaseResult, Verdict,
};

pub use lifecycle::{
    Collaborators, DeliveryTracker, DrainPolicy, EventBus, Executor, IutMonitoring,
    LifecycleError, LifecycleResult, LifecycleState, LogArea, Plugin, PluginSet,
    RecipeExecution, SuiteReport, TestRunner, Workspace, WorkspaceProvider,
};

pub use verdict::{
    default_rules, ConditionEvaluator, ConfigError, ExitCode, Rule, VerdictMatcher,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
