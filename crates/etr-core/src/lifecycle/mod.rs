//! Suite execution lifecycle.
//!
//! # Modules
//!
//! - [`collaborators`]: traits for executors, workspaces, monitoring, events and plugins
//! - [`runner`]: `TestRunner`, the state machine itself
//! - [`drain`]: waiting for background event delivery
//! - [`outcome`]: verdict resolution for a finished run
//! - [`plugins`]: `PluginSet`
//! - [`state`]: `LifecycleState`
//! - [`error`]: `LifecycleError` / `LifecycleResult`

pub mod collaborators;
pub mod drain;
pub mod error;
pub mod outcome;
pub mod plugins;
pub mod runner;
pub mod state;

pub use collaborators::{
    DeliveryTracker, EventBus, Executor, IutMonitoring, LogArea, Plugin, RecipeExecution,
    Workspace, WorkspaceProvider,
};
pub use drain::{drain_deliveries, DrainPolicy, DrainReport};
pub use error::{LifecycleError, LifecycleResult};
pub use outcome::{resolve_outcome, UNMATCHED_DESCRIPTION};
pub use plugins::PluginSet;
pub use runner::{Collaborators, SuiteReport, TestRunner};
pub use state::LifecycleState;
