//! Collaborator traits consumed by the lifecycle.
//!
//! These define the narrow seams around the runner:
//! - `Executor` / `RecipeExecution`: running one recipe's test framework
//! - `WorkspaceProvider` / `Workspace`: the working directory of a run
//! - `LogArea`: persistent log references published with the outcome
//! - `IutMonitoring`: start/stop monitoring of the item under test
//! - `EventBus` / `DeliveryTracker`: event publication and pending deliveries
//! - `Plugin`: notification hooks
//!
//! Collaborators report failures as `anyhow::Error`; the lifecycle decides
//! which of them are fatal. In-memory implementations live in
//! [`crate::fakes`].

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{
    EnvironmentDefined, EventHandle, Iut, Outcome, PersistentLog, Recipe, SuiteContext,
    SuiteFinished, SuiteStarted, TestCaseResult,
};

/// Opens a [`RecipeExecution`] for each recipe.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn open(
        &self,
        recipe: &Recipe,
        iut: &Iut,
        context: &SuiteContext,
    ) -> anyhow::Result<Box<dyn RecipeExecution>>;
}

/// One recipe's test framework run.
///
/// The lifecycle calls [`RecipeExecution::close`] exactly once on every path
/// after a successful `open`, including when `execute` failed.
#[async_trait]
pub trait RecipeExecution: Send + Sync {
    fn test_name(&self) -> &str;

    /// Run the recipe to completion inside `workspace`.
    async fn execute(&mut self, workspace: &dyn Workspace) -> anyhow::Result<()>;

    /// Whether the test framework reported success.
    fn result(&self) -> bool;

    /// Test framework exit code; `None` if the process ended without one.
    fn returncode(&self) -> Option<i32>;

    /// Release process and log resources.
    async fn close(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    async fn acquire(&self) -> anyhow::Result<Box<dyn Workspace>>;
}

/// Working directory of a run.
#[async_trait]
pub trait Workspace: Send + Sync {
    fn path(&self) -> &Path;

    /// Collect final artifacts into the log area and tear the workspace down.
    async fn release(&mut self) -> anyhow::Result<()>;
}

/// Where logs and artifacts are kept after the run.
#[async_trait]
pub trait LogArea: Send + Sync {
    /// Store the file at `path` under `name` and return its reference.
    async fn collect(&self, path: &Path, name: &str) -> anyhow::Result<PersistentLog>;

    /// Everything collected so far, in collection order.
    fn persistent_logs(&self) -> Vec<PersistentLog>;
}

#[async_trait]
pub trait IutMonitoring: Send + Sync {
    async fn start_monitoring(&mut self) -> anyhow::Result<()>;

    /// Stop monitoring. Stopping an inactive monitor is a no-op.
    async fn stop_monitoring(&mut self) -> anyhow::Result<()>;

    fn monitoring(&self) -> bool;
}

/// Read-only view of deliveries the transport has not completed yet.
pub trait DeliveryTracker: Send + Sync {
    fn pending_deliveries(&self) -> usize;

    /// Events the transport gave up on. They no longer count as pending.
    fn failed_deliveries(&self) -> usize {
        0
    }
}

/// Publishes lifecycle events. Delivery may continue in the background.
#[async_trait]
pub trait EventBus: DeliveryTracker {
    async fn send_suite_started(&self, event: &SuiteStarted) -> anyhow::Result<EventHandle>;

    async fn send_environment_defined(
        &self,
        event: &EnvironmentDefined,
    ) -> anyhow::Result<EventHandle>;

    async fn send_suite_finished(
        &self,
        started: &EventHandle,
        event: &SuiteFinished,
    ) -> anyhow::Result<EventHandle>;
}

/// Notification hooks. Every hook defaults to a no-op.
///
/// A hook error is logged by the lifecycle and never stops the run or the
/// remaining plugins.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn on_suite_triggered(&self, _suite_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_suite_started(&self, _started: &EventHandle) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_suite_finished(&self, _suite_name: &str, _outcome: &Outcome) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_test_triggered(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_test_started(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Dispatches to `on_error`, `on_failure`, `on_skipped` or `on_success`.
    fn on_test_finished(&self, test_name: &str, result: TestCaseResult) -> anyhow::Result<()> {
        match result {
            TestCaseResult::Error => self.on_error(test_name),
            TestCaseResult::Failed => self.on_failure(test_name),
            TestCaseResult::Skipped => self.on_skipped(test_name),
            TestCaseResult::Passed => self.on_success(test_name),
        }
    }

    fn on_error(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_failure(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_skipped(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_success(&self, _test_name: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
