//! The suite lifecycle state machine.
//!
//! A run moves through TRIGGERED, STARTED, ENVIRONMENT, EXECUTING,
//! FINALIZING and DRAINING before reaching TERMINAL. Once the suite started
//! event is acknowledged, FINALIZING and DRAINING always run, so the suite
//! finished event is published even when a recipe raised.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn, Instrument};

use super::collaborators::{
    EventBus, Executor, IutMonitoring, LogArea, Workspace, WorkspaceProvider,
};
use super::drain::{drain_deliveries, DrainReport};
use super::error::{LifecycleError, LifecycleResult};
use super::outcome::resolve_outcome;
use super::plugins::PluginSet;
use super::state::LifecycleState;
use crate::config::RunnerConfig;
use crate::domain::{
    EnvironmentDefined, EventHandle, Host, Outcome, PersistentLog, SuiteContext, SuiteDefinition,
    SuiteFinished, SuiteStarted, TestCaseResult,
};
use crate::obs;
use crate::verdict::{ExitCode, VerdictMatcher};

/// Everything the runner talks to.
pub struct Collaborators {
    pub executor: Arc<dyn Executor>,
    pub workspaces: Arc<dyn WorkspaceProvider>,
    pub log_area: Arc<dyn LogArea>,
    pub monitoring: Box<dyn IutMonitoring>,
    pub events: Arc<dyn EventBus>,
    pub plugins: PluginSet,
}

/// Result of a run that published its outcome and drained its events.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub context: SuiteContext,
    /// One entry per recipe that ran to completion, in recipe order.
    pub exit_codes: Vec<ExitCode>,
    pub recipes_total: usize,
    pub outcome: Outcome,
    pub persistent_logs: Vec<PersistentLog>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip)]
    pub drain: DrainReport,
}

impl SuiteReport {
    pub fn exit_status(&self) -> i32 {
        self.outcome.exit_status()
    }
}

/// An error raised while executing, kept until the outcome is published.
#[derive(Debug)]
struct RunFailure {
    test_name: Option<String>,
    message: String,
}

impl RunFailure {
    fn new(test_name: Option<&str>, err: &anyhow::Error) -> Self {
        Self {
            test_name: test_name.map(str::to_string),
            message: format!("{err:#}"),
        }
    }
}

/// Drives one suite definition through its lifecycle.
pub struct TestRunner {
    suite: SuiteDefinition,
    config: RunnerConfig,
    matcher: VerdictMatcher,
    collaborators: Collaborators,
    state: LifecycleState,
}

impl TestRunner {
    pub fn new(
        suite: SuiteDefinition,
        config: RunnerConfig,
        matcher: VerdictMatcher,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            suite,
            config,
            matcher,
            collaborators,
            state: LifecycleState::Triggered,
        }
    }

    /// Phase the runner is in, `Terminal` once [`TestRunner::execute`] returned.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn suite(&self) -> &SuiteDefinition {
        &self.suite
    }

    /// Run the suite to completion.
    ///
    /// Errors, in precedence order: [`LifecycleError::SuiteStart`] when nothing
    /// ran; [`LifecycleError::DeliveryTimeout`] or [`LifecycleError::DeliveryFailed`]
    /// when events were left undelivered;
    /// [`LifecycleError::Execution`] when a recipe or the workspace raised;
    /// [`LifecycleError::SuiteFinish`] when the outcome could not be published.
    pub async fn execute(&mut self) -> LifecycleResult<SuiteReport> {
        let span = obs::suite_span(&self.suite.name, &self.suite.context);
        let started = Instant::now();
        let result = self.run().instrument(span).await;
        self.enter(LifecycleState::Terminal);
        if let Ok(report) = &result {
            obs::emit_suite_finished(
                &self.suite.name,
                &report.outcome,
                started.elapsed().as_millis() as u64,
            );
        }
        result
    }

    fn enter(&mut self, state: LifecycleState) {
        self.state = state;
        obs::emit_state_entered(state.as_str());
    }

    async fn run(&mut self) -> LifecycleResult<SuiteReport> {
        let started_at = Utc::now();
        self.enter(LifecycleState::Triggered);
        self.collaborators.plugins.suite_triggered(&self.suite.name);

        self.enter(LifecycleState::Started);
        info!("Send test suite started event");
        let started = self
            .collaborators
            .events
            .send_suite_started(&SuiteStarted::for_suite(&self.suite))
            .await
            .map_err(LifecycleError::SuiteStart)?;
        self.collaborators.plugins.suite_started(&started);
        let context = SuiteContext {
            suite_name: self.suite.name.clone(),
            context: self.suite.context.clone(),
            main_suite_id: self.suite.main_suite_id.clone(),
            sub_suite_id: started.event_id,
        };
        obs::emit_suite_started(&self.suite.name, &context.sub_suite_id.to_string());

        self.enter(LifecycleState::Environment);
        self.announce_environment(&context).await;

        self.enter(LifecycleState::Executing);
        let mut exit_codes = Vec::with_capacity(self.suite.recipes.len());
        let failure = self.execute_in_workspace(&context, &mut exit_codes).await;

        self.enter(LifecycleState::Finalizing);
        self.stop_monitoring().await;
        let outcome = resolve_outcome(
            &self.matcher,
            &exit_codes,
            failure.as_ref().map(|f| f.message.as_str()),
        );
        obs::emit_verdict_resolved(&outcome, &exit_codes);
        self.collaborators
            .plugins
            .suite_finished(&self.suite.name, &outcome);
        let persistent_logs = self.collaborators.log_area.persistent_logs();
        let finished = self.publish_finished(&started, &outcome, &persistent_logs).await;

        self.enter(LifecycleState::Draining);
        let drained = drain_deliveries(self.collaborators.events.as_ref(), &self.config.drain).await;

        let drain = match drained {
            Ok(report) => report,
            Err(err) => {
                if let Some(failure) = &failure {
                    error!(
                        test_name = failure.test_name.as_deref(),
                        error = %failure.message,
                        "Suite execution failed before event delivery failed"
                    );
                }
                return Err(err);
            }
        };
        if let Some(failure) = failure {
            return Err(LifecycleError::Execution {
                test_name: failure.test_name,
                message: failure.message,
                exit_codes,
                outcome: Box::new(outcome),
            });
        }
        finished?;

        Ok(SuiteReport {
            context,
            exit_codes,
            recipes_total: self.suite.recipes.len(),
            outcome,
            persistent_logs,
            started_at,
            finished_at: Utc::now(),
            drain,
        })
    }

    async fn announce_environment(&self, context: &SuiteContext) {
        let announcements = [
            ("ETR Hostname", self.config.hostname.as_deref()),
            (
                "Execution Space URL",
                self.config.execution_space_url.as_deref(),
            ),
        ];
        for (name, value) in announcements {
            let Some(value) = value else {
                continue;
            };
            let event = EnvironmentDefined {
                name: name.to_string(),
                context: context.sub_suite_id,
                host: Host {
                    name: value.to_string(),
                    user: self.config.host_user.clone(),
                },
            };
            if let Err(err) = self
                .collaborators
                .events
                .send_environment_defined(&event)
                .await
            {
                warn!(environment = name, error = %format!("{err:#}"), "Environment defined event not sent");
            }
        }
    }

    /// EXECUTING: recipes run inside one workspace with monitoring active.
    ///
    /// Monitoring is stopped and the workspace released on every path.
    async fn execute_in_workspace(
        &mut self,
        context: &SuiteContext,
        exit_codes: &mut Vec<ExitCode>,
    ) -> Option<RunFailure> {
        let mut workspace = match self.collaborators.workspaces.acquire().await {
            Ok(workspace) => workspace,
            Err(err) => return Some(RunFailure::new(None, &err.context("workspace unavailable"))),
        };

        info!("Start IUT monitoring");
        let monitoring_started = self.collaborators.monitoring.start_monitoring().await;
        let mut failure = match monitoring_started {
            Ok(()) => {
                self.execute_recipes(workspace.as_ref(), context, exit_codes)
                    .await
            }
            Err(err) => Some(RunFailure::new(
                None,
                &err.context("IUT monitoring could not be started"),
            )),
        };
        self.stop_monitoring().await;

        if let Err(err) = workspace.release().await {
            let err = err.context("workspace release failed");
            match &failure {
                None => failure = Some(RunFailure::new(None, &err)),
                Some(_) => error!(error = %format!("{err:#}"), "Workspace release failed"),
            }
        }
        failure
    }

    async fn execute_recipes(
        &self,
        workspace: &dyn Workspace,
        context: &SuiteContext,
        exit_codes: &mut Vec<ExitCode>,
    ) -> Option<RunFailure> {
        let plugins = &self.collaborators.plugins;
        let total = self.suite.recipes.len();

        for (index, recipe) in self.suite.recipes.iter().enumerate() {
            obs::emit_recipe_started(recipe.test_name(), index + 1, total);
            let mut execution = match self
                .collaborators
                .executor
                .open(recipe, &self.suite.iut, context)
                .await
            {
                Ok(execution) => execution,
                Err(err) => return Some(RunFailure::new(Some(recipe.test_name()), &err)),
            };
            let test_name = execution.test_name().to_string();
            plugins.test_triggered(&test_name);
            plugins.test_started(&test_name);

            let executed = execution.execute(workspace).await;
            let returncode = execution.returncode();
            let passed = execution.result();
            let closed = execution.close().await;

            if let Err(err) = executed {
                plugins.test_finished(&test_name, TestCaseResult::Error);
                if let Err(close_err) = closed {
                    warn!(test_name = %test_name, error = %format!("{close_err:#}"), "Closing executor failed");
                }
                return Some(RunFailure::new(Some(&test_name), &err));
            }

            exit_codes.push(returncode);
            obs::emit_recipe_finished(&test_name, returncode, passed);
            plugins.test_finished(&test_name, TestCaseResult::from_returncode(returncode));

            if let Err(err) = closed {
                return Some(RunFailure::new(
                    Some(&test_name),
                    &err.context("closing executor failed"),
                ));
            }
        }
        None
    }

    async fn stop_monitoring(&mut self) {
        let monitoring = &mut self.collaborators.monitoring;
        if !monitoring.monitoring() {
            return;
        }
        info!("Stop IUT monitoring");
        if let Err(err) = monitoring.stop_monitoring().await {
            warn!(error = %format!("{err:#}"), "Stopping IUT monitoring failed");
        }
    }

    async fn publish_finished(
        &self,
        started: &EventHandle,
        outcome: &Outcome,
        persistent_logs: &[PersistentLog],
    ) -> LifecycleResult<EventHandle> {
        info!("Send test suite finished event");
        let event = SuiteFinished {
            context: self.suite.context.clone(),
            outcome: outcome.clone(),
            persistent_logs: persistent_logs.to_vec(),
        };
        self.collaborators
            .events
            .send_suite_finished(started, &event)
            .await
            .map_err(|err| {
                error!(error = %format!("{err:#}"), "Test suite finished event not sent");
                LifecycleError::SuiteFinish(err)
            })
    }
}
