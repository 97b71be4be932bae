//! In-memory fakes for the lifecycle collaborators (testing only)
//!
//! Provides `ScriptedExecutor`, `MemoryWorkspaceProvider`, `MemoryLogArea`,
//! `FakeIutMonitoring`, `MemoryEventBus`, `RecordingPlugin` and
//! `FailingPlugin`. They satisfy the trait contracts without touching
//! processes, the filesystem or the network.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    EnvironmentDefined, EventHandle, Iut, Outcome, PersistentLog, Recipe, SuiteContext,
    SuiteFinished, SuiteStarted,
};
use crate::lifecycle::collaborators::*;

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

/// What a scripted recipe does when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStep {
    /// The test framework exits with this code.
    Exit(i32),
    /// The test framework ends without an exit code.
    NoExitCode,
    /// `execute` raises with this message.
    Raise(String),
    /// `open` raises with this message.
    OpenFails(String),
    /// Runs successfully with exit code 0, then `close` raises.
    CloseFails(String),
}

/// Executor whose recipes behave as scripted per test name.
///
/// Unscripted recipes exit with 0.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    steps: HashMap<String, ScriptedStep>,
    opened: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
    contexts: Mutex<Vec<SuiteContext>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, test_name: &str, step: ScriptedStep) -> Self {
        self.steps.insert(test_name.to_string(), step);
        self
    }

    /// Test names in the order they were opened.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Contexts the recipes were opened with.
    pub fn contexts(&self) -> Vec<SuiteContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn open(
        &self,
        recipe: &Recipe,
        _iut: &Iut,
        context: &SuiteContext,
    ) -> anyhow::Result<Box<dyn RecipeExecution>> {
        let step = self
            .steps
            .get(recipe.test_name())
            .cloned()
            .unwrap_or(ScriptedStep::Exit(0));
        if let ScriptedStep::OpenFails(message) = &step {
            bail!("{message}");
        }
        self.opened
            .lock()
            .unwrap()
            .push(recipe.test_name().to_string());
        self.contexts.lock().unwrap().push(context.clone());
        Ok(Box::new(ScriptedExecution {
            test_name: recipe.test_name().to_string(),
            step,
            returncode: None,
            closed: self.closed.clone(),
        }))
    }
}

struct ScriptedExecution {
    test_name: String,
    step: ScriptedStep,
    returncode: Option<i32>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl RecipeExecution for ScriptedExecution {
    fn test_name(&self) -> &str {
        &self.test_name
    }

    async fn execute(&mut self, _workspace: &dyn Workspace) -> anyhow::Result<()> {
        match &self.step {
            ScriptedStep::Exit(code) => self.returncode = Some(*code),
            ScriptedStep::CloseFails(_) => self.returncode = Some(0),
            ScriptedStep::NoExitCode => self.returncode = None,
            ScriptedStep::Raise(message) => bail!("{message}"),
            ScriptedStep::OpenFails(_) => unreachable!("open already failed"),
        }
        Ok(())
    }

    fn result(&self) -> bool {
        self.returncode == Some(0)
    }

    fn returncode(&self) -> Option<i32> {
        self.returncode
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if let ScriptedStep::CloseFails(message) = &self.step {
            bail!("{message}");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryWorkspaceProvider
// ---------------------------------------------------------------------------

/// Hands out workspaces rooted at a fixed, never-created path.
#[derive(Debug)]
pub struct MemoryWorkspaceProvider {
    path: PathBuf,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    fail_acquire: bool,
    fail_release: bool,
}

impl Default for MemoryWorkspaceProvider {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/workspace"),
            acquired: Arc::default(),
            released: Arc::default(),
            fail_acquire: false,
            fail_release: false,
        }
    }
}

impl MemoryWorkspaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkspaceProvider for MemoryWorkspaceProvider {
    async fn acquire(&self) -> anyhow::Result<Box<dyn Workspace>> {
        if self.fail_acquire {
            bail!("no workspace available");
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryWorkspace {
            path: self.path.clone(),
            released: self.released.clone(),
            fail_release: self.fail_release,
        }))
    }
}

struct MemoryWorkspace {
    path: PathBuf,
    released: Arc<AtomicUsize>,
    fail_release: bool,
}

#[async_trait]
impl Workspace for MemoryWorkspace {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            bail!("workspace could not be archived");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryLogArea
// ---------------------------------------------------------------------------

/// Log area that only records references, as `memory://<name>`.
#[derive(Debug, Default)]
pub struct MemoryLogArea {
    logs: Mutex<Vec<PersistentLog>>,
}

impl MemoryLogArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(self, name: &str, uri: &str) -> Self {
        self.logs.lock().unwrap().push(PersistentLog {
            name: name.to_string(),
            uri: uri.to_string(),
        });
        self
    }
}

#[async_trait]
impl LogArea for MemoryLogArea {
    async fn collect(&self, _path: &Path, name: &str) -> anyhow::Result<PersistentLog> {
        let log = PersistentLog {
            name: name.to_string(),
            uri: format!("memory://{name}"),
        };
        self.logs.lock().unwrap().push(log.clone());
        Ok(log)
    }

    fn persistent_logs(&self) -> Vec<PersistentLog> {
        self.logs.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// FakeIutMonitoring
// ---------------------------------------------------------------------------

/// Start/stop counts, shared with the test after the monitor is handed over.
#[derive(Debug, Default)]
pub struct MonitoringStats {
    starts: AtomicUsize,
    stop_calls: AtomicUsize,
    stops: AtomicUsize,
}

impl MonitoringStats {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Every `stop_monitoring` call, including no-op ones.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Stops that ended active monitoring.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct FakeIutMonitoring {
    active: bool,
    fail_start: bool,
    stats: Arc<MonitoringStats>,
}

impl FakeIutMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn stats(&self) -> Arc<MonitoringStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl IutMonitoring for FakeIutMonitoring {
    async fn start_monitoring(&mut self) -> anyhow::Result<()> {
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            bail!("monitoring script missing");
        }
        self.active = true;
        Ok(())
    }

    async fn stop_monitoring(&mut self) -> anyhow::Result<()> {
        self.stats.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.active {
            self.stats.stops.fetch_add(1, Ordering::SeqCst);
            self.active = false;
        }
        Ok(())
    }

    fn monitoring(&self) -> bool {
        self.active
    }
}

// ---------------------------------------------------------------------------
// MemoryEventBus
// ---------------------------------------------------------------------------

/// An event accepted by [`MemoryEventBus`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    SuiteStarted(SuiteStarted),
    EnvironmentDefined(EnvironmentDefined),
    SuiteFinished {
        started: EventHandle,
        event: SuiteFinished,
    },
}

/// Event bus that records events and reports a scripted pending count.
///
/// Each `pending_deliveries` call pops the next scripted value; once the
/// script runs out it reports `0`.
#[derive(Debug, Default)]
pub struct MemoryEventBus {
    events: Mutex<Vec<RecordedEvent>>,
    pending: Mutex<VecDeque<usize>>,
    failed: AtomicUsize,
    fail_suite_started: AtomicBool,
    fail_environment: AtomicBool,
    fail_suite_finished: AtomicBool,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pending(self, script: impl IntoIterator<Item = usize>) -> Self {
        self.pending.lock().unwrap().extend(script);
        self
    }

    /// Report `failed` events as lost by the transport.
    pub fn with_failed_deliveries(self, failed: usize) -> Self {
        self.failed.store(failed, Ordering::SeqCst);
        self
    }

    pub fn failing_suite_started(self) -> Self {
        self.fail_suite_started.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_environment(self) -> Self {
        self.fail_environment.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_suite_finished(self) -> Self {
        self.fail_suite_finished.store(true, Ordering::SeqCst);
        self
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn environment_events(&self) -> Vec<EnvironmentDefined> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::EnvironmentDefined(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn suite_finished(&self) -> Option<SuiteFinished> {
        self.events().into_iter().find_map(|e| match e {
            RecordedEvent::SuiteFinished { event, .. } => Some(event),
            _ => None,
        })
    }

    fn record(&self, event: RecordedEvent, event_type: &str) -> EventHandle {
        self.events.lock().unwrap().push(event);
        EventHandle {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
        }
    }
}

impl DeliveryTracker for MemoryEventBus {
    fn pending_deliveries(&self) -> usize {
        self.pending.lock().unwrap().pop_front().unwrap_or(0)
    }

    fn failed_deliveries(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn send_suite_started(&self, event: &SuiteStarted) -> anyhow::Result<EventHandle> {
        if self.fail_suite_started.load(Ordering::SeqCst) {
            return Err(anyhow!("event bus unavailable"));
        }
        Ok(self.record(
            RecordedEvent::SuiteStarted(event.clone()),
            "TestSuiteStarted",
        ))
    }

    async fn send_environment_defined(
        &self,
        event: &EnvironmentDefined,
    ) -> anyhow::Result<EventHandle> {
        if self.fail_environment.load(Ordering::SeqCst) {
            return Err(anyhow!("event bus rejected environment event"));
        }
        Ok(self.record(
            RecordedEvent::EnvironmentDefined(event.clone()),
            "EnvironmentDefined",
        ))
    }

    async fn send_suite_finished(
        &self,
        started: &EventHandle,
        event: &SuiteFinished,
    ) -> anyhow::Result<EventHandle> {
        if self.fail_suite_finished.load(Ordering::SeqCst) {
            return Err(anyhow!("event bus rejected suite finished event"));
        }
        Ok(self.record(
            RecordedEvent::SuiteFinished {
                started: started.clone(),
                event: event.clone(),
            },
            "TestSuiteFinished",
        ))
    }
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

/// Plugin recording every hook call as `hook:argument`.
#[derive(Debug)]
pub struct RecordingPlugin {
    name: String,
    calls: Mutex<Vec<String>>,
}

impl RecordingPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_suite_triggered(&self, suite_name: &str) -> anyhow::Result<()> {
        self.record(format!("suite_triggered:{suite_name}"))
    }

    fn on_suite_started(&self, started: &EventHandle) -> anyhow::Result<()> {
        self.record(format!("suite_started:{}", started.event_type))
    }

    fn on_suite_finished(&self, suite_name: &str, outcome: &Outcome) -> anyhow::Result<()> {
        self.record(format!("suite_finished:{suite_name}:{}", outcome.verdict))
    }

    fn on_test_triggered(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("test_triggered:{test_name}"))
    }

    fn on_test_started(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("test_started:{test_name}"))
    }

    fn on_error(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("error:{test_name}"))
    }

    fn on_failure(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("failure:{test_name}"))
    }

    fn on_skipped(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("skipped:{test_name}"))
    }

    fn on_success(&self, test_name: &str) -> anyhow::Result<()> {
        self.record(format!("success:{test_name}"))
    }
}

/// Plugin failing every hook.
#[derive(Debug)]
pub struct FailingPlugin {
    name: String,
}

impl FailingPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn fail(&self, hook: &str) -> anyhow::Result<()> {
        bail!("{} failed in {hook}", self.name)
    }
}

impl Plugin for FailingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_suite_triggered(&self, _suite_name: &str) -> anyhow::Result<()> {
        self.fail("on_suite_triggered")
    }

    fn on_suite_started(&self, _started: &EventHandle) -> anyhow::Result<()> {
        self.fail("on_suite_started")
    }

    fn on_suite_finished(&self, _suite_name: &str, _outcome: &Outcome) -> anyhow::Result<()> {
        self.fail("on_suite_finished")
    }

    fn on_test_triggered(&self, _test_name: &str) -> anyhow::Result<()> {
        self.fail("on_test_triggered")
    }

    fn on_test_started(&self, _test_name: &str) -> anyhow::Result<()> {
        self.fail("on_test_started")
    }

    fn on_test_finished(
        &self,
        _test_name: &str,
        _result: crate::domain::TestCaseResult,
    ) -> anyhow::Result<()> {
        self.fail("on_test_finished")
    }
}
