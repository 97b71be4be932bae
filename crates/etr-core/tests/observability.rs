//! Observability tests for suite lifecycle tracing.
//!
//! These verify the `emit_*` helpers, span guards and a full run log the
//! expected structured fields.

use std::sync::Arc;

use etr_core::fakes::{
    FakeIutMonitoring, MemoryEventBus, MemoryLogArea, MemoryWorkspaceProvider, ScriptedExecutor,
};
use etr_core::obs::{
    emit_drain_progress, emit_plugin_error, emit_recipe_finished, emit_recipe_started,
    emit_state_entered, emit_suite_finished, emit_suite_started, suite_span, SuiteSpan,
};
use etr_core::{
    Collaborators, Conclusion, Iut, LifecycleState, Outcome, PluginSet, Recipe, RunnerConfig,
    SuiteDefinition, TestRunner, Verdict, VerdictMatcher,
};
use tracing_test::traced_test;

fn outcome() -> Outcome {
    Outcome {
        verdict: Verdict::Passed,
        conclusion: Conclusion::Successful,
        description: "Executed, no errors".to_string(),
        detailed_description: None,
    }
}

#[traced_test]
#[test]
fn test_lifecycle_events_are_logged() {
    let _span = SuiteSpan::enter("Regression", "fde87097");
    for state in [
        LifecycleState::Triggered,
        LifecycleState::Started,
        LifecycleState::Environment,
        LifecycleState::Executing,
        LifecycleState::Finalizing,
        LifecycleState::Draining,
        LifecycleState::Terminal,
    ] {
        emit_state_entered(state.as_str());
    }
    emit_suite_started("Regression", "3c8d5ea0-2b0f-4e4c-b7f6-6a1b9bb2a7d0");
    emit_recipe_started("api_functests", 1, 1);
    emit_recipe_finished("api_functests", Some(0), true);
    emit_drain_progress(4, 1);
    emit_suite_finished("Regression", &outcome(), 1200);

    assert!(logs_contain("state=TRIGGERED"));
    assert!(logs_contain("state=TERMINAL"));
    assert!(logs_contain("sub_suite_id=3c8d5ea0-2b0f-4e4c-b7f6-6a1b9bb2a7d0"));
    assert!(logs_contain("Executing test 1/1"));
    assert!(logs_contain("returncode=Some(0)"));
    assert!(logs_contain("remaining=4"));
    assert!(logs_contain("exit_status=0"));
    assert!(logs_contain("duration_ms=1200"));
}

#[traced_test]
#[test]
fn test_plugin_error_emits_warning() {
    emit_plugin_error("junit-reporter", "on_test_finished", &"disk full");

    assert!(logs_contain("WARN"));
    assert!(logs_contain("plugin=junit-reporter"));
    assert!(logs_contain("hook=on_test_finished"));
    assert!(logs_contain("disk full"));
}

#[traced_test]
#[tokio::test]
async fn test_suite_span_instruments_async_work() {
    use tracing::Instrument;

    async {
        emit_state_entered("EXECUTING");
    }
    .instrument(suite_span("Regression", "fde87097"))
    .await;

    assert!(logs_contain("Regression"));
    assert!(logs_contain("state=EXECUTING"));
}

#[traced_test]
#[tokio::test]
async fn test_run_logs_each_state() {
    let collaborators = Collaborators {
        executor: Arc::new(ScriptedExecutor::new()),
        workspaces: Arc::new(MemoryWorkspaceProvider::new()),
        log_area: Arc::new(MemoryLogArea::new()),
        monitoring: Box::new(FakeIutMonitoring::new()),
        events: Arc::new(MemoryEventBus::new()),
        plugins: PluginSet::new(Vec::new()),
    };
    let suite = SuiteDefinition {
        name: "Regression".to_string(),
        context: "fde87097".to_string(),
        main_suite_id: None,
        iut: Iut::new("pkg:generic/iut@1"),
        recipes: vec![Recipe::new("api_functests", "exit 0")],
        log_area: Default::default(),
        monitoring: Vec::new(),
    };
    let mut runner = TestRunner::new(
        suite,
        RunnerConfig::default(),
        VerdictMatcher::default(),
        collaborators,
    );
    runner.execute().await.unwrap();

    for state in ["STARTED", "ENVIRONMENT", "EXECUTING", "FINALIZING", "DRAINING", "TERMINAL"] {
        assert!(logs_contain(&format!("state={state}")), "{state} not logged");
    }
    assert!(logs_contain("Executing test 1/1"));
    assert!(logs_contain("verdict=PASSED"));
}
