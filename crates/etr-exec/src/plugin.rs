//! A plugin that reports lifecycle notifications through `tracing`.

use etr_core::{EventHandle, Outcome, Plugin};
use tracing::info;

/// Logs every lifecycle notification.
#[derive(Debug, Default)]
pub struct TracingPlugin;

impl Plugin for TracingPlugin {
    fn name(&self) -> &str {
        "tracing"
    }

    fn on_suite_triggered(&self, suite_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", suite = %suite_name, "Test suite triggered");
        Ok(())
    }

    fn on_suite_started(&self, started: &EventHandle) -> anyhow::Result<()> {
        info!(plugin = "tracing", event_id = %started.event_id, "Test suite started");
        Ok(())
    }

    fn on_suite_finished(&self, suite_name: &str, outcome: &Outcome) -> anyhow::Result<()> {
        info!(
            plugin = "tracing",
            suite = %suite_name,
            verdict = %outcome.verdict,
            conclusion = %outcome.conclusion,
            "Test suite finished"
        );
        Ok(())
    }

    fn on_test_started(&self, test_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", test_name = %test_name, "Test started");
        Ok(())
    }

    fn on_error(&self, test_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", test_name = %test_name, result = "ERROR", "Test finished");
        Ok(())
    }

    fn on_failure(&self, test_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", test_name = %test_name, result = "FAILED", "Test finished");
        Ok(())
    }

    fn on_skipped(&self, test_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", test_name = %test_name, result = "SKIPPED", "Test finished");
        Ok(())
    }

    fn on_success(&self, test_name: &str) -> anyhow::Result<()> {
        info!(plugin = "tracing", test_name = %test_name, result = "PASSED", "Test finished");
        Ok(())
    }
}
