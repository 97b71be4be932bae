//! Structured observability hooks for suite runs.
//!
//! This module provides:
//! - Suite-scoped tracing spans via the `SuiteSpan` RAII guard
//! - Emission functions for lifecycle events: state changes, recipes, verdicts, draining
//!
//! Events are emitted at `info!` level unless noted (configurable via `ETR_LOG`).

use tracing::{info, warn};

use crate::domain::Outcome;

/// RAII guard that enters a suite-scoped tracing span.
///
/// Only hold it in synchronous code; async code should use
/// [`suite_span`] with `tracing::Instrument`.
pub struct SuiteSpan {
    _span: tracing::span::EnteredSpan,
}

impl SuiteSpan {
    pub fn enter(suite_name: &str, context: &str) -> Self {
        Self {
            _span: suite_span(suite_name, context).entered(),
        }
    }
}

/// Span tagging everything inside with the suite name and context.
pub fn suite_span(suite_name: &str, context: &str) -> tracing::Span {
    tracing::info_span!("etr.suite", suite = %suite_name, context = %context)
}

pub fn emit_state_entered(state: &str) {
    info!(event = "lifecycle.state", state = %state);
}

/// Emit event: suite started event acknowledged, sub suite id known.
pub fn emit_suite_started(suite_name: &str, sub_suite_id: &str) {
    info!(event = "suite.started", suite = %suite_name, sub_suite_id = %sub_suite_id);
}

/// Emit event: recipe `index` (1-based) of `total` is about to run.
pub fn emit_recipe_started(test_name: &str, index: usize, total: usize) {
    info!(
        event = "recipe.started",
        test_name = %test_name,
        index = index,
        total = total,
        "Executing test {index}/{total}"
    );
}

pub fn emit_recipe_finished(test_name: &str, returncode: Option<i32>, passed: bool) {
    info!(
        event = "recipe.finished",
        test_name = %test_name,
        returncode = ?returncode,
        passed = passed,
    );
}

/// Emit event: verdict resolved for the collected exit codes.
pub fn emit_verdict_resolved(outcome: &Outcome, exit_codes: &[Option<i32>]) {
    info!(
        event = "verdict.resolved",
        verdict = %outcome.verdict,
        conclusion = %outcome.conclusion,
        description = %outcome.description,
        exit_codes = ?exit_codes,
    );
}

/// Emit event: still waiting on deliveries.
pub fn emit_drain_progress(remaining: usize, sent_since_last: usize) {
    info!(
        event = "drain.progress",
        remaining = remaining,
        sent_since_last = sent_since_last,
    );
}

/// Emit event: a plugin hook failed (warning level).
pub fn emit_plugin_error(plugin: &str, hook: &str, error: &dyn std::fmt::Display) {
    warn!(event = "plugin.error", plugin = %plugin, hook = %hook, error = %error);
}

/// Emit event: suite finished with its verdict and the process exit status.
pub fn emit_suite_finished(suite_name: &str, outcome: &Outcome, duration_ms: u64) {
    info!(
        event = "suite.finished",
        suite = %suite_name,
        verdict = %outcome.verdict,
        conclusion = %outcome.conclusion,
        exit_status = outcome.exit_status(),
        duration_ms = duration_ms,
    );
}
