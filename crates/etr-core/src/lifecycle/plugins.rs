//! Ordered plugin broadcast with per-call error isolation.

use std::sync::Arc;

use super::collaborators::Plugin;
use crate::domain::{EventHandle, Outcome, TestCaseResult};
use crate::obs;

/// Plugins in registration order.
#[derive(Clone, Default)]
pub struct PluginSet {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginSet {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Invoke `call` on every plugin; errors are logged and skipped.
    fn broadcast<F>(&self, hook: &'static str, call: F)
    where
        F: Fn(&dyn Plugin) -> anyhow::Result<()>,
    {
        for plugin in &self.plugins {
            if let Err(err) = call(plugin.as_ref()) {
                obs::emit_plugin_error(plugin.name(), hook, &err);
            }
        }
    }

    pub fn suite_triggered(&self, suite_name: &str) {
        self.broadcast("on_suite_triggered", |p| p.on_suite_triggered(suite_name));
    }

    pub fn suite_started(&self, started: &EventHandle) {
        self.broadcast("on_suite_started", |p| p.on_suite_started(started));
    }

    pub fn suite_finished(&self, suite_name: &str, outcome: &Outcome) {
        self.broadcast("on_suite_finished", |p| {
            p.on_suite_finished(suite_name, outcome)
        });
    }

    pub fn test_triggered(&self, test_name: &str) {
        self.broadcast("on_test_triggered", |p| p.on_test_triggered(test_name));
    }

    pub fn test_started(&self, test_name: &str) {
        self.broadcast("on_test_started", |p| p.on_test_started(test_name));
    }

    pub fn test_finished(&self, test_name: &str, result: TestCaseResult) {
        self.broadcast("on_test_finished", |p| p.on_test_finished(test_name, result));
    }
}

impl std::fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}
