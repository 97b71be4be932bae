//! IUT monitoring through long-running shell commands.

use std::process::Stdio;

use async_trait::async_trait;
use etr_core::IutMonitoring;
use futures::future::join_all;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::ExecError;

/// Runs each monitoring command in the background for the duration of the
/// suite and kills them all on stop.
#[derive(Debug, Default)]
pub struct CommandIutMonitoring {
    commands: Vec<String>,
    children: Vec<Child>,
    active: bool,
}

impl CommandIutMonitoring {
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            children: Vec::new(),
            active: false,
        }
    }
}

#[async_trait]
impl IutMonitoring for CommandIutMonitoring {
    /// Spawn every monitor. If one fails to spawn, the ones already running
    /// are killed before the error is returned.
    async fn start_monitoring(&mut self) -> anyhow::Result<()> {
        for script in &self.commands {
            let spawned = Command::new("sh")
                .arg("-c")
                .arg(script)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn();
            match spawned {
                Ok(child) => {
                    info!(command = %script, pid = child.id(), "IUT monitor started");
                    self.children.push(child);
                }
                Err(source) => {
                    kill_all(&mut self.children).await;
                    return Err(ExecError::Spawn {
                        command: script.clone(),
                        source,
                    }
                    .into());
                }
            }
        }
        self.active = true;
        Ok(())
    }

    async fn stop_monitoring(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        kill_all(&mut self.children).await;
        info!("IUT monitoring stopped");
        Ok(())
    }

    fn monitoring(&self) -> bool {
        self.active
    }
}

async fn kill_all(children: &mut Vec<Child>) {
    let results = join_all(children.iter_mut().map(|child| child.kill())).await;
    for result in results {
        if let Err(err) = result {
            warn!(error = %err, "IUT monitor could not be killed");
        }
    }
    children.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut monitoring = CommandIutMonitoring::new(vec!["sleep 30".into(), "sleep 30".into()]);
        assert!(!monitoring.monitoring());
        monitoring.start_monitoring().await.unwrap();
        assert!(monitoring.monitoring());
        assert_eq!(monitoring.children.len(), 2);

        monitoring.stop_monitoring().await.unwrap();
        assert!(!monitoring.monitoring());
        assert!(monitoring.children.is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut monitoring = CommandIutMonitoring::new(Vec::new());
        monitoring.stop_monitoring().await.unwrap();
        monitoring.start_monitoring().await.unwrap();
        monitoring.stop_monitoring().await.unwrap();
        monitoring.stop_monitoring().await.unwrap();
        assert!(!monitoring.monitoring());
    }

    #[tokio::test]
    async fn test_spawn_failure_kills_started_monitors() {
        // An interior NUL byte makes the second spawn fail.
        let mut monitoring =
            CommandIutMonitoring::new(vec!["sleep 30".into(), "sleep\0 30".into()]);
        let err = monitoring.start_monitoring().await.unwrap_err();
        assert!(err.to_string().contains("sleep"));
        assert!(!monitoring.monitoring());
        assert!(monitoring.children.is_empty());
    }
}
