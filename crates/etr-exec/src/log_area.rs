//! Log area backed by a local directory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use etr_core::{LogArea, PersistentLog};
use tracing::info;

use crate::error::ExecError;

/// Copies collected files into `root` and publishes `file://` URIs.
///
/// A name collected twice is stored with a numeric suffix so earlier
/// references stay valid.
#[derive(Debug)]
pub struct LocalLogArea {
    root: PathBuf,
    logs: Mutex<Vec<PersistentLog>>,
}

impl LocalLogArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unique_name(&self, name: &str) -> String {
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        let taken = |candidate: &str| logs.iter().any(|l| l.name == candidate);
        if !taken(name) {
            return name.to_string();
        }
        (1..)
            .map(|n| format!("{n}_{name}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

#[async_trait]
impl LogArea for LocalLogArea {
    async fn collect(&self, path: &Path, name: &str) -> anyhow::Result<PersistentLog> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(ExecError::io(&self.root))?;

        let name = self.unique_name(name);
        let target = self.root.join(&name);
        tokio::fs::copy(path, &target)
            .await
            .map_err(ExecError::io(path))?;
        let target = tokio::fs::canonicalize(&target)
            .await
            .map_err(ExecError::io(&target))?;

        let log = PersistentLog {
            name,
            uri: format!("file://{}", target.display()),
        };
        info!(name = %log.name, uri = %log.uri, "Collected log");
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(log.clone());
        Ok(log)
    }

    fn persistent_logs(&self) -> Vec<PersistentLog> {
        self.logs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
