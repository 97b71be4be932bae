//! Workspaces as per-run directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use etr_core::{LogArea, Workspace, WorkspaceProvider};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ExecError;

/// Subdirectory whose files are collected into the log area on release.
pub const ARTIFACT_DIR: &str = "artifacts";

/// Creates a fresh `workspace-<uuid>` directory under `root` per run.
pub struct FsWorkspaceProvider {
    root: PathBuf,
    log_area: Arc<dyn LogArea>,
    keep: bool,
}

impl FsWorkspaceProvider {
    pub fn new(root: impl Into<PathBuf>, log_area: Arc<dyn LogArea>) -> Self {
        Self {
            root: root.into(),
            log_area,
            keep: false,
        }
    }

    /// Leave the workspace directory in place after release.
    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }
}

#[async_trait]
impl WorkspaceProvider for FsWorkspaceProvider {
    async fn acquire(&self) -> anyhow::Result<Box<dyn Workspace>> {
        let path = self.root.join(format!("workspace-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(path.join(ARTIFACT_DIR))
            .await
            .map_err(ExecError::io(&path))?;
        info!(path = %path.display(), "Workspace created");
        Ok(Box::new(FsWorkspace {
            path,
            log_area: self.log_area.clone(),
            keep: self.keep,
            released: false,
        }))
    }
}

pub struct FsWorkspace {
    path: PathBuf,
    log_area: Arc<dyn LogArea>,
    keep: bool,
    released: bool,
}

impl FsWorkspace {
    /// Regular files directly inside the artifact directory, by name.
    async fn artifacts(&self) -> anyhow::Result<Vec<PathBuf>> {
        let dir = self.path.join(ARTIFACT_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ExecError::Io { path: dir, source }.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ExecError::io(&dir))? {
            if entry.file_type().await.map_err(ExecError::io(entry.path()))?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl Workspace for FsWorkspace {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        for file in self.artifacts().await? {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            self.log_area.collect(&file, name).await?;
        }

        if self.keep {
            debug!(path = %self.path.display(), "Keeping workspace");
        } else {
            tokio::fs::remove_dir_all(&self.path)
                .await
                .map_err(ExecError::io(&self.path))?;
        }
        Ok(())
    }
}
