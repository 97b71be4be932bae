//! Recipe execution as local shell processes.
//!
//! Each recipe runs its checkout commands, then its pre-execution commands,
//! then the test command with the recipe parameters appended as `--key value`
//! arguments. All output goes to `<test name>_test_output.log` inside the
//! workspace, which is collected into the log area when the execution closes.
//! Characters of the test name that are unsafe in a file name are replaced
//! with `_`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use etr_core::{Executor, Iut, LogArea, Recipe, RecipeExecution, SuiteContext, Workspace};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};

/// Shell used for every command.
const SHELL: &str = "sh";

/// Runs recipes with `sh -c`.
pub struct ProcessExecutor {
    log_area: Arc<dyn LogArea>,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(log_area: Arc<dyn LogArea>) -> Self {
        Self {
            log_area,
            timeout: None,
        }
    }

    /// Limit every command of a recipe to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn open(
        &self,
        recipe: &Recipe,
        iut: &Iut,
        context: &SuiteContext,
    ) -> anyhow::Result<Box<dyn RecipeExecution>> {
        Ok(Box::new(ProcessExecution {
            test_name: recipe.test_name().to_string(),
            env: recipe_env(recipe, iut, context),
            recipe: recipe.clone(),
            log_area: self.log_area.clone(),
            timeout: self.timeout,
            log_path: None,
            returncode: None,
        }))
    }
}

/// Variables every command sees. Recipe environment wins on conflicts.
fn recipe_env(recipe: &Recipe, iut: &Iut, context: &SuiteContext) -> BTreeMap<String, String> {
    let mut env = BTreeMap::from([
        ("ETR_SUITE_NAME".to_string(), context.suite_name.clone()),
        ("ETR_CONTEXT".to_string(), context.context.clone()),
        (
            "ETR_SUB_SUITE_ID".to_string(),
            context.sub_suite_id.to_string(),
        ),
        ("ETR_TEST_NAME".to_string(), recipe.test_name().to_string()),
        ("ETR_IUT_IDENTITY".to_string(), iut.identity.clone()),
    ]);
    env.extend(recipe.environment.clone());
    env
}

/// `--key value` pairs in key order.
fn parameter_args(parameters: &BTreeMap<String, String>) -> Vec<String> {
    parameters
        .iter()
        .flat_map(|(key, value)| [format!("--{key}"), value.clone()])
        .collect()
}

struct ProcessExecution {
    test_name: String,
    recipe: Recipe,
    env: BTreeMap<String, String>,
    log_area: Arc<dyn LogArea>,
    timeout: Option<Duration>,
    log_path: Option<PathBuf>,
    returncode: Option<i32>,
}

impl ProcessExecution {
    fn command(&self, script: &str, dir: &Path, log: &std::fs::File) -> ExecResult<Command> {
        let log_path = self.log_path.clone().unwrap_or_default();
        let stdout = log.try_clone().map_err(ExecError::io(&log_path))?;
        let stderr = log.try_clone().map_err(ExecError::io(&log_path))?;

        let mut command = Command::new(SHELL);
        command
            .arg("-c")
            .arg(script)
            .current_dir(dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);
        Ok(command)
    }

    async fn run(&self, mut command: Command, display: &str) -> ExecResult<ExitStatus> {
        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            command: display.to_string(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => {
                let bounded = tokio::time::timeout(limit, child.wait()).await;
                match bounded {
                    Ok(waited) => waited,
                    Err(_) => {
                        if let Err(err) = child.kill().await {
                            warn!(test_name = %self.test_name, error = %err, "Failed to kill timed out command");
                        }
                        return Err(ExecError::Timeout {
                            test_name: self.test_name.clone(),
                            limit_ms: limit.as_millis() as u64,
                        });
                    }
                }
            }
            None => child.wait().await,
        };
        waited.map_err(|source| ExecError::Spawn {
            command: display.to_string(),
            source,
        })
    }

    async fn run_step(
        &self,
        step: &'static str,
        script: &str,
        dir: &Path,
        log: &std::fs::File,
    ) -> ExecResult<()> {
        debug!(test_name = %self.test_name, step, command = %script, "Running step");
        let status = self.run(self.command(script, dir, log)?, script).await?;
        if !status.success() {
            return Err(ExecError::StepFailed {
                step,
                command: script.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeExecution for ProcessExecution {
    fn test_name(&self) -> &str {
        &self.test_name
    }

    async fn execute(&mut self, workspace: &dyn Workspace) -> anyhow::Result<()> {
        let dir = workspace.path().to_path_buf();
        let log_path = dir.join(log_file_name(&self.test_name));
        let log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(ExecError::io(&log_path))?
            .into_std()
            .await;
        self.log_path = Some(log_path);

        for script in &self.recipe.checkout {
            self.run_step("checkout", script, &dir, &log).await?;
        }
        for script in &self.recipe.pre_execution {
            self.run_step("pre-execution", script, &dir, &log).await?;
        }

        info!(test_name = %self.test_name, "Starting test");
        let mut command = self.command(&format!("{} \"$@\"", self.recipe.command), &dir, &log)?;
        command
            .arg(SHELL)
            .args(parameter_args(&self.recipe.parameters));
        let status = self.run(command, &self.recipe.command).await?;
        self.returncode = status.code();
        info!(
            test_name = %self.test_name,
            returncode = ?self.returncode,
            "Test finished"
        );
        Ok(())
    }

    fn result(&self) -> bool {
        self.returncode == Some(0)
    }

    fn returncode(&self) -> Option<i32> {
        self.returncode
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        let Some(path) = self.log_path.take() else {
            return Ok(());
        };
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.log_area
                .collect(&path, &log_file_name(&self.test_name))
                .await?;
        }
        Ok(())
    }
}

/// Output log name for a test; test names are often paths like `tests/test_api.py`.
fn log_file_name(test_name: &str) -> String {
    let stem: String = test_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}_test_output.log")
}
