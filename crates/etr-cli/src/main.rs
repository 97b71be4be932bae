//! ETR - suite test runner CLI
//!
//! The `etr` command runs a suite of test recipes and reports its verdict.
//!
//! ## Commands
//!
//! - `run`: Execute a suite definition and publish its lifecycle events
//! - `verdict`: Evaluate verdict rules against a list of exit codes
//! - `check-rules`: Validate a verdict rule file
//!
//! The process exit status is `0` for PASSED, `1` for FAILED and `2` for
//! INCONCLUSIVE. Configuration errors exit with `3`, other runner failures
//! with `4`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, Level};

use etr_core::verdict::ConfigError;
use etr_core::{
    Collaborators, DrainPolicy, LifecycleError, Plugin, PluginSet, RunnerConfig, SuiteDefinition,
    SuiteError, SuiteReport, TestRunner, VerdictMatcher,
};
use etr_exec::{
    CommandIutMonitoring, FsWorkspaceProvider, JsonlEventBus, LocalLogArea, ProcessExecutor,
    TracingPlugin,
};

const EXIT_CONFIG_ERROR: u8 = 3;
const EXIT_RUNNER_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "etr")]
#[command(version = etr_core::VERSION)]
#[command(about = "Suite test runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a suite definition
    Run(RunArgs),

    /// Evaluate verdict rules against test framework exit codes
    Verdict {
        /// Exit codes in recipe order; `null` for a recipe without one
        #[arg(value_delimiter = ',', value_parser = parse_exit_code, allow_negative_numbers = true)]
        exit_codes: Vec<ExitCodeArg>,

        /// Verdict rule file [default: $VERDICT_RULE_FILE, else the default rules]
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Validate a verdict rule file
    CheckRules {
        /// Rule file to validate
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Suite definition (JSON)
    #[arg(short, long)]
    suite: PathBuf,

    /// Verdict rule file [default: $VERDICT_RULE_FILE, else the default rules]
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Host name announced as an environment [default: $HOSTNAME]
    #[arg(long)]
    hostname: Option<String>,

    /// Execution space URL announced as an environment [default: $EXECUTION_SPACE_URL]
    #[arg(long)]
    execution_space_url: Option<String>,

    /// Directory for workspaces, logs and events
    #[arg(long, env = "ETR_WORKDIR", default_value = ".etr")]
    workdir: PathBuf,

    /// Event log (default: <workdir>/events.jsonl)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Per-command timeout for recipes, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// How long to wait for event delivery before giving up, in seconds
    #[arg(long, default_value = "600")]
    drain_timeout_secs: u64,

    /// Keep the workspace directory after the run
    #[arg(long)]
    keep_workspace: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

/// One exit code argument, `null` meaning none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ExitCodeArg(Option<i32>);

fn parse_exit_code(s: &str) -> std::result::Result<ExitCodeArg, String> {
    match s.trim() {
        "null" | "none" | "None" => Ok(ExitCodeArg(None)),
        other => other
            .parse::<i32>()
            .map(|code| ExitCodeArg(Some(code)))
            .map_err(|e| format!("'{other}' is not an exit code or null: {e}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    etr_core::telemetry::init_tracing(cli.json, level);

    let env_config = RunnerConfig::from_env();
    let result = match cli.command {
        Commands::Run(args) => cmd_run(args, env_config).await,
        Commands::Verdict { exit_codes, rules } => {
            let config = match rules {
                Some(rules) => env_config.with_verdict_rule_file(rules),
                None => env_config,
            };
            cmd_verdict(&exit_codes, &config)
        }
        Commands::CheckRules { path } => cmd_check_rules(&path),
    };

    match result {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            error!(error = %format!("{err:#}"), "etr failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status_for(&err))
        }
    }
}

/// Exit status for a failed command.
///
/// A suite that raised still published an outcome; its verdict decides.
fn exit_status_for(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<SuiteError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    match err.downcast_ref::<LifecycleError>() {
        Some(LifecycleError::Execution { outcome, .. }) => outcome.exit_status() as u8,
        _ => EXIT_RUNNER_ERROR,
    }
}

/// Flags given on the command line win over the environment.
fn run_config(base: RunnerConfig, args: &RunArgs) -> RunnerConfig {
    let mut config = base.with_drain_policy(DrainPolicy {
        timeout: Duration::from_secs(args.drain_timeout_secs),
        ..DrainPolicy::default()
    });
    if let Some(rules) = &args.rules {
        config = config.with_verdict_rule_file(rules);
    }
    if let Some(hostname) = &args.hostname {
        config = config.with_hostname(hostname);
    }
    if let Some(url) = &args.execution_space_url {
        config = config.with_execution_space_url(url);
    }
    config
}

async fn cmd_run(args: RunArgs, env_config: RunnerConfig) -> Result<u8> {
    let suite = SuiteDefinition::from_path(&args.suite)?;
    let config = run_config(env_config, &args);
    let matcher = config.verdict_matcher()?;

    tokio::fs::create_dir_all(&args.workdir)
        .await
        .with_context(|| format!("Failed to create {}", args.workdir.display()))?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.workdir.join("events.jsonl"));

    let logs = Arc::new(LocalLogArea::new(args.workdir.join("logs")));
    let events = Arc::new(JsonlEventBus::to_file(&events_path).await?);
    let mut executor = ProcessExecutor::new(logs.clone());
    if let Some(secs) = args.timeout_secs {
        executor = executor.with_timeout(Duration::from_secs(secs));
    }
    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(TracingPlugin)];
    let collaborators = Collaborators {
        executor: Arc::new(executor),
        workspaces: Arc::new(
            FsWorkspaceProvider::new(args.workdir.join("workspaces"), logs.clone())
                .keep_workspace(args.keep_workspace),
        ),
        log_area: logs,
        monitoring: Box::new(CommandIutMonitoring::new(suite.monitoring.clone())),
        events,
        plugins: PluginSet::new(plugins),
    };

    info!(suite = %suite.name, recipes = suite.recipes.len(), "Running suite");
    let mut runner = TestRunner::new(suite, config, matcher, collaborators);
    let report = runner.execute().await?;

    print_report(&report);
    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(report.exit_status() as u8)
}

fn print_report(report: &SuiteReport) {
    println!(
        "{} ({}): {}",
        report.outcome.verdict, report.outcome.conclusion, report.outcome.description
    );
    println!(
        "  Recipes:  {}/{} completed",
        report.exit_codes.len(),
        report.recipes_total
    );
    println!("  Sub suite: {}", report.context.sub_suite_id);
    for log in &report.persistent_logs {
        println!("  Log:      {} -> {}", log.name, log.uri);
    }
}

fn write_report(path: &Path, report: &SuiteReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn cmd_verdict(exit_codes: &[ExitCodeArg], config: &RunnerConfig) -> Result<u8> {
    let matcher = config.verdict_matcher()?;
    let codes: Vec<Option<i32>> = exit_codes.iter().map(|c| c.0).collect();
    let outcome = etr_core::lifecycle::resolve_outcome(&matcher, &codes, None);
    println!(
        "{} ({}): {}",
        outcome.verdict, outcome.conclusion, outcome.description
    );
    Ok(outcome.exit_status() as u8)
}

fn cmd_check_rules(path: &Path) -> Result<u8> {
    let matcher = VerdictMatcher::from_path(path)?;
    println!("{} rule(s) OK in {}", matcher.rules().len(), path.display());
    for (index, rule) in matcher.rules().iter().enumerate() {
        println!(
            "  {index}: {} -> {} / {}",
            rule.description, rule.conclusion, rule.verdict
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use etr_core::{Conclusion, Outcome, Verdict};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_exit_codes() {
        let cli = Cli::try_parse_from(["etr", "verdict", "0,1,null,-1"]).unwrap();
        match cli.command {
            Commands::Verdict { exit_codes, .. } => assert_eq!(
                exit_codes,
                vec![
                    ExitCodeArg(Some(0)),
                    ExitCodeArg(Some(1)),
                    ExitCodeArg(None),
                    ExitCodeArg(Some(-1)),
                ]
            ),
            _ => panic!("expected verdict command"),
        }
        assert!(parse_exit_code("abc").is_err());
    }

    #[test]
    fn test_run_args_defaults() {
        let cli = Cli::try_parse_from(["etr", "--json", "run", "--suite", "suite.json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.workdir, PathBuf::from(".etr"));
                assert_eq!(args.drain_timeout_secs, 600);
                assert!(!args.keep_workspace);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_flags_override_environment() {
        let env_config = RunnerConfig::default()
            .with_hostname("from-env")
            .with_execution_space_url("http://es/env")
            .with_verdict_rule_file("/env/rules.json");
        let cli = Cli::try_parse_from([
            "etr",
            "run",
            "--suite",
            "suite.json",
            "--hostname",
            "from-flag",
            "--drain-timeout-secs",
            "30",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let config = run_config(env_config, &args);
        assert_eq!(config.hostname.as_deref(), Some("from-flag"));
        assert_eq!(config.execution_space_url.as_deref(), Some("http://es/env"));
        assert_eq!(
            config.verdict_rule_file.as_deref(),
            Some(Path::new("/env/rules.json"))
        );
        assert_eq!(config.drain.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_verdict_exit_statuses() {
        let config = RunnerConfig::default();
        assert_eq!(cmd_verdict(&[ExitCodeArg(Some(0))], &config).unwrap(), 0);
        assert_eq!(
            cmd_verdict(&[ExitCodeArg(Some(0)), ExitCodeArg(Some(1))], &config).unwrap(),
            1
        );
        assert_eq!(cmd_verdict(&[ExitCodeArg(None)], &config).unwrap(), 1);
        assert_eq!(cmd_verdict(&[ExitCodeArg(Some(-1))], &config).unwrap(), 2);
    }

    #[test]
    fn test_invalid_rules_exit_with_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "rules.json", r#"[{"description": "x"}]"#);
        let err = cmd_check_rules(&path).unwrap_err();
        assert_eq!(exit_status_for(&err), EXIT_CONFIG_ERROR);

        let config = RunnerConfig::default().with_verdict_rule_file(&path);
        let err = cmd_verdict(&[], &config).unwrap_err();
        assert_eq!(exit_status_for(&err), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_exit_status_for_lifecycle_errors() {
        let timeout = anyhow::Error::new(LifecycleError::DeliveryTimeout { remaining: 3 });
        assert_eq!(exit_status_for(&timeout), EXIT_RUNNER_ERROR);

        let lost = anyhow::Error::new(LifecycleError::DeliveryFailed { failed: 1 });
        assert_eq!(exit_status_for(&lost), EXIT_RUNNER_ERROR);

        let execution = anyhow::Error::new(LifecycleError::Execution {
            test_name: Some("smoke".into()),
            message: "boom".into(),
            exit_codes: vec![Some(0)],
            outcome: Box::new(Outcome {
                verdict: Verdict::Failed,
                conclusion: Conclusion::Inconclusive,
                description: "Abnormal termination due to an exception".into(),
                detailed_description: Some("boom".into()),
            }),
        });
        assert_eq!(exit_status_for(&execution), 1);

        assert_eq!(exit_status_for(&anyhow::anyhow!("other")), EXIT_RUNNER_ERROR);
    }

    #[tokio::test]
    async fn test_run_suite_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let suite = write(
            dir.path(),
            "suite.json",
            r#"{
                "name": "CLI regression",
                "context": "fde87097-46bd-4916-b69f-48dbbec47936",
                "iut": {"identity": "pkg:generic/iut@1"},
                "recipes": [
                    {"id": "1", "test_case": {"id": "ok"}, "command": "exit 0"},
                    {"id": "2", "test_case": {"id": "bad"}, "command": "exit 1"}
                ]
            }"#,
        );
        let workdir = dir.path().join("work");
        let report = dir.path().join("report.json");
        let cli = Cli::try_parse_from([
            "etr",
            "run",
            "--suite",
            suite.to_str().unwrap(),
            "--workdir",
            workdir.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let status = cmd_run(args, RunnerConfig::default()).await.unwrap();
        assert_eq!(status, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(written["outcome"]["verdict"], "FAILED");
        assert_eq!(written["exit_codes"], serde_json::json!([0, 1]));
        assert!(workdir.join("events.jsonl").exists());
    }

    #[tokio::test]
    async fn test_run_missing_suite_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "etr",
            "run",
            "--suite",
            "/nonexistent/suite.json",
            "--workdir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let err = cmd_run(args, RunnerConfig::default()).await.unwrap_err();
        assert_eq!(exit_status_for(&err), EXIT_CONFIG_ERROR);
    }
}
