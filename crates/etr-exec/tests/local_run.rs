//! Full suite runs with the local collaborators.

use std::sync::Arc;

use etr_core::{
    Collaborators, Conclusion, LifecycleError, LogArea, PluginSet, RunnerConfig, SuiteDefinition,
    TestRunner, Verdict, VerdictMatcher,
};
use etr_exec::{
    CommandIutMonitoring, FsWorkspaceProvider, JsonlEventBus, LocalLogArea, ProcessExecutor,
    TracingPlugin,
};

fn suite(commands: &[(&str, &str)]) -> SuiteDefinition {
    let recipes: Vec<serde_json::Value> = commands
        .iter()
        .enumerate()
        .map(|(i, (name, command))| {
            serde_json::json!({
                "id": format!("recipe-{i}"),
                "test_case": {"id": name},
                "command": command,
            })
        })
        .collect();
    let json = serde_json::json!({
        "name": "Local regression",
        "context": "fde87097-46bd-4916-b69f-48dbbec47936",
        "iut": {"identity": "pkg:generic/local-iut@1.0"},
        "recipes": recipes,
        "monitoring": ["sleep 30"],
    });
    SuiteDefinition::from_json_str(&json.to_string()).unwrap()
}

struct Local {
    _dir: tempfile::TempDir,
    events_path: std::path::PathBuf,
    logs: Arc<LocalLogArea>,
    runner: TestRunner,
}

async fn local(suite: SuiteDefinition) -> Local {
    let dir = tempfile::tempdir().unwrap();
    let logs = Arc::new(LocalLogArea::new(dir.path().join("logs")));
    let events_path = dir.path().join("events.jsonl");
    let events = Arc::new(JsonlEventBus::to_file(&events_path).await.unwrap());

    let collaborators = Collaborators {
        executor: Arc::new(ProcessExecutor::new(logs.clone())),
        workspaces: Arc::new(FsWorkspaceProvider::new(dir.path().join("ws"), logs.clone())),
        log_area: logs.clone(),
        monitoring: Box::new(CommandIutMonitoring::new(suite.monitoring.clone())),
        events,
        plugins: PluginSet::new(vec![Arc::new(TracingPlugin)]),
    };
    let runner = TestRunner::new(
        suite,
        RunnerConfig::default().with_hostname("local-host"),
        VerdictMatcher::default(),
        collaborators,
    );
    Local {
        _dir: dir,
        events_path,
        logs,
        runner,
    }
}

fn event_types(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["meta"]["type"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_passing_suite() {
    let mut local = local(suite(&[("first", "echo one"), ("second", "exit 0")])).await;
    let report = local.runner.execute().await.unwrap();

    assert_eq!(report.exit_codes, vec![Some(0), Some(0)]);
    assert_eq!(report.outcome.verdict, Verdict::Passed);
    assert_eq!(report.exit_status(), 0);

    let names: Vec<_> = report.persistent_logs.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["first_test_output.log", "second_test_output.log"]
    );
    assert_eq!(local.logs.persistent_logs().len(), 2);

    // Draining guarantees every event is on disk when execute returns.
    assert_eq!(
        event_types(&local.events_path),
        vec!["TestSuiteStarted", "EnvironmentDefined", "TestSuiteFinished"]
    );
}

#[tokio::test]
async fn test_failing_and_killed_recipes() {
    let mut local = local(suite(&[
        ("passes", "exit 0"),
        ("fails", "exit 2"),
        ("killed", "kill -9 $$"),
    ]))
    .await;
    let report = local.runner.execute().await.unwrap();

    assert_eq!(report.exit_codes, vec![Some(0), Some(2), None]);
    // "some gte 1" is declared before "some eq null".
    assert_eq!(report.outcome.verdict, Verdict::Failed);
    assert_eq!(report.outcome.conclusion, Conclusion::Successful);
}

#[tokio::test]
async fn test_checkout_failure_aborts_suite() {
    let mut definition = suite(&[("first", "exit 0"), ("second", "exit 0")]);
    definition.recipes[0].checkout.push("exit 5".into());
    let mut local = local(definition).await;
    let err = local.runner.execute().await.unwrap_err();

    match err {
        LifecycleError::Execution {
            test_name, outcome, ..
        } => {
            assert_eq!(test_name.as_deref(), Some("first"));
            assert_eq!(outcome.conclusion, Conclusion::Inconclusive);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let types = event_types(&local.events_path);
    assert_eq!(types.last().map(String::as_str), Some("TestSuiteFinished"));
}
