use std::sync::Arc;

use pretty_assertions::assert_eq;
use specflow_core::error::StageError;
use specflow_core::retry::RetryStore;
use specflow_core::testing::{FakeAgent, FakeValidator};
use specflow_core::workflow::{Stage, StageExecutor, StageOutcome, Validator, WorkflowOrchestrator};
use tempfile::TempDir;

fn executor(agent: &Arc<FakeAgent>, state_dir: &TempDir, max_retries: u32) -> StageExecutor {
    StageExecutor::new(agent.clone(), RetryStore::new(state_dir.path()), max_retries)
}

#[tokio::test]
async fn retry_prompt_carries_validation_errors() {
    let state = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let agent = Arc::new(FakeAgent::new());
    let validator = FakeValidator::fail_times(
        2,
        "plan.yaml invalid:\n- missing field: summary\n- invalid enum value at phase",
    );

    let outcome = executor(&agent, &state, 3)
        .execute_stage("demo", Stage::Plan, "/specflow.plan", work.path(), &validator)
        .await
        .unwrap();

    assert!(matches!(outcome, StageOutcome::Succeeded { attempts: 3 }));
    let prompts = agent.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], "/specflow.plan");
    assert!(prompts[1].starts_with("/specflow.plan\n\n"));
    assert!(prompts[1].contains("RETRY 1/3"), "{}", prompts[1]);
    assert!(prompts[2].contains("RETRY 2/3"), "{}", prompts[2]);
    assert!(prompts[1].contains("missing field: summary"));
    assert!(prompts[1].contains("invalid enum value at phase"));

    let stored = RetryStore::new(state.path()).load("demo", Stage::Plan, 3).unwrap();
    assert_eq!(stored.count, 0);
}

#[tokio::test]
async fn retry_count_survives_restart() {
    let state = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let agent = Arc::new(FakeAgent::new());
    let outcome = executor(&agent, &state, 2)
        .execute_stage(
            "demo",
            Stage::Tasks,
            "/specflow.tasks",
            work.path(),
            &FakeValidator::always_failing("- missing field: tasks"),
        )
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        StageOutcome::Exhausted {
            attempts: 3,
            retry_count: 2,
            ..
        }
    ));

    // A new process sees the exhausted counter and does not retry again.
    let agent = Arc::new(FakeAgent::new());
    let validator = FakeValidator::always_failing("- missing field: tasks");
    let outcome = executor(&agent, &state, 2)
        .execute_stage("demo", Stage::Tasks, "/specflow.tasks", work.path(), &validator)
        .await
        .unwrap();
    assert_eq!(agent.call_count(), 1);
    assert_eq!(outcome.retry_count(), 2);

    let err = outcome.into_result(Stage::Tasks).unwrap_err();
    assert!(matches!(
        err,
        StageError::RetryExhausted {
            attempts: 1,
            count: 2,
            ..
        }
    ));
    assert!(
        err.to_string()
            .starts_with("tasks exhausted 2 retries after 1 attempt(s)"),
        "{err}"
    );
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let state = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let agent = Arc::new(FakeAgent::new());
    let validator = FakeValidator::always_failing("- wrong type");

    let outcome = executor(&agent, &state, 0)
        .execute_stage("demo", Stage::Plan, "/specflow.plan", work.path(), &validator)
        .await
        .unwrap();

    assert_eq!(agent.call_count(), 1);
    assert!(matches!(outcome, StageOutcome::Exhausted { attempts: 1, retry_count: 0, .. }));
}

#[tokio::test]
async fn agent_timeout_is_reported_as_timeout() {
    let state = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let agent = Arc::new(FakeAgent::timing_out());

    let outcome = executor(&agent, &state, 3)
        .execute_stage(
            "demo",
            Stage::Specify,
            "/specflow.specify",
            work.path(),
            &FakeValidator::passing(),
        )
        .await
        .unwrap();

    let err = outcome.into_result(Stage::Specify).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(agent.call_count(), 1);
}

#[tokio::test]
async fn pipeline_stops_at_missing_prerequisites() {
    let state = TempDir::new().unwrap();
    let specs = TempDir::new().unwrap();
    let agent = Arc::new(FakeAgent::new());
    let orchestrator = WorkflowOrchestrator::new(
        executor(&agent, &state, 1),
        Arc::new(|_stage: Stage| -> Arc<dyn Validator> { Arc::new(FakeValidator::passing()) }),
        specs.path(),
    );

    let err = orchestrator
        .run_stages("demo", &[Stage::Plan, Stage::Tasks], "")
        .await
        .unwrap_err();

    match err {
        StageError::MissingPrerequisites { stage, missing } => {
            assert_eq!(stage, Stage::Plan);
            assert_eq!(missing, vec!["spec.yaml".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(agent.call_count(), 0);
}
