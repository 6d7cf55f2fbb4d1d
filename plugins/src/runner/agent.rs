use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use specflow_core::agent::AgentInvoker;
use specflow_core::executor::TaskRunner;
use specflow_core::workflow::Stage;

/// Prompt asking the agent to implement a single task.
pub fn implement_prompt(task_id: &str, spec_name: &str, tasks_path: &Path) -> String {
    format!(
        "{} --spec {} --task {} --tasks-file {}",
        Stage::Implement.slash_command(),
        spec_name,
        task_id,
        tasks_path.display()
    )
}

/// Runs each implementation task as its own agent session.
pub struct AgentTaskRunner {
    agent: Arc<dyn AgentInvoker>,
}

impl AgentTaskRunner {
    pub fn new(agent: Arc<dyn AgentInvoker>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl TaskRunner for AgentTaskRunner {
    fn name(&self) -> &str {
        "agent"
    }

    async fn run_task(
        &self,
        cancel: &CancellationToken,
        task_id: &str,
        spec_name: &str,
        tasks_path: &Path,
    ) -> Result<()> {
        let prompt = implement_prompt(task_id, spec_name, tasks_path);
        tracing::debug!(task_id, command = %self.agent.format_command(&prompt), "running task");

        tokio::select! {
            biased;
            // Dropping the agent future kills its child process.
            _ = cancel.cancelled() => bail!("task {task_id} cancelled"),
            res = self.agent.execute(&prompt) => {
                res.with_context(|| format!("task {task_id} failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use specflow_core::testing::FakeAgent;

    #[tokio::test]
    async fn sends_implement_prompt() {
        let agent = Arc::new(FakeAgent::new());
        let runner = AgentTaskRunner::new(agent.clone());
        runner
            .run_task(
                &CancellationToken::new(),
                "T007",
                "auth",
                Path::new("specs/auth/tasks.yaml"),
            )
            .await
            .unwrap();
        assert_eq!(
            agent.prompts(),
            vec!["/specflow.implement --spec auth --task T007 --tasks-file specs/auth/tasks.yaml"
                .to_string()]
        );
    }

    #[tokio::test]
    async fn agent_failure_names_task() {
        let runner = AgentTaskRunner::new(Arc::new(FakeAgent::failing("boom")));
        let err = runner
            .run_task(&CancellationToken::new(), "T1", "s", Path::new("t.yaml"))
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("task T1 failed"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let agent = Arc::new(FakeAgent::timing_out());
        let runner = AgentTaskRunner::new(agent);
        let err = runner
            .run_task(&cancel, "T1", "s", Path::new("t.yaml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
