use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Executes a single implementation task.
///
/// Implementations should return promptly once `cancel` fires; an error
/// returned after cancellation leaves the task pending rather than failed.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn name(&self) -> &str {
        "task-runner"
    }

    async fn run_task(
        &self,
        cancel: &CancellationToken,
        task_id: &str,
        spec_name: &str,
        tasks_path: &Path,
    ) -> anyhow::Result<()>;
}
