use std::path::Path;
use std::sync::Arc;

use specflow_core::agent::AgentInvoker;
use specflow_core::config::AppConfig;
use specflow_core::executor::{
    ExecutionOpts, ParallelExecutor, ParallelStateStore, ResumeController, TaskRunner,
};
use specflow_core::retry::RetryStore;
use specflow_core::workflow::{StageExecutor, ValidatorProvider, WorkflowOrchestrator};

use crate::agent::SubprocessAgent;
use crate::runner::AgentTaskRunner;
use crate::validation::ArtifactValidators;

pub fn build_agent(cfg: &AppConfig) -> Arc<dyn AgentInvoker> {
    Arc::new(SubprocessAgent::from_config(&cfg.agent))
}

pub fn build_task_runner(agent: Arc<dyn AgentInvoker>) -> Arc<dyn TaskRunner> {
    Arc::new(AgentTaskRunner::new(agent))
}

pub fn build_validators() -> Arc<dyn ValidatorProvider> {
    Arc::new(ArtifactValidators)
}

pub fn build_orchestrator(
    cfg: &AppConfig,
    agent: Arc<dyn AgentInvoker>,
    state_dir: &Path,
) -> WorkflowOrchestrator {
    let executor = StageExecutor::new(agent, RetryStore::new(state_dir), cfg.workflow.max_retries);
    WorkflowOrchestrator::new(executor, build_validators(), &cfg.workflow.specs_dir)
        .skip_preflight(cfg.workflow.skip_preflight)
}

pub fn build_parallel_executor(
    opts: ExecutionOpts,
    runner: Arc<dyn TaskRunner>,
    state_dir: &Path,
) -> ParallelExecutor {
    ParallelExecutor::new(opts)
        .runner(runner)
        .state_store(ParallelStateStore::new(state_dir))
}

pub fn build_resume_controller(state_dir: &Path) -> ResumeController {
    ResumeController::new(ParallelStateStore::new(state_dir))
}
