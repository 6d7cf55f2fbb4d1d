use crate::executor::resume::ResumeStrategy;
use crate::executor::state::ParallelExecutionState;

/// Chooses how an interrupted run continues.
pub trait ResumePrompter: Send + Sync {
    fn choose(&self, state: &ParallelExecutionState) -> ResumeStrategy;
}

/// A fixed strategy, e.g. one given on the command line.
impl ResumePrompter for ResumeStrategy {
    fn choose(&self, _state: &ParallelExecutionState) -> ResumeStrategy {
        *self
    }
}
