//! Parallel execution of implementation tasks.
//!
//! ```text
//! Vec<Task>
//!   ↓
//! TaskGraph::from_tasks() (validates) → waves()
//!   ↓
//! Vec<Vec<String>> (waves)
//!   ↓
//! ParallelExecutor::execute_waves() ──► ParallelStateStore (after every task)
//!   ↓
//! ExecutionReport
//! ```
//!
//! An interrupted run leaves its state on disk; [`ResumeController`] turns it
//! into a [`ResumePlan`] on the next start.

mod engine;
mod graph;
mod output;
mod progress;
mod resume;
mod scheduler;
mod state;
pub mod traits;
pub mod types;

pub use engine::ParallelExecutor;
pub use graph::TaskGraph;
pub use output::{render_report, render_wave_plan};
pub use progress::ProgressMonitor;
pub use resume::{ResumeController, ResumePlan, ResumeStrategy};
pub use scheduler::{execute_wave_parallel, TaskRun};
pub use state::{ParallelExecutionState, ParallelStateStore};
pub use traits::{ResumePrompter, TaskRunner};
pub use types::{
    ExecutionOpts, ExecutionReport, Task, TaskLike, TaskOutcome, TaskResult, TaskStatus, WavePlan,
    WaveResult, WaveStatus,
};
