use thiserror::Error;

use super::code::ErrorCode;
use super::state::StateError;

/// Executor-specific errors for task graph construction and execution
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("no task runner configured")]
    NoTaskRunner,

    #[error("execution cancelled")]
    Cancelled,

    #[error("failed to load tasks from {path}: {reason}")]
    TasksFile { path: String, reason: String },

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ExecutorError {
    /// Map executor error to protocol error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateTaskId(_) => ErrorCode::ValidationError,
            Self::DependencyNotFound { .. } => ErrorCode::DependencyError,
            Self::CircularDependency(_) => ErrorCode::CircularDependency,
            Self::NoTaskRunner => ErrorCode::SchedulerConfig,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::TasksFile { .. } => ErrorCode::TaskNotFound,
            Self::State(_) => ErrorCode::StateError,
        }
    }
}
