use std::time::Duration;

use thiserror::Error;

use super::code::ErrorCode;
use super::state::StateError;
use crate::workflow::{Stage, ValidationError};

/// Failures raised while invoking the external agent process.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent timed out after {}s: {command}", timeout.as_secs())]
    Timeout {
        timeout: Duration,
        command: String,
        #[source]
        source: tokio::time::error::Elapsed,
    },

    #[error("failed to spawn agent '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent exited with code {code}: {command}")]
    ExitStatus { code: i32, command: String },

    #[error("agent error: {0}")]
    Other(String),
}

impl AgentError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Terminal outcomes of a single stage run, as surfaced to callers.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{stage} failed after {attempts} attempt(s): {source}")]
    Execution {
        stage: Stage,
        attempts: u32,
        #[source]
        source: AgentError,
    },

    #[error("{stage} exhausted {count} retries after {attempts} attempt(s): {last}")]
    RetryExhausted {
        stage: Stage,
        attempts: u32,
        count: u32,
        #[source]
        last: ValidationError,
    },

    #[error("{stage} is missing prerequisite artifacts: {}", missing.join(", "))]
    MissingPrerequisites { stage: Stage, missing: Vec<String> },

    #[error("retry state error: {0}")]
    State(#[from] StateError),
}

impl StageError {
    /// True when the underlying agent invocation exceeded its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Execution { source, .. } if source.is_timeout())
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Execution { source, .. } if source.is_timeout() => ErrorCode::Timeout,
            Self::Execution { .. } => ErrorCode::AgentError,
            Self::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            Self::MissingPrerequisites { .. } => ErrorCode::MissingPrerequisites,
            Self::State(_) => ErrorCode::StateError,
        }
    }
}
