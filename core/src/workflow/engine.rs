use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::stage::Stage;
use super::validation::{ValidationError, Validator};
use crate::agent::AgentInvoker;
use crate::error::{AgentError, StageError, StateError};
use crate::retry::{build_retry_command, RetryStore};

/// Result of a single invoke → validate attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Ok,
    ValidationFailed(ValidationError),
    ExecutionFailed(AgentError),
}

/// Terminal outcome of running one stage to success or exhaustion.
#[derive(Debug)]
pub enum StageOutcome {
    Succeeded {
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        retry_count: u32,
        last_error: ValidationError,
    },
    ExecutionFailed {
        attempts: u32,
        retry_count: u32,
        error: AgentError,
    },
}

/// Flat per-invocation summary of a [`StageOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub success: bool,
    pub attempts: u32,
    pub retry_count: u32,
    pub exhausted: bool,
    pub validation_errors: Vec<String>,
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts }
            | Self::Exhausted { attempts, .. }
            | Self::ExecutionFailed { attempts, .. } => *attempts,
        }
    }

    /// Retry counter after the run. A successful stage always resets it to 0.
    pub fn retry_count(&self) -> u32 {
        match self {
            Self::Succeeded { .. } => 0,
            Self::Exhausted { retry_count, .. } | Self::ExecutionFailed { retry_count, .. } => {
                *retry_count
            }
        }
    }

    pub fn summary(&self, stage: Stage) -> StageResult {
        StageResult {
            stage,
            success: self.is_success(),
            attempts: self.attempts(),
            retry_count: self.retry_count(),
            exhausted: matches!(self, Self::Exhausted { .. }),
            validation_errors: match self {
                Self::Exhausted { last_error, .. } => last_error.errors(),
                _ => Vec::new(),
            },
        }
    }

    /// Success becomes a [`StageResult`]; anything else becomes the matching [`StageError`].
    pub fn into_result(self, stage: Stage) -> Result<StageResult, StageError> {
        let summary = self.summary(stage);
        match self {
            Self::Succeeded { .. } => Ok(summary),
            Self::Exhausted {
                attempts,
                retry_count,
                last_error,
            } => Err(StageError::RetryExhausted {
                stage,
                attempts,
                count: retry_count,
                last: last_error,
            }),
            Self::ExecutionFailed {
                attempts, error, ..
            } => Err(StageError::Execution {
                stage,
                attempts,
                source: error,
            }),
        }
    }
}

/// Drives one stage through invoke → validate → retry-with-error-context.
///
/// Sequential by construction: a single agent invocation is in flight at a
/// time and the retry counter is read-modify-written between attempts.
pub struct StageExecutor {
    agent: Arc<dyn AgentInvoker>,
    retry_store: RetryStore,
    max_retries: u32,
}

impl StageExecutor {
    pub fn new(agent: Arc<dyn AgentInvoker>, retry_store: RetryStore, max_retries: u32) -> Self {
        Self {
            agent,
            retry_store,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_store(&self) -> &RetryStore {
        &self.retry_store
    }

    /// One invocation of the agent followed by validation.
    pub async fn attempt(
        &self,
        command: &str,
        artifact_dir: &Path,
        validator: &dyn Validator,
    ) -> AttemptOutcome {
        if let Err(e) = self.agent.execute(command).await {
            return AttemptOutcome::ExecutionFailed(e);
        }
        match validator.validate(artifact_dir) {
            Ok(()) => AttemptOutcome::Ok,
            Err(e) => AttemptOutcome::ValidationFailed(e),
        }
    }

    /// Run `stage` for `spec_name` until validation passes or retries run out.
    ///
    /// Process-level agent failures are not retried here: the counter is still
    /// bumped and persisted, then the failure is returned immediately. Only
    /// persistence failures surface as `Err`.
    pub async fn execute_stage(
        &self,
        spec_name: &str,
        stage: Stage,
        command: &str,
        artifact_dir: &Path,
        validator: &dyn Validator,
    ) -> Result<StageOutcome, StateError> {
        let start = Instant::now();
        let mut state = self.retry_store.load(spec_name, stage, self.max_retries)?;
        let mut current = command.to_string();
        let mut attempts = 0u32;

        info!(
            spec = spec_name,
            %stage,
            retry_count = state.count,
            max_retries = self.max_retries,
            "stage started"
        );

        loop {
            attempts += 1;
            debug!(
                %stage,
                attempt = attempts,
                command = %self.agent.format_command(&current),
                "invoking agent"
            );

            match self.attempt(&current, artifact_dir, validator).await {
                AttemptOutcome::Ok => {
                    self.retry_store.reset(&mut state)?;
                    info!(
                        %stage,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "stage succeeded"
                    );
                    return Ok(StageOutcome::Succeeded { attempts });
                }
                AttemptOutcome::ExecutionFailed(error) => {
                    let retry_count = self.retry_store.increment(&mut state)?;
                    warn!(%stage, attempts, retry_count, error = %error, "agent execution failed");
                    return Ok(StageOutcome::ExecutionFailed {
                        attempts,
                        retry_count,
                        error,
                    });
                }
                AttemptOutcome::ValidationFailed(last_error) => {
                    let errors = last_error.errors();
                    if !state.can_retry() {
                        self.retry_store.save(&state)?;
                        warn!(
                            %stage,
                            attempts,
                            retry_count = state.count,
                            errors = errors.len(),
                            "validation failed, retries exhausted"
                        );
                        return Ok(StageOutcome::Exhausted {
                            attempts,
                            retry_count: state.count,
                            last_error,
                        });
                    }

                    let retry_count = self.retry_store.increment(&mut state)?;
                    warn!(
                        %stage,
                        attempts,
                        retry = retry_count,
                        max_retries = self.max_retries,
                        errors = errors.len(),
                        "validation failed, retrying"
                    );
                    current = build_retry_command(command, retry_count, self.max_retries, &errors);
                }
            }
        }
    }
}
