//! In-memory doubles for the agent, validator and task-runner seams.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentInvoker;
use crate::error::AgentError;
use crate::executor::TaskRunner;
use crate::workflow::{ValidationError, Validator};

#[derive(Debug, Clone)]
enum AgentBehavior {
    Succeed,
    Fail(String),
    TimeOut,
}

/// Agent that records every prompt it receives.
#[derive(Debug, Clone)]
pub struct FakeAgent {
    behavior: AgentBehavior,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgent {
    pub fn new() -> Self {
        Self {
            behavior: AgentBehavior::Succeed,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every invocation fails with `AgentError::Other(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            behavior: AgentBehavior::Fail(message.to_string()),
            ..Self::new()
        }
    }

    /// Every invocation fails with `AgentError::Timeout`.
    pub fn timing_out() -> Self {
        Self {
            behavior: AgentBehavior::TimeOut,
            ..Self::new()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AgentInvoker for FakeAgent {
    fn name(&self) -> &str {
        "fake"
    }

    async fn execute(&self, prompt: &str) -> Result<(), AgentError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        match &self.behavior {
            AgentBehavior::Succeed => Ok(()),
            AgentBehavior::Fail(message) => Err(AgentError::Other(message.clone())),
            AgentBehavior::TimeOut => {
                let timeout = Duration::from_millis(1);
                match tokio::time::timeout(timeout, std::future::pending::<()>()).await {
                    Ok(()) => Ok(()),
                    Err(source) => Err(AgentError::Timeout {
                        timeout,
                        command: self.format_command(prompt),
                        source,
                    }),
                }
            }
        }
    }

    fn format_command(&self, prompt: &str) -> String {
        format!("fake-agent {prompt}")
    }
}

/// Validator that fails a set number of times before passing.
#[derive(Debug, Clone)]
pub struct FakeValidator {
    failures_left: Arc<AtomicUsize>,
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FakeValidator {
    pub fn passing() -> Self {
        Self::fail_times(0, "")
    }

    pub fn always_failing(message: &str) -> Self {
        Self::fail_times(usize::MAX, message)
    }

    pub fn fail_times(times: usize, message: &str) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(times)),
            message: message.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Validator for FakeValidator {
    fn validate(&self, _artifact_dir: &Path) -> Result<(), ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(ValidationError::new(self.message.clone()))
        } else {
            Ok(())
        }
    }
}

/// Task runner that records invocations and tracks peak concurrency.
#[derive(Debug, Clone, Default)]
pub struct FakeTaskRunner {
    fail: HashSet<String>,
    cancel_after: HashSet<String>,
    delay: Option<Duration>,
    invoked: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks that return an error.
    pub fn fail_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fail.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Tasks that cancel the run right after finishing successfully.
    pub fn cancel_after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cancel_after.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Simulated work per task; cut short by cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Task ids in invocation order.
    pub fn invoked(&self) -> Vec<String> {
        self.invoked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskRunner for FakeTaskRunner {
    fn name(&self) -> &str {
        "fake"
    }

    async fn run_task(
        &self,
        cancel: &CancellationToken,
        task_id: &str,
        _spec_name: &str,
        _tasks_path: &Path,
    ) -> anyhow::Result<()> {
        self.invoked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(task_id.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let interrupted = match self.delay {
            Some(delay) => tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            },
            None => false,
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if interrupted {
            anyhow::bail!("task {task_id} interrupted");
        }
        if self.fail.contains(task_id) {
            anyhow::bail!("task {task_id} failed");
        }
        if self.cancel_after.contains(task_id) {
            cancel.cancel();
        }
        Ok(())
    }
}
