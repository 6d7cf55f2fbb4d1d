use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failure { error: String },
    Skipped { reason: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result of executing a single task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
    #[serde(default)]
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn success(task_id: &str, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.to_string(),
            outcome: TaskOutcome::Success,
            duration_ms,
        }
    }

    pub fn failure(task_id: &str, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.to_string(),
            outcome: TaskOutcome::Failure {
                error: error.into(),
            },
            duration_ms,
        }
    }

    pub fn skipped(task_id: &str, reason: impl Into<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            outcome: TaskOutcome::Skipped {
                reason: reason.into(),
            },
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    Completed,
    PartialFailed,
}

/// Outcome of one wave; `wave_number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveResult {
    pub wave_number: usize,
    pub status: WaveStatus,
    pub results: Vec<TaskResult>,
}

impl WaveResult {
    /// Build from task results in wave order; any failure makes the wave partial.
    pub fn from_results(wave_number: usize, results: Vec<TaskResult>) -> Self {
        let status = if results.iter().any(|r| r.outcome.is_failure()) {
            WaveStatus::PartialFailed
        } else {
            WaveStatus::Completed
        };
        Self {
            wave_number,
            status,
            results,
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.task_id == task_id)
    }

    pub fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Wave layout produced without executing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavePlan {
    pub waves: Vec<Vec<String>>,
    pub titles: BTreeMap<String, String>,
    pub total_tasks: usize,
    pub max_parallel: usize,
}

/// Result of executing a task graph
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub spec_name: String,

    /// Total number of tasks in the graph
    pub total_tasks: usize,

    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Total execution duration in milliseconds
    pub duration_ms: u64,

    pub waves: Vec<WaveResult>,

    /// Skipped task -> reason naming the failed ancestor
    pub skip_reasons: BTreeMap<String, String>,
}

impl ExecutionReport {
    pub fn from_waves(
        spec_name: &str,
        total_tasks: usize,
        waves: Vec<WaveResult>,
        duration_ms: u64,
    ) -> Self {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut skip_reasons = BTreeMap::new();
        for result in waves.iter().flat_map(|w| w.results.iter()) {
            match &result.outcome {
                TaskOutcome::Success => completed += 1,
                TaskOutcome::Failure { .. } => failed += 1,
                TaskOutcome::Skipped { reason } => {
                    skipped += 1;
                    skip_reasons.insert(result.task_id.clone(), reason.clone());
                }
            }
        }
        Self {
            spec_name: spec_name.to_string(),
            total_tasks,
            completed,
            failed,
            skipped,
            duration_ms,
            waves,
            skip_reasons,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn outcome(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.waves
            .iter()
            .find_map(|w| w.get(task_id))
            .map(|r| &r.outcome)
    }
}
