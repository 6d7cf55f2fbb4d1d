use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::{ExecutorError, StateError};

use super::graph::TaskGraph;
use super::progress::ProgressMonitor;
use super::scheduler::{execute_wave_parallel, TaskRun};
use super::state::{ParallelExecutionState, ParallelStateStore};
use super::traits::TaskRunner;
use super::types::{
    ExecutionOpts, ExecutionReport, Task, TaskOutcome, TaskResult, TaskStatus, WavePlan,
    WaveResult,
};

/// Runs a task graph wave by wave with bounded concurrency.
///
/// Tasks inside a wave run in parallel. A failed task never stops its
/// siblings; its dependents in later waves are skipped instead. Progress is
/// written to the state store after every task and every wave.
pub struct ParallelExecutor {
    opts: ExecutionOpts,
    runner: Option<Arc<dyn TaskRunner>>,
    store: Option<ParallelStateStore>,
}

impl ParallelExecutor {
    pub fn new(opts: ExecutionOpts) -> Self {
        Self {
            opts,
            runner: None,
            store: None,
        }
    }

    pub fn runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn state_store(mut self, store: ParallelStateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    /// Compute the wave layout without running anything.
    pub fn plan(&self, tasks: &[Task]) -> Result<WavePlan, ExecutorError> {
        let graph = TaskGraph::from_tasks(tasks)?;
        let waves = graph.waves()?;
        Ok(WavePlan {
            waves,
            titles: tasks
                .iter()
                .map(|t| (t.id.clone(), t.title.clone()))
                .collect(),
            total_tasks: tasks.len(),
            max_parallel: self.opts.max_parallel.max(1),
        })
    }

    /// Fresh state whose statuses come from the tasks file.
    pub fn initial_state(spec_name: &str, tasks: &[Task], total_waves: usize) -> ParallelExecutionState {
        let mut state = ParallelExecutionState::new(spec_name, total_waves);
        for task in tasks {
            let status = if task.status.is_done() {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            };
            state.set_status(&task.id, status);
        }
        state
    }

    /// Run every task from scratch.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        spec_name: &str,
        tasks_path: &Path,
        tasks: &[Task],
    ) -> Result<ExecutionReport, ExecutorError> {
        let graph = TaskGraph::from_tasks(tasks)?;
        let waves = graph.waves()?;
        let state = Self::initial_state(spec_name, tasks, waves.len());
        self.run(cancel, tasks_path, &graph, &waves, state).await
    }

    /// Continue from persisted state. Statuses in `state` win over the tasks file.
    pub async fn resume(
        &self,
        cancel: &CancellationToken,
        tasks_path: &Path,
        tasks: &[Task],
        mut state: ParallelExecutionState,
    ) -> Result<ExecutionReport, ExecutorError> {
        let graph = TaskGraph::from_tasks(tasks)?;
        let waves = graph.waves()?;

        for task in tasks {
            if !state.task_statuses.contains_key(&task.id) {
                let status = if task.status.is_done() {
                    TaskStatus::Completed
                } else {
                    TaskStatus::Pending
                };
                state.set_status(&task.id, status);
            }
        }
        state.total_waves = waves.len();

        self.run(cancel, tasks_path, &graph, &waves, state).await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        tasks_path: &Path,
        graph: &TaskGraph<Task>,
        waves: &[Vec<String>],
        mut state: ParallelExecutionState,
    ) -> Result<ExecutionReport, ExecutorError> {
        let start = Instant::now();

        tracing::info!(
            spec = %state.spec_name,
            tasks = graph.len(),
            waves = waves.len(),
            max_parallel = self.opts.max_parallel,
            "parallel execution started"
        );

        let results = self
            .execute_waves(cancel, tasks_path, graph, waves, &mut state)
            .await?;

        let report = ExecutionReport::from_waves(
            &state.spec_name,
            graph.len(),
            results,
            start.elapsed().as_millis() as u64,
        );

        tracing::info!(
            spec = %report.spec_name,
            completed = report.completed,
            failed = report.failed,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "parallel execution finished"
        );

        Ok(report)
    }

    /// Execute `waves` in order against `state`.
    ///
    /// Waves whose tasks all reached a final status and already have a
    /// recorded result are reused as-is. Completed tasks are never
    /// re-invoked. Cancellation before a wave returns without touching it;
    /// cancellation during a wave lets in-flight tasks finish, leaves
    /// unstarted ones pending, marks the state interrupted and returns
    /// [`ExecutorError::Cancelled`].
    pub async fn execute_waves(
        &self,
        cancel: &CancellationToken,
        tasks_path: &Path,
        graph: &TaskGraph<Task>,
        waves: &[Vec<String>],
        state: &mut ParallelExecutionState,
    ) -> Result<Vec<WaveResult>, ExecutorError> {
        if waves.is_empty() {
            return Ok(Vec::new());
        }

        let total_waves = waves.len();
        let mut monitor = ProgressMonitor::new(graph.len(), self.opts.progress_bar);
        let mut results = Vec::with_capacity(total_waves);

        // failed or skipped task -> the failed task ultimately responsible
        let mut blame: HashMap<String, String> = HashMap::new();
        for (id, status) in &state.task_statuses {
            if status.blocks_dependents() {
                blame.insert(id.clone(), id.clone());
            }
        }

        for (idx, wave) in waves.iter().enumerate() {
            let wave_number = idx + 1;

            let settled = wave.iter().all(|id| {
                let status = state.status(id);
                status.is_done() || status.blocks_dependents()
            });
            if settled {
                if let Some(previous) = state.wave_result(wave_number) {
                    monitor.advance(wave.len());
                    results.push(previous.clone());
                    continue;
                }
            }

            if cancel.is_cancelled() {
                tracing::warn!(wave = wave_number, "cancelled before wave start");
                state.interrupted = true;
                self.persist(state)?;
                return Err(ExecutorError::Cancelled);
            }

            state.current_wave = wave_number;
            monitor.update_wave(wave_number, total_waves);
            tracing::info!(wave = wave_number, total_waves, tasks = wave.len(), "wave started");

            let mut outcomes: BTreeMap<String, TaskResult> = BTreeMap::new();
            let mut runnable: Vec<String> = Vec::new();

            for task_id in wave {
                match state.status(task_id) {
                    TaskStatus::Completed => {
                        monitor.advance(1);
                        outcomes.insert(task_id.clone(), TaskResult::success(task_id, 0));
                        continue;
                    }
                    TaskStatus::Failed => {
                        let error = state.task_errors.get(task_id).cloned().unwrap_or_default();
                        monitor.advance(1);
                        outcomes.insert(task_id.clone(), TaskResult::failure(task_id, error, 0));
                        continue;
                    }
                    TaskStatus::Skipped => {
                        let reason = state.skip_reasons.get(task_id).cloned().unwrap_or_default();
                        monitor.advance(1);
                        outcomes.insert(task_id.clone(), TaskResult::skipped(task_id, reason));
                        continue;
                    }
                    _ => {}
                }

                let blocked_by = graph
                    .dependencies_of(task_id)
                    .iter()
                    .find(|dep| blame.contains_key(dep.as_str()));
                if let Some(dep) = blocked_by {
                    let root = blame.get(dep).cloned().unwrap_or_else(|| dep.clone());
                    let reason = if state.status(dep) == TaskStatus::Failed {
                        format!("dependency {dep} failed")
                    } else if root == *dep {
                        format!("dependency {dep} was skipped")
                    } else {
                        format!("dependency {dep} was skipped (failed ancestor: {root})")
                    };
                    tracing::info!(task_id = %task_id, %reason, "task skipped");
                    state.mark_skipped(task_id, &reason);
                    blame.insert(task_id.clone(), root);
                    let result = TaskResult::skipped(task_id, reason);
                    monitor.complete_task(task_id, &result.outcome, 0);
                    outcomes.insert(task_id.clone(), result);
                    continue;
                }

                state.set_status(task_id, TaskStatus::InProgress);
                monitor.add_task(task_id);
                runnable.push(task_id.clone());
            }
            self.persist(state)?;

            let runner = self.runner.clone();
            let spec_name = state.spec_name.clone();
            let executor_fn = |task_id: String| {
                let runner = runner.clone();
                let spec_name = spec_name.clone();
                let cancel = cancel.clone();
                async move {
                    match runner {
                        Some(runner) => runner
                            .run_task(&cancel, &task_id, &spec_name, tasks_path)
                            .await
                            .map_err(|e| format!("{e:#}")),
                        None => Err(ExecutorError::NoTaskRunner.to_string()),
                    }
                }
            };

            let mut persist_err: Option<StateError> = None;
            let store = self.store.as_ref();
            let on_complete = |run: &TaskRun| {
                let result = match &run.result {
                    None => {
                        state.set_status(&run.task_id, TaskStatus::Pending);
                        monitor.abandon_task(&run.task_id);
                        return;
                    }
                    Some(Err(error)) if cancel.is_cancelled() => {
                        tracing::warn!(task_id = %run.task_id, %error, "task interrupted");
                        state.set_status(&run.task_id, TaskStatus::Pending);
                        monitor.abandon_task(&run.task_id);
                        return;
                    }
                    Some(Ok(())) => {
                        tracing::info!(task_id = %run.task_id, duration_ms = run.duration_ms, "task completed");
                        state.mark_completed(&run.task_id);
                        TaskResult::success(&run.task_id, run.duration_ms)
                    }
                    Some(Err(error)) => {
                        tracing::warn!(task_id = %run.task_id, %error, "task failed");
                        state.mark_failed(&run.task_id, error);
                        blame.insert(run.task_id.clone(), run.task_id.clone());
                        TaskResult::failure(&run.task_id, error.clone(), run.duration_ms)
                    }
                };
                monitor.complete_task(&run.task_id, &result.outcome, run.duration_ms);
                outcomes.insert(run.task_id.clone(), result);

                if let Some(store) = store {
                    if let Err(e) = store.save(state) {
                        persist_err.get_or_insert(e);
                    }
                }
            };

            execute_wave_parallel(
                &runnable,
                self.opts.max_parallel,
                cancel,
                executor_fn,
                on_complete,
            )
            .await;

            if let Some(e) = persist_err {
                return Err(e.into());
            }

            if cancel.is_cancelled() {
                tracing::warn!(wave = wave_number, "execution cancelled during wave");
                state.interrupted = true;
                self.persist(state)?;
                return Err(ExecutorError::Cancelled);
            }

            let ordered: Vec<TaskResult> = wave
                .iter()
                .filter_map(|id| outcomes.remove(id))
                .collect();
            let wave_result = WaveResult::from_results(wave_number, ordered);

            tracing::info!(
                wave = wave_number,
                succeeded = wave_result.count(TaskOutcome::is_success),
                failed = wave_result.count(TaskOutcome::is_failure),
                skipped = wave_result.count(TaskOutcome::is_skipped),
                "wave finished"
            );

            state.record_wave(wave_result.clone());
            self.persist(state)?;
            results.push(wave_result);
        }

        state.finish();
        self.persist(state)?;
        monitor.finish(state.is_complete());

        Ok(results)
    }

    fn persist(&self, state: &ParallelExecutionState) -> Result<(), StateError> {
        match &self.store {
            Some(store) => store.save(state),
            None => Ok(()),
        }
    }
}
