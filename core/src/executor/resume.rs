use std::fmt;
use std::str::FromStr;

use chrono::Utc;

use crate::error::StateError;

use super::state::{ParallelExecutionState, ParallelStateStore};
use super::traits::ResumePrompter;
use super::types::{TaskResult, TaskStatus, WaveResult};

/// How to continue after finding an unfinished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStrategy {
    /// Re-run from the first wave with unfinished work; completed tasks stay done.
    Retry,
    /// Mark the interrupted wave's unfinished tasks skipped and move on.
    SkipWave,
    /// Discard saved state and start over.
    Reset,
    /// Leave everything as it is and stop.
    Abort,
}

impl ResumeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::SkipWave => "skip-wave",
            Self::Reset => "reset",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for ResumeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "retry" => Ok(Self::Retry),
            "s" | "skip" | "skip-wave" | "skip_wave" => Ok(Self::SkipWave),
            "reset" | "fresh" => Ok(Self::Reset),
            "a" | "q" | "abort" | "quit" => Ok(Self::Abort),
            other => Err(format!(
                "unknown resume strategy '{other}' (expected retry, skip-wave, reset or abort)"
            )),
        }
    }
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePlan {
    Resume(ParallelExecutionState),
    Fresh,
    Abort,
}

/// Decides how a parallel run picks up after an interruption.
#[derive(Debug, Clone)]
pub struct ResumeController {
    store: ParallelStateStore,
}

impl ResumeController {
    pub fn new(store: ParallelStateStore) -> Self {
        Self { store }
    }

    /// Saved state for `spec_name`, but only when it warrants a prompt.
    pub fn inspect(&self, spec_name: &str) -> Result<Option<ParallelExecutionState>, StateError> {
        Ok(self
            .store
            .load(spec_name)?
            .filter(ParallelExecutionState::needs_resume))
    }

    /// Inspect, ask `prompter` when there is something to resume, then apply.
    pub fn resolve(
        &self,
        spec_name: &str,
        waves: &[Vec<String>],
        prompter: &dyn ResumePrompter,
    ) -> Result<ResumePlan, StateError> {
        match self.inspect(spec_name)? {
            None => Ok(ResumePlan::Fresh),
            Some(state) => {
                let strategy = prompter.choose(&state);
                tracing::info!(spec = spec_name, strategy = %strategy, "resuming parallel run");
                self.apply(strategy, state, waves)
            }
        }
    }

    /// Apply `strategy` to `state`; `waves` is the current wave layout.
    pub fn apply(
        &self,
        strategy: ResumeStrategy,
        mut state: ParallelExecutionState,
        waves: &[Vec<String>],
    ) -> Result<ResumePlan, StateError> {
        match strategy {
            ResumeStrategy::Abort => Ok(ResumePlan::Abort),
            ResumeStrategy::Reset => {
                self.store.delete(&state.spec_name)?;
                Ok(ResumePlan::Fresh)
            }
            ResumeStrategy::Retry => {
                let from = first_unfinished_wave(&state, waves);
                for wave in waves.iter().skip(from.saturating_sub(1)) {
                    for task_id in wave {
                        if !state.status(task_id).is_done() {
                            state.reset_task(task_id);
                        }
                    }
                }
                state.wave_results.retain(|w| w.wave_number < from);
                state.current_wave = from.saturating_sub(1);
                state.interrupted = false;
                state.completed_at = None;
                self.store.save(&state)?;
                Ok(ResumePlan::Resume(state))
            }
            ResumeStrategy::SkipWave => {
                let wave_number = state.current_wave.max(1);
                if let Some(wave) = waves.get(wave_number - 1) {
                    let reason = format!("skipped on resume (wave {wave_number})");
                    let mut results = Vec::with_capacity(wave.len());
                    for task_id in wave {
                        match state.status(task_id) {
                            TaskStatus::Completed => results.push(TaskResult::success(task_id, 0)),
                            TaskStatus::Failed => {
                                let error = state
                                    .task_errors
                                    .get(task_id)
                                    .cloned()
                                    .unwrap_or_default();
                                results.push(TaskResult::failure(task_id, error, 0));
                            }
                            TaskStatus::Skipped => {
                                let earlier = state
                                    .skip_reasons
                                    .get(task_id)
                                    .cloned()
                                    .unwrap_or_else(|| reason.clone());
                                results.push(TaskResult::skipped(task_id, earlier));
                            }
                            _ => {
                                state.mark_skipped(task_id, &reason);
                                results.push(TaskResult::skipped(task_id, reason.clone()));
                            }
                        }
                    }
                    state.record_wave(WaveResult::from_results(wave_number, results));
                }
                state.current_wave = wave_number + 1;
                state.interrupted = false;
                // Skipping the last wave accepts the run as it stands.
                if wave_number >= waves.len() {
                    state.completed_at = Some(Utc::now());
                }
                self.store.save(&state)?;
                Ok(ResumePlan::Resume(state))
            }
        }
    }
}

/// 1-based number of the first wave holding a task that is not completed.
/// Returns `waves.len() + 1` when everything is done.
fn first_unfinished_wave(state: &ParallelExecutionState, waves: &[Vec<String>]) -> usize {
    waves
        .iter()
        .position(|wave| wave.iter().any(|id| !state.status(id).is_done()))
        .map(|i| i + 1)
        .unwrap_or(waves.len() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::TaskOutcome;
    use tempfile::TempDir;

    fn waves() -> Vec<Vec<String>> {
        vec![
            vec!["T1".into(), "T2".into()],
            vec!["T3".into(), "T4".into()],
            vec!["T5".into()],
        ]
    }

    fn interrupted_in_wave_two() -> ParallelExecutionState {
        let mut state = ParallelExecutionState::new("demo", 3);
        state.mark_completed("T1");
        state.mark_completed("T2");
        state.record_wave(WaveResult::from_results(
            1,
            vec![TaskResult::success("T1", 1), TaskResult::success("T2", 1)],
        ));
        state.mark_completed("T3");
        state.current_wave = 2;
        state.interrupted = true;
        state
    }

    fn controller(tmp: &TempDir) -> (ResumeController, ParallelStateStore) {
        let store = ParallelStateStore::new(tmp.path());
        (ResumeController::new(store.clone()), store)
    }

    #[test]
    fn parses_strategies() {
        assert_eq!("retry".parse(), Ok(ResumeStrategy::Retry));
        assert_eq!("skip-wave".parse(), Ok(ResumeStrategy::SkipWave));
        assert_eq!("S".parse(), Ok(ResumeStrategy::SkipWave));
        assert_eq!("reset".parse(), Ok(ResumeStrategy::Reset));
        assert_eq!("abort".parse(), Ok(ResumeStrategy::Abort));
        assert!("later".parse::<ResumeStrategy>().is_err());
    }

    #[test]
    fn inspect_ignores_missing_complete_and_unstarted() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);
        assert!(ctl.inspect("demo").unwrap().is_none());

        let mut done = interrupted_in_wave_two();
        done.finish();
        store.save(&done).unwrap();
        assert!(ctl.inspect("demo").unwrap().is_none());

        store.save(&ParallelExecutionState::new("demo", 3)).unwrap();
        assert!(ctl.inspect("demo").unwrap().is_none());

        store.save(&interrupted_in_wave_two()).unwrap();
        assert!(ctl.inspect("demo").unwrap().is_some());
    }

    #[test]
    fn retry_resumes_at_first_unfinished_wave() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);
        let mut state = interrupted_in_wave_two();
        state.mark_failed("T4", "boom");

        let plan = ctl.apply(ResumeStrategy::Retry, state, &waves()).unwrap();
        let ResumePlan::Resume(state) = plan else {
            panic!("expected resume");
        };
        assert_eq!(state.current_wave, 1);
        assert_eq!(state.status("T3"), TaskStatus::Completed);
        assert_eq!(state.status("T4"), TaskStatus::Pending);
        assert!(state.failed_tasks.is_empty());
        assert!(state.wave_result(1).is_some());
        assert!(!state.interrupted);
        assert_eq!(store.load("demo").unwrap().unwrap(), state);
    }

    #[test]
    fn skip_wave_marks_unfinished_tasks_and_advances() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);

        let plan = ctl
            .apply(ResumeStrategy::SkipWave, interrupted_in_wave_two(), &waves())
            .unwrap();
        let ResumePlan::Resume(state) = plan else {
            panic!("expected resume");
        };
        assert_eq!(state.current_wave, 3);
        assert_eq!(state.status("T3"), TaskStatus::Completed);
        assert_eq!(state.status("T4"), TaskStatus::Skipped);
        assert_eq!(state.skipped_tasks, vec!["T4"]);
        assert!(state.skip_reasons["T4"].contains("wave 2"));
        assert!(store.load("demo").unwrap().unwrap().wave_result(2).is_some());
    }

    #[test]
    fn skip_wave_keeps_earlier_skip_reasons() {
        let tmp = TempDir::new().unwrap();
        let (ctl, _) = controller(&tmp);
        let mut state = interrupted_in_wave_two();
        state.mark_failed("T3", "boom");
        state.mark_skipped("T4", "dependency T2 failed");

        let ResumePlan::Resume(state) = ctl
            .apply(ResumeStrategy::SkipWave, state, &waves())
            .unwrap()
        else {
            panic!("expected resume");
        };
        assert_eq!(state.skip_reasons["T4"], "dependency T2 failed");
        assert_eq!(state.skipped_tasks, vec!["T4"]);
        let wave = state.wave_result(2).unwrap();
        assert_eq!(
            wave.get("T4").unwrap().outcome,
            TaskOutcome::Skipped {
                reason: "dependency T2 failed".into()
            }
        );
    }

    #[test]
    fn skip_wave_past_last_wave_settles_failed_run() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);
        let mut state = interrupted_in_wave_two();
        state.mark_completed("T4");
        state.mark_failed("T5", "boom");
        state.current_wave = 3;
        state.finish();
        store.save(&state).unwrap();
        assert!(ctl.inspect("demo").unwrap().is_some());

        let ResumePlan::Resume(state) = ctl
            .apply(ResumeStrategy::SkipWave, state, &waves())
            .unwrap()
        else {
            panic!("expected resume");
        };
        assert!(state.is_complete());
        assert_eq!(state.status("T5"), TaskStatus::Failed);
        assert!(ctl.inspect("demo").unwrap().is_none());
    }

    #[test]
    fn reset_deletes_state() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);
        let state = interrupted_in_wave_two();
        store.save(&state).unwrap();

        let plan = ctl.apply(ResumeStrategy::Reset, state, &waves()).unwrap();
        assert_eq!(plan, ResumePlan::Fresh);
        assert!(store.load("demo").unwrap().is_none());
    }

    #[test]
    fn abort_leaves_state_untouched() {
        let tmp = TempDir::new().unwrap();
        let (ctl, store) = controller(&tmp);
        let state = interrupted_in_wave_two();
        store.save(&state).unwrap();

        let plan = ctl
            .apply(ResumeStrategy::Abort, state.clone(), &waves())
            .unwrap();
        assert_eq!(plan, ResumePlan::Abort);
        assert_eq!(store.load("demo").unwrap().unwrap(), state);
    }

    #[test]
    fn resolve_without_state_is_fresh() {
        let tmp = TempDir::new().unwrap();
        let (ctl, _) = controller(&tmp);
        let plan = ctl
            .resolve("demo", &waves(), &ResumeStrategy::Abort)
            .unwrap();
        assert_eq!(plan, ResumePlan::Fresh);
    }
}
