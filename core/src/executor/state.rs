use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::util::{file_key, read_json_opt, remove_if_exists, write_json_atomic};

use super::types::{TaskStatus, WaveResult};

/// Persisted progress of one parallel run.
///
/// `current_wave` is 1-based; 0 means no wave has started yet. Unknown fields
/// from newer writers are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelExecutionState {
    pub spec_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub current_wave: usize,
    #[serde(default)]
    pub total_waves: usize,
    #[serde(default)]
    pub task_statuses: BTreeMap<String, TaskStatus>,
    #[serde(default)]
    pub failed_tasks: Vec<String>,
    #[serde(default)]
    pub skipped_tasks: Vec<String>,
    #[serde(default)]
    pub task_errors: BTreeMap<String, String>,
    #[serde(default)]
    pub skip_reasons: BTreeMap<String, String>,
    #[serde(default)]
    pub wave_results: Vec<WaveResult>,
    #[serde(default)]
    pub worktree_paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ParallelExecutionState {
    pub fn new(spec_name: &str, total_waves: usize) -> Self {
        Self {
            spec_name: spec_name.to_string(),
            started_at: Utc::now(),
            current_wave: 0,
            total_waves,
            task_statuses: BTreeMap::new(),
            failed_tasks: Vec::new(),
            skipped_tasks: Vec::new(),
            task_errors: BTreeMap::new(),
            skip_reasons: BTreeMap::new(),
            wave_results: Vec::new(),
            worktree_paths: BTreeMap::new(),
            interrupted: false,
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// A run that started, did not finish cleanly, and should prompt on next start.
    pub fn needs_resume(&self) -> bool {
        !self.is_complete() && self.current_wave > 0
    }

    pub fn status(&self, task_id: &str) -> TaskStatus {
        self.task_statuses
            .get(task_id)
            .copied()
            .unwrap_or(TaskStatus::Pending)
    }

    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) {
        self.task_statuses.insert(task_id.to_string(), status);
    }

    pub fn mark_completed(&mut self, task_id: &str) {
        self.clear_outcome(task_id);
        self.set_status(task_id, TaskStatus::Completed);
    }

    pub fn mark_failed(&mut self, task_id: &str, error: &str) {
        self.clear_outcome(task_id);
        self.set_status(task_id, TaskStatus::Failed);
        self.failed_tasks.push(task_id.to_string());
        self.task_errors
            .insert(task_id.to_string(), error.to_string());
    }

    pub fn mark_skipped(&mut self, task_id: &str, reason: &str) {
        self.clear_outcome(task_id);
        self.set_status(task_id, TaskStatus::Skipped);
        self.skipped_tasks.push(task_id.to_string());
        self.skip_reasons
            .insert(task_id.to_string(), reason.to_string());
    }

    /// Return a task to pending, forgetting any failure or skip.
    pub fn reset_task(&mut self, task_id: &str) {
        self.clear_outcome(task_id);
        self.set_status(task_id, TaskStatus::Pending);
    }

    fn clear_outcome(&mut self, task_id: &str) {
        self.failed_tasks.retain(|id| id != task_id);
        self.skipped_tasks.retain(|id| id != task_id);
        self.task_errors.remove(task_id);
        self.skip_reasons.remove(task_id);
    }

    /// Insert or replace the result for its wave, keeping results ordered.
    pub fn record_wave(&mut self, result: WaveResult) {
        self.wave_results
            .retain(|w| w.wave_number != result.wave_number);
        let at = self
            .wave_results
            .iter()
            .position(|w| w.wave_number > result.wave_number)
            .unwrap_or(self.wave_results.len());
        self.wave_results.insert(at, result);
    }

    pub fn wave_result(&self, wave_number: usize) -> Option<&WaveResult> {
        self.wave_results
            .iter()
            .find(|w| w.wave_number == wave_number)
    }

    pub fn completed_count(&self) -> usize {
        self.task_statuses
            .values()
            .filter(|s| s.is_done())
            .count()
    }

    pub fn finish(&mut self) {
        self.interrupted = false;
        if self.failed_tasks.is_empty() && self.skipped_tasks.is_empty() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// File-backed store: `<state_dir>/parallel/<spec>.json`.
#[derive(Debug, Clone)]
pub struct ParallelStateStore {
    dir: PathBuf,
}

impl ParallelStateStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: state_dir.as_ref().join("parallel"),
        }
    }

    pub fn path_for(&self, spec_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_key(spec_name)))
    }

    pub fn load(&self, spec_name: &str) -> Result<Option<ParallelExecutionState>, StateError> {
        read_json_opt(&self.path_for(spec_name))
    }

    pub fn save(&self, state: &ParallelExecutionState) -> Result<(), StateError> {
        write_json_atomic(&self.path_for(&state.spec_name), state)
    }

    /// Remove persisted state; returns whether anything was removed.
    pub fn delete(&self, spec_name: &str) -> Result<bool, StateError> {
        remove_if_exists(&self.path_for(spec_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::TaskResult;
    use tempfile::TempDir;

    #[test]
    fn outcome_transitions_keep_lists_consistent() {
        let mut state = ParallelExecutionState::new("s", 2);
        state.mark_failed("T1", "boom");
        state.mark_skipped("T2", "dependency T1 failed");
        assert_eq!(state.failed_tasks, vec!["T1"]);
        assert_eq!(state.skipped_tasks, vec!["T2"]);

        state.reset_task("T1");
        state.mark_completed("T2");
        assert!(state.failed_tasks.is_empty());
        assert!(state.skipped_tasks.is_empty());
        assert!(state.task_errors.is_empty());
        assert_eq!(state.status("T1"), TaskStatus::Pending);
        assert_eq!(state.status("T2"), TaskStatus::Completed);
        assert_eq!(state.status("T9"), TaskStatus::Pending);
    }

    #[test]
    fn record_wave_replaces_and_orders() {
        let mut state = ParallelExecutionState::new("s", 3);
        state.record_wave(WaveResult::from_results(2, vec![]));
        state.record_wave(WaveResult::from_results(1, vec![]));
        state.record_wave(WaveResult::from_results(
            2,
            vec![TaskResult::success("T2", 1)],
        ));
        let numbers: Vec<_> = state.wave_results.iter().map(|w| w.wave_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(state.wave_result(2).unwrap().results.len(), 1);
    }

    #[test]
    fn finish_marks_complete_only_when_clean() {
        let mut clean = ParallelExecutionState::new("s", 1);
        clean.interrupted = true;
        clean.finish();
        assert!(clean.is_complete());
        assert!(!clean.interrupted);

        let mut failed = ParallelExecutionState::new("s", 1);
        failed.current_wave = 1;
        failed.mark_failed("T1", "boom");
        failed.finish();
        assert!(!failed.is_complete());
        assert!(failed.needs_resume());
    }

    #[test]
    fn store_roundtrip_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = ParallelStateStore::new(tmp.path());
        assert!(store.load("feat/x").unwrap().is_none());

        let mut state = ParallelExecutionState::new("feat/x", 2);
        state.current_wave = 1;
        state.interrupted = true;
        state
            .worktree_paths
            .insert("T1".into(), PathBuf::from("/tmp/wt/T1"));
        store.save(&state).unwrap();

        let loaded = store.load("feat/x").unwrap().unwrap();
        assert_eq!(loaded, state);

        assert!(store.delete("feat/x").unwrap());
        assert!(!store.delete("feat/x").unwrap());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{
            "specName": "s",
            "startedAt": "2026-01-01T00:00:00Z",
            "currentWave": 2,
            "futureField": {"anything": true}
        }"#;
        let state: ParallelExecutionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.current_wave, 2);
        assert!(state.task_statuses.is_empty());
        assert!(!state.interrupted);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = ParallelStateStore::new(tmp.path());
        std::fs::create_dir_all(tmp.path().join("parallel")).unwrap();
        std::fs::write(store.path_for("s"), "{not json").unwrap();
        assert!(matches!(store.load("s"), Err(StateError::Corrupt { .. })));
    }
}
