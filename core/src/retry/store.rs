use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::util::{file_key, read_json_opt, remove_if_exists, write_json_atomic};
use crate::workflow::Stage;

/// Retry counter for one (spec, stage) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    pub spec_name: String,
    pub stage: Stage,
    pub count: u32,
    pub max_retries: u32,
}

impl RetryState {
    pub fn new(spec_name: &str, stage: Stage, max_retries: u32) -> Self {
        Self {
            spec_name: spec_name.to_string(),
            stage,
            count: 0,
            max_retries,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.count < self.max_retries
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// File-backed store: `<state_dir>/retry/<spec>.<stage>.json`.
///
/// Writes are whole-file replacements. Only one process should drive a given
/// (spec, stage) at a time.
#[derive(Debug, Clone)]
pub struct RetryStore {
    dir: PathBuf,
}

impl RetryStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: state_dir.as_ref().join("retry"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, spec_name: &str, stage: Stage) -> PathBuf {
        self.dir
            .join(format!("{}.{}.json", file_key(spec_name), stage.as_str()))
    }

    /// Load the persisted counter, or a fresh zero counter when none exists.
    ///
    /// `max_retries` always reflects the current run-wide setting, not whatever
    /// was stored by an earlier run.
    pub fn load(
        &self,
        spec_name: &str,
        stage: Stage,
        max_retries: u32,
    ) -> Result<RetryState, StateError> {
        let path = self.path_for(spec_name, stage);
        let mut state = read_json_opt::<RetryState>(&path)?
            .unwrap_or_else(|| RetryState::new(spec_name, stage, max_retries));
        state.max_retries = max_retries;
        Ok(state)
    }

    pub fn save(&self, state: &RetryState) -> Result<(), StateError> {
        write_json_atomic(&self.path_for(&state.spec_name, state.stage), state)
    }

    /// Increment and persist; returns the new count.
    pub fn increment(&self, state: &mut RetryState) -> Result<u32, StateError> {
        state.increment();
        self.save(state)?;
        Ok(state.count)
    }

    /// Zero the counter and persist it.
    pub fn reset(&self, state: &mut RetryState) -> Result<(), StateError> {
        state.reset();
        self.save(state)
    }

    /// Forget the counter for one stage.
    pub fn clear(&self, spec_name: &str, stage: Stage) -> Result<bool, StateError> {
        remove_if_exists(&self.path_for(spec_name, stage))
    }

    /// Forget every stage counter of a spec; returns how many were removed.
    pub fn clear_spec(&self, spec_name: &str) -> Result<usize, StateError> {
        let mut removed = 0;
        for stage in Stage::all() {
            if self.clear(spec_name, *stage)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Persisted counters of a spec, in canonical stage order.
    pub fn list(&self, spec_name: &str) -> Result<Vec<RetryState>, StateError> {
        let mut states = Vec::new();
        for stage in Stage::all() {
            if let Some(state) = read_json_opt::<RetryState>(&self.path_for(spec_name, *stage))? {
                states.push(state);
            }
        }
        Ok(states)
    }
}
