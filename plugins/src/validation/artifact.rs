use std::path::Path;
use std::sync::Arc;

use serde_yaml::Value;

use specflow_core::executor::TaskGraph;
use specflow_core::tasks::{parse_tasks, TASKS_FILE};
use specflow_core::workflow::{Stage, ValidationError, Validator, ValidatorProvider};

/// Structural checks on the files a stage produces.
///
/// Every problem becomes one `"- "` line so it can be fed back to the agent.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactValidator {
    stage: Stage,
}

impl ArtifactValidator {
    pub fn for_stage(stage: Stage) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

impl Validator for ArtifactValidator {
    fn validate(&self, artifact_dir: &Path) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        for name in self.stage.produced_artifacts() {
            let path = artifact_dir.join(name);
            if name.ends_with(".yaml") {
                check_yaml_document(&path, name, &mut errors);
            } else {
                check_directory(&path, name, &mut errors);
            }
        }

        if self.stage == Stage::Tasks && errors.is_empty() {
            check_task_graph(&artifact_dir.join(TASKS_FILE), &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_errors(
                &format!("{} artifacts failed validation:", self.stage),
                errors,
            ))
        }
    }
}

fn check_yaml_document(path: &Path, name: &str, errors: &mut Vec<String>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            errors.push(format!("missing field: file {name} was not created"));
            return;
        }
        Err(e) => {
            errors.push(format!("cannot read {name}: {e}"));
            return;
        }
    };

    match serde_yaml::from_str::<Value>(&raw) {
        Ok(Value::Mapping(map)) if map.is_empty() => {
            errors.push(format!("missing field: {name} has no top-level fields"));
        }
        Ok(Value::Mapping(_)) => {}
        Ok(Value::Null) => errors.push(format!("missing field: {name} is empty")),
        Ok(_) => errors.push(format!("wrong type: {name} must be a YAML mapping")),
        Err(e) => errors.push(format!("pattern mismatch: {name} is not valid YAML ({e})")),
    }
}

fn check_directory(path: &Path, name: &str, errors: &mut Vec<String>) {
    match std::fs::read_dir(path) {
        Ok(mut entries) => {
            if entries.next().is_none() {
                errors.push(format!("missing field: directory {name} is empty"));
            }
        }
        Err(_) => errors.push(format!("missing field: directory {name} was not created")),
    }
}

fn check_task_graph(path: &Path, errors: &mut Vec<String>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            errors.push(format!("cannot read {TASKS_FILE}: {e}"));
            return;
        }
    };

    let tasks = match parse_tasks(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            errors.push(format!("wrong type: {e}"));
            return;
        }
    };
    if tasks.is_empty() {
        errors.push(format!("missing field: {TASKS_FILE} defines no tasks"));
        return;
    }

    if let Err(e) = TaskGraph::from_tasks(&tasks).and_then(|g| g.waves()) {
        errors.push(format!("dependency error: {e}"));
    }
}

/// Hands out an [`ArtifactValidator`] for every stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactValidators;

impl ValidatorProvider for ArtifactValidators {
    fn validator_for(&self, stage: Stage) -> Arc<dyn Validator> {
        Arc::new(ArtifactValidator::for_stage(stage))
    }
}
