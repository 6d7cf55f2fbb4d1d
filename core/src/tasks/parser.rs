use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ExecutorError;
use crate::executor::{Task, TaskStatus};

/// File name of the task list inside a spec directory.
pub const TASKS_FILE: &str = "tasks.yaml";

#[derive(Debug, Default, Deserialize)]
struct TasksDocument {
    #[serde(default)]
    phases: Vec<Phase>,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct Phase {
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "depends_on", alias = "dependsOn")]
    dependencies: Vec<String>,
}

/// Read and flatten the tasks file at `path`.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, ExecutorError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ExecutorError::TasksFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_tasks(&raw).map_err(|e| match e {
        ExecutorError::TasksFile { reason, .. } => ExecutorError::TasksFile {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// Parse tasks from YAML. Phase tasks come first in file order, then any
/// top-level `tasks`.
pub fn parse_tasks(raw: &str) -> Result<Vec<Task>, ExecutorError> {
    let invalid = |reason: String| ExecutorError::TasksFile {
        path: TASKS_FILE.to_string(),
        reason,
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: TasksDocument = serde_yaml::from_str(raw).map_err(|e| invalid(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::new();
    let entries = doc
        .phases
        .into_iter()
        .flat_map(|p| p.tasks)
        .chain(doc.tasks);

    for entry in entries {
        let id = entry.id.trim().to_string();
        if id.is_empty() {
            return Err(invalid("task with empty id".to_string()));
        }
        if !seen.insert(id.clone()) {
            return Err(ExecutorError::DuplicateTaskId(id));
        }

        let status = match entry.status.as_deref() {
            None => TaskStatus::Pending,
            Some(raw) => TaskStatus::parse_loose(raw)
                .ok_or_else(|| invalid(format!("task {id}: unknown status '{raw}'")))?,
        };

        tasks.push(Task {
            id,
            title: entry.title,
            dependencies: entry
                .dependencies
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            status,
        });
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
phases:
  - number: 1
    title: Setup
    tasks:
      - id: T001
        title: Create project
        status: Completed
        dependencies: []
      - id: T002
        title: Add config
        status: Pending
        dependencies: [T001]
  - number: 2
    title: Core
    tasks:
      - id: T003
        title: Implement parser
        status: InProgress
        dependencies:
          - T001
          - T002
"#;

    #[test]
    fn flattens_phases_in_file_order() {
        let tasks = parse_tasks(SAMPLE).unwrap();
        let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T001", "T002", "T003"]);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[2].status, TaskStatus::InProgress);
        assert_eq!(tasks[2].dependencies, vec!["T001", "T002"]);
        assert_eq!(tasks[1].title, "Add config");
    }

    #[test]
    fn top_level_tasks_follow_phases() {
        let raw = "phases:\n  - tasks:\n      - id: A\ntasks:\n  - id: B\n    depends_on: [A]\n";
        let tasks = parse_tasks(raw).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].id, "B");
        assert_eq!(tasks[1].dependencies, vec!["A"]);
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = "tasks:\n  - id: A\n  - id: A\n";
        assert!(matches!(
            parse_tasks(raw),
            Err(ExecutorError::DuplicateTaskId(id)) if id == "A"
        ));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let raw = "tasks:\n  - id: A\n    status: Exploded\n";
        let err = parse_tasks(raw).unwrap_err();
        assert!(err.to_string().contains("unknown status"), "{err}");
    }

    #[test]
    fn empty_document_has_no_tasks() {
        assert!(parse_tasks("").unwrap().is_empty());
        assert!(parse_tasks("phases: []\n").unwrap().is_empty());
    }

    #[test]
    fn load_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(TASKS_FILE);
        std::fs::write(&path, "tasks: [oops").unwrap();
        match load_tasks(&path).unwrap_err() {
            ExecutorError::TasksFile { path: p, .. } => assert!(p.ends_with(TASKS_FILE)),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(load_tasks(&tmp.path().join("missing.yaml")).is_err());
    }
}
