//! Loading implementation tasks from `tasks.yaml`.

mod parser;

pub use parser::{load_tasks, parse_tasks, TASKS_FILE};
