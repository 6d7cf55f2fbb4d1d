//! Sequential stage execution.
//!
//! ```text
//! command ──► AgentInvoker::execute ──► Validator::validate(artifact_dir)
//!    ▲                                         │
//!    └──── original + RETRY context ◄── fail ──┘ (while count < max_retries)
//! ```

mod engine;
mod orchestrator;
mod stage;
mod validation;

pub use engine::{AttemptOutcome, StageExecutor, StageOutcome, StageResult};
pub use orchestrator::{ValidatorProvider, WorkflowOrchestrator, WorkflowReport};
pub use stage::{parse_stage_list, Stage, UnknownStage};
pub use validation::{extract_validation_errors, ValidationError, Validator};
