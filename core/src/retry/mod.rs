//! Retry bookkeeping for stage execution.
//!
//! - [`RetryStore`] persists one counter per (spec, stage) so an interrupted
//!   multi-stage workflow resumes each stage with the right budget.
//! - [`format_retry_context`] renders the block injected into the next prompt
//!   after a validation failure.

mod context;
mod store;

pub use context::{build_retry_command, format_retry_context, MAX_LISTED_ERRORS};
pub use store::{RetryState, RetryStore};
