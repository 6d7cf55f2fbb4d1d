use async_trait::async_trait;

use crate::error::AgentError;

/// The external conversational coding agent.
///
/// One call is one agent session. Implementations enforce their own deadline
/// and report it as [`AgentError::Timeout`], distinct from other failures.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    fn name(&self) -> &str;

    /// Run one session with `prompt`; Ok means the process finished successfully.
    async fn execute(&self, prompt: &str) -> Result<(), AgentError>;

    /// Human-readable command line that `execute` would run (for logs and dry runs).
    fn format_command(&self, prompt: &str) -> String;
}
