#[allow(clippy::module_inception)]
pub mod error;
pub mod code;
pub mod executor;
pub mod stage;
pub mod state;

pub use code::ErrorCode;
pub use error::{CliError, ConfigError};
pub use executor::ExecutorError;
pub use stage::{AgentError, StageError};
pub use state::StateError;
