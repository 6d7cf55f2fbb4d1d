mod load;
mod types;

pub use load::{get_specflow_data_dir, load, load_default, load_from_path};
pub use types::{
    AgentConfig, AppConfig, LoggingConfig, ParallelConfig, WorkflowConfig, MAX_RETRIES_LIMIT,
    PROMPT_PLACEHOLDER,
};
