pub mod cli;
mod implement;
mod prompt;
mod reset;
mod run;
mod status;

use std::path::PathBuf;

use specflow_core::config::AppConfig;
use specflow_core::error::{CliError, ExecutorError};
use specflow_core::workflow::{parse_stage_list, Stage};
use tokio_util::sync::CancellationToken;

pub use implement::implement_cmd;
pub use reset::reset_cmd;
pub use run::{run_cmd, stage_cmd};
pub use status::status_cmd;

/// Everything a subcommand needs once config is resolved.
pub struct CommandContext {
    pub cfg: AppConfig,
    pub state_dir: PathBuf,
    pub cancel: CancellationToken,
}

impl CommandContext {
    pub fn new(cfg: AppConfig, cancel: CancellationToken) -> Self {
        let state_dir = cfg.workflow.state_dir_path();
        Self {
            cfg,
            state_dir,
            cancel,
        }
    }
}

pub(crate) fn parse_stage(raw: &str) -> Result<Stage, CliError> {
    raw.parse::<Stage>()
        .map_err(|e| CliError::Usage(e.to_string()))
}

pub(crate) fn parse_stages(raw: &str) -> Result<Vec<Stage>, CliError> {
    let stages = parse_stage_list(raw).map_err(|e| CliError::Usage(e.to_string()))?;
    if stages.is_empty() {
        return Err(CliError::Usage("no stages given".to_string()));
    }
    Ok(stages)
}

/// Await `fut` unless `cancel` fires first; dropping `fut` stops any agent child.
pub(crate) async fn cancellable<F, T, E>(cancel: &CancellationToken, fut: F) -> Result<T, CliError>
where
    F: std::future::Future<Output = Result<T, E>>,
    CliError: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CliError::Executor(ExecutorError::Cancelled)),
        res = fut => res.map_err(CliError::from),
    }
}
