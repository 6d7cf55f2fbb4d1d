use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Placeholder substituted with the prompt in `agent.custom_command`.
pub const PROMPT_PLACEHOLDER: &str = "{{PROMPT}}";

pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel.max_parallel == 0 {
            return Err(ConfigError::Invalid {
                field: "parallel.max_parallel",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workflow.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid {
                field: "workflow.max_retries",
                reason: format!("must be at most {MAX_RETRIES_LIMIT}"),
            });
        }
        if let Some(custom) = self.agent.custom_command.as_deref() {
            if !custom.contains(PROMPT_PLACEHOLDER) {
                return Err(ConfigError::Invalid {
                    field: "agent.custom_command",
                    reason: format!("must contain {PROMPT_PLACEHOLDER}"),
                });
            }
        }
        if self.agent.command.trim().is_empty() && self.agent.custom_command.is_none() {
            return Err(ConfigError::Invalid {
                field: "agent.command",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "specflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// How the external coding agent is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Arguments placed before the prompt.
    #[serde(default = "default_agent_args")]
    pub args: Vec<String>,

    /// Full shell command template; `{{PROMPT}}` is replaced with the quoted prompt.
    /// Takes precedence over `command`/`args` when set.
    #[serde(default)]
    pub custom_command: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Per-invocation deadline in seconds. 0 disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_agent_command() -> String {
    "claude".to_string()
}

fn default_agent_args() -> Vec<String> {
    vec!["-p".to_string()]
}

fn default_timeout_secs() -> u64 {
    2400
}

impl AgentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            args: default_agent_args(),
            custom_command: None,
            env: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Validation retries allowed per (spec, stage) after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Directory holding one sub-directory per spec.
    #[serde(default = "default_specs_dir")]
    pub specs_dir: String,

    /// Directory for retry counters and parallel checkpoints.
    /// Resolved under the data dir when unset.
    #[serde(default)]
    pub state_dir: Option<String>,

    /// Skip the required-artifact check before each stage.
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_specs_dir() -> String {
    "specs".to_string()
}

impl WorkflowConfig {
    pub fn spec_dir(&self, spec_name: &str) -> PathBuf {
        PathBuf::from(&self.specs_dir).join(spec_name)
    }

    /// Configured state directory, or `.specflow/state` relative to the
    /// working directory when nothing resolved one.
    pub fn state_dir_path(&self) -> PathBuf {
        self.state_dir
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".specflow").join("state"))
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            specs_dir: default_specs_dir(),
            state_dir: None,
            skip_preflight: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Enable visual progress bars while waves run.
    #[serde(default = "default_progress_bar")]
    pub progress_bar: bool,
}

fn default_max_parallel() -> usize {
    4
}

fn default_progress_bar() -> bool {
    true
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            progress_bar: default_progress_bar(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.workflow.max_retries, 3);
        assert_eq!(cfg.parallel.max_parallel, 4);
        assert_eq!(cfg.agent.timeout(), Some(Duration::from_secs(2400)));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [workflow]
            max_retries = 1

            [agent]
            timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.workflow.max_retries, 1);
        assert_eq!(cfg.workflow.specs_dir, "specs");
        assert_eq!(cfg.agent.command, "claude");
        assert_eq!(cfg.agent.timeout(), None);
    }

    #[test]
    fn rejects_zero_parallelism() {
        let mut cfg = AppConfig::default();
        cfg.parallel.max_parallel = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "parallel.max_parallel",
                ..
            })
        ));
    }

    #[test]
    fn custom_command_requires_placeholder() {
        let mut cfg = AppConfig::default();
        cfg.agent.custom_command = Some("claude -p".to_string());
        assert!(cfg.validate().is_err());

        cfg.agent.custom_command = Some("claude -p {{PROMPT}} --verbose".to_string());
        assert!(cfg.validate().is_ok());
    }
}
