use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::error::ConfigError;

/// Get the default specflow data directory: ~/.specflow
pub fn get_specflow_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".specflow"))
        .ok_or(ConfigError::NoHomeDir)
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    // Priority 1: ~/.specflow/config.toml (highest)
    let data_dir = get_specflow_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./.specflow/config.toml (project)
    let project_config = Path::new(".specflow").join("config.toml");

    let cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if project_config.exists() {
        load_from_path(&project_config)?
    } else {
        AppConfig::default()
    };

    finalize(cfg, &data_dir)
}

/// Load an explicit file when given, else the default locations; either way
/// apply environment overrides and validate.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => finalize(load_from_path(path)?, &get_specflow_data_dir()?),
        None => load_default(),
    }
}

fn finalize(mut cfg: AppConfig, data_dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_state_dir(&mut cfg, data_dir);
    apply_env_overrides(&mut cfg)?;
    cfg.validate()?;
    Ok(cfg)
}

fn resolve_state_dir(cfg: &mut AppConfig, data_dir: &Path) {
    let unset = cfg
        .workflow
        .state_dir
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true);
    if unset {
        cfg.workflow.state_dir = Some(data_dir.join("state").to_string_lossy().to_string());
    }
}

// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(cfg: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(v) = env_value("SPECFLOW_MAX_RETRIES") {
        cfg.workflow.max_retries = parse_env("SPECFLOW_MAX_RETRIES", &v)?;
    }
    if let Some(v) = env_value("SPECFLOW_TIMEOUT_SECS") {
        cfg.agent.timeout_secs = parse_env("SPECFLOW_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = env_value("SPECFLOW_MAX_PARALLEL") {
        cfg.parallel.max_parallel = parse_env("SPECFLOW_MAX_PARALLEL", &v)?;
    }
    if let Some(v) = env_value("SPECFLOW_AGENT_CMD") {
        cfg.agent.command = v;
    }
    if let Some(v) = env_value("SPECFLOW_STATE_DIR") {
        cfg.workflow.state_dir = Some(v);
    }
    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("'{value}' is not a valid number"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_from_path_reads_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[parallel]\nmax_parallel = 8\n\n[agent]\ncommand = \"my-agent\"\n",
        )
        .unwrap();

        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.parallel.max_parallel, 8);
        assert_eq!(cfg.agent.command, "my-agent");
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[parallel\nmax_parallel = ").unwrap();

        assert!(matches!(
            load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn state_dir_defaults_under_data_dir() {
        let mut cfg = AppConfig::default();
        resolve_state_dir(&mut cfg, Path::new("/tmp/specflow-home"));
        assert_eq!(
            cfg.workflow.state_dir.as_deref(),
            Some("/tmp/specflow-home/state")
        );
    }

    #[test]
    fn parse_env_rejects_garbage() {
        assert_eq!(parse_env::<u32>("X", "3").unwrap(), 3);
        assert!(parse_env::<u32>("X", "three").is_err());
    }
}
