use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use specflow_core::agent::AgentInvoker;
use specflow_core::config::{AgentConfig, PROMPT_PLACEHOLDER};
use specflow_core::error::AgentError;

/// Launches the coding agent as a child process, one process per prompt.
///
/// The child inherits stdout/stderr so the agent's own output reaches the
/// terminal. It is killed when the invocation future is dropped, which is how
/// timeouts and cancellation stop it.
#[derive(Debug, Clone)]
pub struct SubprocessAgent {
    program: String,
    args: Vec<String>,
    custom_command: Option<String>,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl SubprocessAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            custom_command: None,
            env: HashMap::new(),
            timeout: None,
        }
    }

    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            program: cfg.command.clone(),
            args: cfg.args.clone(),
            custom_command: cfg.custom_command.clone(),
            env: cfg.env.clone(),
            timeout: cfg.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_custom_command(mut self, template: impl Into<String>) -> Self {
        self.custom_command = Some(template.into());
        self
    }

    /// Shell line for a custom template with the prompt substituted.
    fn shell_line(template: &str, prompt: &str) -> String {
        template.replace(PROMPT_PLACEHOLDER, &shell_quote(prompt))
    }

    fn build_command(&self, prompt: &str) -> Command {
        let mut cmd = match &self.custom_command {
            Some(template) => {
                let line = Self::shell_line(template, prompt);
                let mut cmd = if cfg!(windows) {
                    let mut c = Command::new("cmd");
                    c.arg("/C");
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c");
                    c
                };
                cmd.arg(line);
                cmd
            }
            None => {
                let mut cmd = Command::new(&self.program);
                cmd.args(&self.args).arg(prompt);
                cmd
            }
        };
        cmd.envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    fn program_name(&self) -> String {
        match &self.custom_command {
            Some(_) if cfg!(windows) => "cmd".to_string(),
            Some(_) => "sh".to_string(),
            None => self.program.clone(),
        }
    }
}

#[async_trait]
impl AgentInvoker for SubprocessAgent {
    fn name(&self) -> &str {
        "subprocess"
    }

    async fn execute(&self, prompt: &str) -> Result<(), AgentError> {
        let mut child = self
            .build_command(prompt)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status,
                Err(source) => {
                    let _ = child.kill().await;
                    return Err(AgentError::Timeout {
                        timeout,
                        command: self.format_command(prompt),
                        source,
                    });
                }
            },
            None => child.wait().await,
        }
        .map_err(|e| AgentError::Other(format!("failed to wait for agent: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(AgentError::ExitStatus {
                code: status.code().unwrap_or(-1),
                command: self.format_command(prompt),
            })
        }
    }

    fn format_command(&self, prompt: &str) -> String {
        match &self.custom_command {
            Some(template) => Self::shell_line(template, prompt),
            None => {
                let mut parts = vec![self.program.clone()];
                parts.extend(self.args.iter().cloned());
                parts.push(shell_quote(prompt));
                parts.join(" ")
            }
        }
    }
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn formats_plain_command() {
        let agent = SubprocessAgent::new("claude", vec!["-p".into()]);
        assert_eq!(
            agent.format_command("/specflow.plan"),
            "claude -p '/specflow.plan'"
        );
    }

    #[test]
    fn formats_custom_template() {
        let agent = SubprocessAgent::new("unused", vec![])
            .with_custom_command("my-agent --prompt {{PROMPT}} --yes");
        assert_eq!(
            agent.format_command("/specflow.tasks"),
            "my-agent --prompt '/specflow.tasks' --yes"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let agent = SubprocessAgent::new("unused", vec![]).with_custom_command("exit 3 # {{PROMPT}}");
        match agent.execute("x").await.unwrap_err() {
            AgentError::ExitStatus { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_exit() {
        let agent = SubprocessAgent::new("unused", vec![]).with_custom_command("true {{PROMPT}}");
        agent.execute("hello").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_agent_times_out() {
        let agent = SubprocessAgent::new("unused", vec![])
            .with_custom_command("sleep 5 # {{PROMPT}}")
            .with_timeout(Some(Duration::from_millis(100)));
        let err = agent.execute("x").await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let agent = SubprocessAgent::new("specflow-no-such-agent-binary", vec![]);
        assert!(matches!(
            agent.execute("x").await.unwrap_err(),
            AgentError::Spawn { .. }
        ));
    }
}
