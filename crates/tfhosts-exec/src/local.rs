//! Local command execution using `tokio::process`

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::result::{CommandResult, CommandSpec};
use crate::traits::CommandExecutor;

/// Local command executor
///
/// Spawns the program directly (no shell) with stdin closed, so a tool waiting on an
/// interactive prompt sees EOF instead of hanging. The child is killed when the
/// execution future is dropped, which is how timeouts terminate it.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(command = %cmd), level = "debug")]
    async fn execute(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| ExecError::SpawnError {
            program: cmd.program.clone(),
            reason: e.to_string(),
        })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(status = status, duration = ?duration, "command completed");

        if !output.status.success() {
            warn!(status = status, stderr = %stderr.trim(), "command failed");
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError> {
        self.execute(cmd).await
    }

    #[instrument(skip_all, fields(command = %cmd), level = "debug")]
    async fn run_with_timeout(
        &self,
        cmd: &CommandSpec,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        match timeout(timeout_duration, self.execute(cmd)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "command timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_run_success() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("echo hello")).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_failure() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("exit 42")).await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let executor = LocalExecutor::new();
        let result = executor
            .run_with_timeout(&sh("sleep 5"), Duration::from_millis(100))
            .await;

        assert!(matches!(result, Err(ExecError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_with_stderr() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("echo error >&2")).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stderr.trim(), "error");
    }

    #[tokio::test]
    async fn test_stdin_is_closed() {
        let executor = LocalExecutor::new();
        let result = executor
            .run_with_timeout(&sh("read line; echo \"got:$line\""), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.stdout.trim(), "got:");
    }

    #[tokio::test]
    async fn test_env_and_working_dir() {
        let executor = LocalExecutor::new();
        let cmd = sh("echo \"$TFHOSTS_TEST\" && pwd")
            .env("TFHOSTS_TEST", "marker")
            .current_dir("/");
        let result = executor.run(&cmd).await.unwrap();

        let lines: Vec<&str> = result.stdout.lines().collect();
        assert_eq!(lines, vec!["marker", "/"]);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = LocalExecutor::new();
        let result = executor
            .run(&CommandSpec::new("tfhosts-definitely-not-installed"))
            .await;

        assert!(matches!(result, Err(ExecError::SpawnError { .. })));
    }
}
