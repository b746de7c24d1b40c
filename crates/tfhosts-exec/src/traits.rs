//! Command executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{CommandResult, CommandSpec};

/// Runs a command to completion and reports its captured output
///
/// A non-zero exit status is not an error at this level; callers inspect
/// [`CommandResult::success`] and decide.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command and wait for it to exit
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError>;

    /// Run a command, killing it if it does not exit within `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short name used in logs
    fn executor_type(&self) -> &'static str;
}
