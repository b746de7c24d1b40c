//! Error types for tfhosts-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a command
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Process could not be started (binary missing, permission denied, bad working dir)
    #[error("failed to spawn `{program}`: {reason}")]
    SpawnError {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        reason: String,
    },

    /// Command timed out and was killed
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// I/O error while collecting output
    #[error("I/O error: {0}")]
    IoError(String),
}
