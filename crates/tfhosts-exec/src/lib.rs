//! tfhosts-exec: Local command execution
//!
//! Runs the provisioning tool as a child process with a bounded wait and captures its output.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::{CommandResult, CommandSpec};
pub use traits::CommandExecutor;
