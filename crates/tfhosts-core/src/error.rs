//! Error types for tfhosts-core

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that abort an inventory run
///
/// Every variant is terminal: nothing is retried and no partial inventory is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Provisioning command could not be run or exited non-zero
    #[error("provisioning tool unavailable (`{command}`): {stderr}")]
    ProvisioningUnavailable {
        /// Command line that was attempted
        command: String,
        /// Captured stderr, or the spawn error
        stderr: String,
    },

    /// Provisioning command did not finish in time
    #[error("provisioning tool timed out after {timeout:?} (`{command}`)")]
    ProvisioningTimeout {
        /// Command line that was attempted
        command: String,
        /// Bound that was exceeded
        timeout: Duration,
    },

    /// Provisioning output is not the expected JSON document
    #[error("malformed provisioning output: {0}")]
    MalformedOutput(String),

    /// A role's required output key is absent
    #[error("missing output `{key}` required by role `{role}`")]
    MissingOutput {
        /// Role that needs the key
        role: String,
        /// Output name
        key: String,
    },

    /// A role's output exists but cannot be used as an address or user
    #[error("invalid output `{key}` for role `{role}`: {reason}")]
    InvalidOutput {
        /// Role that needs the key
        role: String,
        /// Output name
        key: String,
        /// What is wrong with the value
        reason: String,
    },

    /// A proxied role's bastion host was never constructed
    #[error("unresolved bastion for role `{0}`")]
    UnresolvedBastion(String),

    /// Role configuration is inconsistent
    #[error("invalid role configuration: {0}")]
    InvalidRoleSpec(String),

    /// Inventory could not be serialized
    #[error("failed to render inventory: {0}")]
    Render(String),

    /// Inventory file could not be written
    #[error("failed to write inventory to {}: {reason}", path.display())]
    WriteFailure {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },
}

impl InventoryError {
    /// Build a `MissingOutput` error
    pub fn missing(role: impl Into<String>, key: impl Into<String>) -> Self {
        InventoryError::MissingOutput {
            role: role.into(),
            key: key.into(),
        }
    }

    /// Build an `InvalidOutput` error
    pub fn invalid(
        role: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        InventoryError::InvalidOutput {
            role: role.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure comes from the provisioning side rather than configuration
    #[must_use]
    pub fn is_provisioning_failure(&self) -> bool {
        matches!(
            self,
            InventoryError::ProvisioningUnavailable { .. }
                | InventoryError::ProvisioningTimeout { .. }
                | InventoryError::MalformedOutput(_)
        )
    }
}
