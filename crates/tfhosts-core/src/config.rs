//! Role configuration
//!
//! A [`RoleSpec`] declares which provisioning outputs describe each host role and how roles
//! reach each other. The defaults reproduce a NAT instance acting as the jump host for a
//! private database, plus a directly reachable docker host.
//!
//! ```toml
//! ssh_key = "~/.ssh/zp2key"
//!
//! [[role]]
//! name = "nat"
//! address_output = "nat_host_public_ip"
//! user = "ec2-user"
//! bastion = true
//!
//! [[role]]
//! name = "database"
//! address_output = "database_private_ip"
//! user = "ubuntu"
//! via = "nat"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;
use crate::types::ALL_GROUP;
use crate::validate::{check_key_path, check_user};

/// Configuration for one host role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role identifier, also used as the group name
    pub name: String,
    /// Host identifier (defaults to `<name>_host`)
    #[serde(default)]
    pub host_name: Option<String>,
    /// Output holding the host address, or a list of addresses
    pub address_output: String,
    /// Login user
    #[serde(default = "default_user")]
    pub user: String,
    /// Output that overrides `user` when present
    #[serde(default)]
    pub user_output: Option<String>,
    /// Private key path (defaults to the shared `ssh_key`)
    #[serde(default)]
    pub ssh_key: Option<String>,
    /// Other roles may route through this one
    #[serde(default)]
    pub bastion: bool,
    /// Bastion role this role is reached through
    #[serde(default)]
    pub via: Option<String>,
}

fn default_user() -> String {
    "root".to_string()
}

impl RoleConfig {
    /// Create a directly reachable role
    pub fn new(
        name: impl Into<String>,
        address_output: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host_name: None,
            address_output: address_output.into(),
            user: user.into(),
            user_output: None,
            ssh_key: None,
            bastion: false,
            via: None,
        }
    }

    /// Mark this role as a bastion
    #[must_use]
    pub fn as_bastion(mut self) -> Self {
        self.bastion = true;
        self
    }

    /// Route this role through a bastion role
    #[must_use]
    pub fn via(mut self, bastion_role: impl Into<String>) -> Self {
        self.via = Some(bastion_role.into());
        self
    }

    /// Set an explicit host identifier
    #[must_use]
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    /// Override the shared key
    #[must_use]
    pub fn with_ssh_key(mut self, path: impl Into<String>) -> Self {
        self.ssh_key = Some(path.into());
        self
    }

    /// Read the login user from an output when it exists
    #[must_use]
    pub fn with_user_output(mut self, key: impl Into<String>) -> Self {
        self.user_output = Some(key.into());
        self
    }

    /// Host identifier for this role
    #[must_use]
    pub fn host_id(&self) -> String {
        self.host_name
            .clone()
            .unwrap_or_else(|| format!("{}_host", self.name))
    }
}

/// Declarative description of every role in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Private key used by roles without their own
    #[serde(default = "default_ssh_key")]
    pub ssh_key: String,
    /// Roles in declaration order
    #[serde(default = "default_roles", rename = "role")]
    pub roles: Vec<RoleConfig>,
}

fn default_ssh_key() -> String {
    "~/.ssh/zp2key".to_string()
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig::new("nat", "nat_host_public_ip", "ec2-user").as_bastion(),
        RoleConfig::new("database", "database_private_ip", "ubuntu").via("nat"),
        RoleConfig::new("docker", "docker_host_public_ip", "ubuntu"),
    ]
}

impl Default for RoleSpec {
    fn default() -> Self {
        Self {
            ssh_key: default_ssh_key(),
            roles: default_roles(),
        }
    }
}

impl RoleSpec {
    /// Create a role spec from explicit roles
    pub fn new(ssh_key: impl Into<String>, roles: Vec<RoleConfig>) -> Self {
        Self {
            ssh_key: ssh_key.into(),
            roles,
        }
    }

    /// Look up a role by name
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleConfig> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Key path for a role
    #[must_use]
    pub fn key_for<'a>(&'a self, role: &'a RoleConfig) -> &'a str {
        role.ssh_key.as_deref().unwrap_or(&self.ssh_key)
    }

    /// Roles in construction order: direct roles first, then roles routed via a bastion
    ///
    /// Relative declaration order is kept within each tier.
    #[must_use]
    pub fn construction_order(&self) -> Vec<&RoleConfig> {
        let (direct, proxied): (Vec<&RoleConfig>, Vec<&RoleConfig>) =
            self.roles.iter().partition(|r| r.via.is_none());
        direct.into_iter().chain(proxied).collect()
    }

    /// Check the roles for structural problems
    ///
    /// # Errors
    /// - `InvalidRoleSpec` for empty, duplicate or reserved role names, an empty host name,
    ///   a user or key path unfit for an ssh command line, a role routed via
    ///   itself, via a role not marked as bastion, or via a bastion that is itself proxied
    /// - `UnresolvedBastion` when `via` names an undeclared role
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.roles.is_empty() {
            return Err(InventoryError::InvalidRoleSpec("no roles configured".to_string()));
        }

        let mut seen = HashSet::new();
        for role in &self.roles {
            if role.name.trim().is_empty() {
                return Err(InventoryError::InvalidRoleSpec("empty role name".to_string()));
            }
            if role.name == ALL_GROUP {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role name `{ALL_GROUP}` is reserved"
                )));
            }
            if !seen.insert(role.name.as_str()) {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "duplicate role `{}`",
                    role.name
                )));
            }
            if role.address_output.trim().is_empty() {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role `{}` has an empty address_output",
                    role.name
                )));
            }
            if role.host_name.as_deref().is_some_and(|h| h.trim().is_empty()) {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role `{}` has an empty host_name",
                    role.name
                )));
            }
            check_user(&role.user).map_err(|reason| {
                InventoryError::InvalidRoleSpec(format!("role `{}`: {reason}", role.name))
            })?;
            check_key_path(self.key_for(role)).map_err(|reason| {
                InventoryError::InvalidRoleSpec(format!("role `{}`: {reason}", role.name))
            })?;
        }

        for role in &self.roles {
            let Some(via) = &role.via else { continue };

            if via == &role.name {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role `{}` cannot route via itself",
                    role.name
                )));
            }
            let bastion = self
                .role(via)
                .ok_or_else(|| InventoryError::UnresolvedBastion(role.name.clone()))?;
            if !bastion.bastion {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role `{}` routes via `{via}`, which is not marked as a bastion",
                    role.name
                )));
            }
            if bastion.via.is_some() {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "role `{}` routes via `{via}`, which is itself proxied; chained bastions are not supported",
                    role.name
                )));
            }
        }

        Ok(())
    }
}
