//! Configuration loading and types

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use tfhosts_core::writer::DEFAULT_INVENTORY_PATH;
use tfhosts_core::{InventoryFormat, RenderOptions, RoleConfig, RoleSpec};
use tfhosts_exec::CommandSpec;

/// Top-level configuration, read from `tfhosts.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Provisioning tool invocation
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
    /// Inventory output settings
    #[serde(default)]
    pub inventory: InventoryConfig,
    /// Host roles
    #[serde(default = "default_roles", rename = "role")]
    pub roles: Vec<RoleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provisioner: ProvisionerConfig::default(),
            inventory: InventoryConfig::default(),
            roles: default_roles(),
        }
    }
}

fn default_roles() -> Vec<RoleConfig> {
    RoleSpec::default().roles
}

/// How to run the provisioning tool's output export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Program to run
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments requesting JSON output
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Directory holding the provisioning state
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Seconds to wait before killing the command
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            working_dir: None,
            timeout_secs: default_timeout_secs(),
            env: BTreeMap::new(),
        }
    }
}

fn default_command() -> String {
    "terraform".to_string()
}

fn default_args() -> Vec<String> {
    vec!["output".to_string(), "-json".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProvisionerConfig {
    /// Command to hand to the executor
    #[must_use]
    pub fn command_spec(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.command).args(self.args.iter().cloned());
        if let Some(dir) = &self.working_dir {
            spec = spec.current_dir(dir);
        }
        for (key, value) in &self.env {
            spec = spec.env(key, value);
        }
        spec
    }

    /// Bounded wait for the command
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Inventory output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Destination file, overwritten on every run
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Output format
    #[serde(default)]
    pub format: InventoryFormat,
    /// Private key for roles without their own
    #[serde(default = "default_ssh_key")]
    pub ssh_key: String,
    /// Verify SSH host keys instead of disabling the check
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: InventoryFormat::default(),
            ssh_key: default_ssh_key(),
            strict_host_key_checking: false,
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_INVENTORY_PATH)
}

fn default_ssh_key() -> String {
    RoleSpec::default().ssh_key
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load an explicit path, or the first config found in the default locations
    ///
    /// Falls back to built-in defaults when no file exists.
    ///
    /// # Errors
    /// Returns error if a selected file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let mut paths = vec![PathBuf::from("tfhosts.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tfhosts/tfhosts.toml"));
        }

        for path in paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }

    /// Role spec described by this configuration
    #[must_use]
    pub fn role_spec(&self) -> RoleSpec {
        RoleSpec::new(self.inventory.ssh_key.clone(), self.roles.clone())
    }

    /// Rendering switches
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            strict_host_key_checking: self.inventory.strict_host_key_checking,
        }
    }
}
