//! Ansible inventory rendering
//!
//! Produces the standard YAML (or JSON) inventory layout:
//!
//! ```yaml
//! all:
//!   hosts:
//!     nat_host:
//!       ansible_host: 3.3.3.3
//!       ansible_user: ec2-user
//!       ansible_connection: ssh
//!       ansible_ssh_private_key_file: ~/.ssh/zp2key
//!       ansible_ssh_common_args: -o StrictHostKeyChecking=no
//! ```

use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::InventoryError;
use crate::types::{Group, Host, InventoryDocument};

/// Connection transport written for every host
pub const SSH_CONNECTION: &str = "ssh";

const NO_HOST_KEY_CHECK: &str = "-o StrictHostKeyChecking=no";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryFormat {
    /// YAML inventory
    #[default]
    Yaml,
    /// JSON inventory
    Json,
}

impl FromStr for InventoryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(InventoryFormat::Yaml),
            "json" => Ok(InventoryFormat::Json),
            other => Err(format!("unknown inventory format `{other}` (expected yaml or json)")),
        }
    }
}

impl fmt::Display for InventoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryFormat::Yaml => write!(f, "yaml"),
            InventoryFormat::Json => write!(f, "json"),
        }
    }
}

/// Rendering switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Verify SSH host keys
    ///
    /// Off by default: freshly provisioned hosts have unknown keys. Turning it on removes
    /// `StrictHostKeyChecking=no` from both direct and proxied connections.
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

/// Per-host Ansible connection variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionParams {
    /// Address Ansible connects to
    pub ansible_host: String,
    /// Login user
    pub ansible_user: String,
    /// Transport, always `ssh`
    pub ansible_connection: String,
    /// Private key path
    pub ansible_ssh_private_key_file: String,
    /// Extra ssh options: host-key checking and the jump-host proxy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_ssh_common_args: Option<String>,
}

impl ConnectionParams {
    /// Derive connection variables for a host
    #[must_use]
    pub fn for_host(host: &Host, options: RenderOptions) -> Self {
        let mut args = Vec::new();
        if !options.strict_host_key_checking {
            args.push(NO_HOST_KEY_CHECK.to_string());
        }
        if let Some(jump) = host.jump_host() {
            args.push(format!("-o ProxyCommand='{}'", proxy_command(jump, options)));
        }

        Self {
            ansible_host: host.address.clone(),
            ansible_user: host.login_user.clone(),
            ansible_connection: SSH_CONNECTION.to_string(),
            ansible_ssh_private_key_file: host.credential_ref.clone(),
            ansible_ssh_common_args: (!args.is_empty()).then(|| args.join(" ")),
        }
    }

    /// The proxy command embedded in the common args, if any
    #[must_use]
    pub fn proxy_command(&self) -> Option<&str> {
        let args = self.ansible_ssh_common_args.as_deref()?;
        let start = args.find("ProxyCommand='")? + "ProxyCommand='".len();
        let len = args[start..].find('\'')?;
        Some(&args[start..start + len])
    }
}

/// `ssh -W` forwarding command through `jump` to the target's `%h:%p`
#[must_use]
pub fn proxy_command(jump: &Host, options: RenderOptions) -> String {
    let mut cmd = String::from("ssh -W %h:%p -q");
    if !options.strict_host_key_checking {
        cmd.push(' ');
        cmd.push_str(NO_HOST_KEY_CHECK);
    }
    cmd.push_str(&format!(
        " -i {} {}@{}",
        jump.credential_ref, jump.login_user, jump.address
    ));
    cmd
}

/// Render the document in the requested format
///
/// # Errors
/// Returns `Render` if serialization fails.
pub fn render(
    document: &InventoryDocument,
    format: InventoryFormat,
    options: RenderOptions,
) -> Result<String, InventoryError> {
    let view = DocumentView { document, options };
    match format {
        InventoryFormat::Yaml => {
            serde_yaml::to_string(&view).map_err(|e| InventoryError::Render(e.to_string()))
        }
        InventoryFormat::Json => serde_json::to_string_pretty(&view)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| InventoryError::Render(e.to_string())),
    }
}

struct DocumentView<'a> {
    document: &'a InventoryDocument,
    options: RenderOptions,
}

impl Serialize for DocumentView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let groups = self.document.groups();
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for group in groups {
            map.serialize_entry(
                &group.name,
                &GroupView {
                    group,
                    options: self.options,
                },
            )?;
        }
        map.end()
    }
}

struct GroupView<'a> {
    group: &'a Group,
    options: RenderOptions,
}

impl Serialize for GroupView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Group", 1)?;
        s.serialize_field(
            "hosts",
            &HostsView {
                hosts: &self.group.hosts,
                options: self.options,
            },
        )?;
        s.end()
    }
}

struct HostsView<'a> {
    hosts: &'a [Host],
    options: RenderOptions,
}

impl Serialize for HostsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.hosts.len()))?;
        for host in self.hosts {
            map.serialize_entry(&host.id, &ConnectionParams::for_host(host, self.options))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nat() -> Host {
        Host::direct("nat_host", "nat", "3.3.3.3", "ec2-user", "~/.ssh/zp2key")
    }

    fn database() -> Host {
        Host::direct("database_host", "database", "10.0.1.5", "ubuntu", "~/.ssh/zp2key")
            .route_via(&nat())
            .unwrap()
    }

    fn document() -> InventoryDocument {
        let mut nat_group = Group::new("nat");
        nat_group.hosts.push(nat());
        let mut db_group = Group::new("database");
        db_group.hosts.push(database());
        InventoryDocument::from_role_groups(vec![nat_group, db_group]).unwrap()
    }

    #[test]
    fn test_direct_host_params() {
        let params = ConnectionParams::for_host(&nat(), RenderOptions::default());

        assert_eq!(params.ansible_host, "3.3.3.3");
        assert_eq!(params.ansible_user, "ec2-user");
        assert_eq!(params.ansible_connection, "ssh");
        assert_eq!(params.ansible_ssh_private_key_file, "~/.ssh/zp2key");
        assert_eq!(
            params.ansible_ssh_common_args.as_deref(),
            Some("-o StrictHostKeyChecking=no")
        );
        assert_eq!(params.proxy_command(), None);
    }

    #[test]
    fn test_proxied_host_params() {
        let params = ConnectionParams::for_host(&database(), RenderOptions::default());

        assert_eq!(params.ansible_host, "10.0.1.5");
        assert_eq!(
            params.proxy_command(),
            Some("ssh -W %h:%p -q -o StrictHostKeyChecking=no -i ~/.ssh/zp2key ec2-user@3.3.3.3")
        );
    }

    #[test]
    fn test_strict_host_key_checking() {
        let options = RenderOptions {
            strict_host_key_checking: true,
        };

        let direct = ConnectionParams::for_host(&nat(), options);
        assert_eq!(direct.ansible_ssh_common_args, None);

        let proxied = ConnectionParams::for_host(&database(), options);
        assert_eq!(
            proxied.ansible_ssh_common_args.as_deref(),
            Some("-o ProxyCommand='ssh -W %h:%p -q -i ~/.ssh/zp2key ec2-user@3.3.3.3'")
        );
    }

    #[test]
    fn test_render_yaml_layout() {
        let text = render(&document(), InventoryFormat::Yaml, RenderOptions::default()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

        let groups: Vec<&str> = parsed
            .as_mapping()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().unwrap())
            .collect();
        assert_eq!(groups, vec!["all", "nat", "database"]);

        let db = &parsed["database"]["hosts"]["database_host"];
        assert_eq!(db["ansible_host"].as_str(), Some("10.0.1.5"));
        assert!(
            db["ansible_ssh_common_args"]
                .as_str()
                .unwrap()
                .contains("ec2-user@3.3.3.3")
        );
        assert_eq!(parsed["all"]["hosts"]["database_host"], *db);
    }

    #[test]
    fn test_render_json_layout() {
        let text = render(&document(), InventoryFormat::Json, RenderOptions::default()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed["nat"]["hosts"]["nat_host"]["ansible_connection"], "ssh");
        assert_eq!(parsed["all"]["hosts"].as_object().unwrap().len(), 2);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_render_is_byte_stable() {
        let first = render(&document(), InventoryFormat::Yaml, RenderOptions::default()).unwrap();
        let second = render(&document(), InventoryFormat::Yaml, RenderOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("YAML".parse::<InventoryFormat>(), Ok(InventoryFormat::Yaml));
        assert_eq!("yml".parse::<InventoryFormat>(), Ok(InventoryFormat::Yaml));
        assert_eq!("json".parse::<InventoryFormat>(), Ok(InventoryFormat::Json));
        assert!("ini".parse::<InventoryFormat>().is_err());
    }
}
