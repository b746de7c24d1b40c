//! Inventory data model

use std::collections::HashSet;

use crate::error::InventoryError;

/// Name of the synthetic group containing every host
pub const ALL_GROUP: &str = "all";

/// How a host is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionPath {
    /// Connect to the host's address directly
    Direct,
    /// Tunnel through a directly reachable jump host
    Via(Box<Host>),
}

/// A single manageable machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Unique host identifier
    pub id: String,
    /// Role this host was built from
    pub role: String,
    /// Reachability address
    pub address: String,
    /// OS login account
    pub login_user: String,
    /// Path of the private key, never the key itself
    pub credential_ref: String,
    /// Computed connection path
    pub connection_path: ConnectionPath,
}

impl Host {
    /// Create a directly reachable host
    pub fn direct(
        id: impl Into<String>,
        role: impl Into<String>,
        address: impl Into<String>,
        login_user: impl Into<String>,
        credential_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            address: address.into(),
            login_user: login_user.into(),
            credential_ref: credential_ref.into(),
            connection_path: ConnectionPath::Direct,
        }
    }

    /// Route this host through `jump`
    ///
    /// # Errors
    /// Returns `InvalidRoleSpec` if `jump` is itself proxied.
    pub fn route_via(mut self, jump: &Host) -> Result<Self, InventoryError> {
        if !jump.is_direct() {
            return Err(InventoryError::InvalidRoleSpec(format!(
                "host `{}` cannot use `{}` as jump host: it is not directly reachable",
                self.id, jump.id
            )));
        }
        self.connection_path = ConnectionPath::Via(Box::new(jump.clone()));
        Ok(self)
    }

    /// Whether the host is reached without a jump host
    #[must_use]
    pub fn is_direct(&self) -> bool {
        matches!(self.connection_path, ConnectionPath::Direct)
    }

    /// The jump host, if any
    #[must_use]
    pub fn jump_host(&self) -> Option<&Host> {
        match &self.connection_path {
            ConnectionPath::Direct => None,
            ConnectionPath::Via(jump) => Some(jump),
        }
    }
}

/// A named set of hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Members in insertion order
    pub hosts: Vec<Host>,
}

impl Group {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: Vec::new(),
        }
    }

    /// Look up a member by id
    #[must_use]
    pub fn host(&self, id: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.id == id)
    }

    /// Member identifiers in order
    pub fn host_ids(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|h| h.id.as_str())
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the group has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Root inventory structure: the `all` group followed by role groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDocument {
    groups: Vec<Group>,
}

impl InventoryDocument {
    /// Assemble a document from role groups, synthesizing `all` as their union
    ///
    /// # Errors
    /// Returns `InvalidRoleSpec` if a group is named `all`, group names repeat, or a host
    /// identifier appears more than once.
    pub fn from_role_groups(role_groups: Vec<Group>) -> Result<Self, InventoryError> {
        let mut all = Group::new(ALL_GROUP);
        let mut group_names = HashSet::new();
        let mut host_ids = HashSet::new();

        for group in &role_groups {
            if group.name == ALL_GROUP || !group_names.insert(group.name.as_str()) {
                return Err(InventoryError::InvalidRoleSpec(format!(
                    "duplicate group `{}`",
                    group.name
                )));
            }
            for host in &group.hosts {
                if !host_ids.insert(host.id.as_str()) {
                    return Err(InventoryError::InvalidRoleSpec(format!(
                        "duplicate host identifier `{}`",
                        host.id
                    )));
                }
                all.hosts.push(host.clone());
            }
        }

        let mut groups = Vec::with_capacity(role_groups.len() + 1);
        groups.push(all);
        groups.extend(role_groups);
        Ok(Self { groups })
    }

    /// All groups, `all` first
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a group by name
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// The `all` group
    #[must_use]
    pub fn all(&self) -> &Group {
        &self.groups[0]
    }

    /// Look up a host by id
    #[must_use]
    pub fn host(&self, id: &str) -> Option<&Host> {
        self.all().host(id)
    }

    /// Group names in document order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}
