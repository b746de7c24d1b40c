//! Inventory builder
//!
//! Pure transformation from [`ProvisioningOutput`] and [`RoleSpec`] to an
//! [`InventoryDocument`]. The build is all-or-nothing: any missing or unusable output aborts
//! it, so a configuration-management run never sees an inventory silently missing a host.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::config::{RoleConfig, RoleSpec};
use crate::error::InventoryError;
use crate::outputs::ProvisioningOutput;
use crate::types::{Group, Host, InventoryDocument};
use crate::validate::{check_address, check_user};

/// Build the inventory document
///
/// Roles are resolved in two passes. The first looks up every role's outputs in
/// declaration order and constructs direct hosts. The second assigns connection paths in
/// construction order (bastion tiers before the roles that depend on them), routing each
/// proxied role through the first host of its bastion role.
///
/// # Errors
/// - `InvalidRoleSpec` / `UnresolvedBastion` for an inconsistent spec
/// - `MissingOutput` when a role's `address_output` is absent
/// - `InvalidOutput` when an address or user output is empty, not a string, or contains
///   characters that do not belong in an address or user name
#[instrument(skip_all, fields(roles = spec.roles.len(), outputs = outputs.len()))]
pub fn build_inventory(
    outputs: &ProvisioningOutput,
    spec: &RoleSpec,
) -> Result<InventoryDocument, InventoryError> {
    spec.validate()?;

    let mut unrouted: HashMap<&str, Vec<Host>> = HashMap::with_capacity(spec.roles.len());
    for role in &spec.roles {
        unrouted.insert(role.name.as_str(), role_hosts(outputs, spec, role)?);
    }

    let mut resolved: HashMap<&str, Vec<Host>> = HashMap::with_capacity(spec.roles.len());
    for role in spec.construction_order() {
        let hosts = unrouted.remove(role.name.as_str()).unwrap_or_default();
        let hosts = match &role.via {
            None => hosts,
            Some(via) => {
                let jump = resolved
                    .get(via.as_str())
                    .and_then(|bastions| bastions.first())
                    .ok_or_else(|| InventoryError::UnresolvedBastion(role.name.clone()))?;
                debug!(role = %role.name, bastion = %jump.id, "routing via bastion");
                hosts
                    .into_iter()
                    .map(|host| host.route_via(jump))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        resolved.insert(role.name.as_str(), hosts);
    }

    let groups = spec
        .roles
        .iter()
        .map(|role| Group {
            name: role.name.clone(),
            hosts: resolved.remove(role.name.as_str()).unwrap_or_default(),
        })
        .collect();

    let document = InventoryDocument::from_role_groups(groups)?;
    info!(
        hosts = document.all().len(),
        groups = document.groups().len(),
        "built inventory"
    );

    Ok(document)
}

/// Construct the direct hosts for one role
///
/// A scalar address yields one host named after the role. A list yields one host per
/// element, suffixed `_1`, `_2`, ... so identifiers stay stable as the list grows.
fn role_hosts(
    outputs: &ProvisioningOutput,
    spec: &RoleSpec,
    role: &RoleConfig,
) -> Result<Vec<Host>, InventoryError> {
    let key = &role.address_output;
    let value = outputs
        .get(key)
        .ok_or_else(|| InventoryError::missing(&role.name, key))?;
    let addresses = value
        .as_string_list()
        .map_err(|reason| InventoryError::invalid(&role.name, key, reason))?;
    for address in &addresses {
        check_address(address)
            .map_err(|reason| InventoryError::invalid(&role.name, key, reason))?;
    }

    let login_user = login_user(outputs, role)?;
    let credential_ref = spec.key_for(role);
    let base_id = role.host_id();

    let hosts = addresses
        .into_iter()
        .enumerate()
        .map(|(i, address)| {
            let id = if value.is_list() {
                format!("{base_id}_{}", i + 1)
            } else {
                base_id.clone()
            };
            if value.sensitive {
                debug!(role = %role.name, host = %id, "resolved host");
            } else {
                debug!(role = %role.name, host = %id, address = %address, "resolved host");
            }
            Host::direct(id, &role.name, address, &login_user, credential_ref)
        })
        .collect();

    Ok(hosts)
}

fn login_user(outputs: &ProvisioningOutput, role: &RoleConfig) -> Result<String, InventoryError> {
    let Some(key) = &role.user_output else {
        return Ok(role.user.clone());
    };

    match outputs.get(key) {
        Some(value) => value
            .as_scalar_string()
            .and_then(|user| check_user(&user).map(|()| user))
            .map_err(|reason| InventoryError::invalid(&role.name, key, reason)),
        None => {
            debug!(role = %role.name, output = %key, "user output absent, using default user");
            Ok(role.user.clone())
        }
    }
}
