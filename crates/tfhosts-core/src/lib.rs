//! tfhosts-core: Provisioning outputs to host inventory
//!
//! Reads the provisioning tool's exported outputs, builds a grouped host inventory with
//! jump-host routing from a declarative [`RoleSpec`], and renders it for Ansible.

pub mod builder;
pub mod config;
pub mod error;
pub mod outputs;
pub mod render;
pub mod types;
pub mod validate;
pub mod writer;

pub use builder::build_inventory;
pub use config::{RoleConfig, RoleSpec};
pub use error::InventoryError;
pub use outputs::{OutputReader, OutputValue, ProvisioningOutput};
pub use render::{ConnectionParams, InventoryFormat, RenderOptions, render};
pub use types::{ALL_GROUP, ConnectionPath, Group, Host, InventoryDocument};
pub use writer::write_inventory;
