//! Inventory file output

use std::path::Path;

use tracing::{info, instrument};

use crate::error::InventoryError;
use crate::render::{InventoryFormat, RenderOptions, render};
use crate::types::InventoryDocument;

/// Default inventory path, relative to the working directory
pub const DEFAULT_INVENTORY_PATH: &str = "inventory.yml";

/// Render the document and write it to `path`, replacing any existing file
///
/// Rendering happens before the file is touched, so a render failure leaves an existing
/// inventory in place.
///
/// # Errors
/// - `Render` if serialization fails
/// - `WriteFailure` if the file cannot be written
#[instrument(skip(document, options), fields(path = %path.display()))]
pub fn write_inventory(
    document: &InventoryDocument,
    path: &Path,
    format: InventoryFormat,
    options: RenderOptions,
) -> Result<(), InventoryError> {
    let text = render(document, format, options)?;

    std::fs::write(path, text.as_bytes()).map_err(|e| InventoryError::WriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(hosts = document.all().len(), bytes = text.len(), "inventory written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Group, Host};

    fn document() -> InventoryDocument {
        let mut docker = Group::new("docker");
        docker.hosts.push(Host::direct(
            "docker_host",
            "docker",
            "3.3.3.4",
            "ubuntu",
            "~/.ssh/zp2key",
        ));
        InventoryDocument::from_role_groups(vec![docker]).unwrap()
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.yml");
        std::fs::write(&path, "stale: true\n").unwrap();

        write_inventory(&document(), &path, InventoryFormat::Yaml, RenderOptions::default())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.contains("docker_host"));
    }

    #[test]
    fn test_unwritable_path_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("inventory.yml");

        let err = write_inventory(&document(), &path, InventoryFormat::Yaml, RenderOptions::default())
            .unwrap_err();
        assert!(matches!(err, InventoryError::WriteFailure { path: p, .. } if p == path));
    }
}
