use anyhow::Result;
use aurpack_core::PackageGroups;
use tracing::{debug, info};

use crate::orchestrator::SyncOutcome;

/// Installs `group` through the package manager unless it is already present.
pub fn install_group(
    groups: &dyn PackageGroups,
    group: &str,
    options: &[String],
) -> Result<SyncOutcome> {
    if groups.group_installed(group)? {
        debug!("group {group} already installed");
        return Ok(SyncOutcome::unchanged());
    }
    info!("installing group {group}");
    groups.install_group(group, options)?;
    Ok(SyncOutcome {
        changed: true,
        packages: vec![group.to_string()],
    })
}

/// Removes `group` when it is installed.
pub fn remove_group(
    groups: &dyn PackageGroups,
    group: &str,
    options: &[String],
) -> Result<SyncOutcome> {
    if !groups.group_installed(group)? {
        debug!("group {group} not installed");
        return Ok(SyncOutcome::unchanged());
    }
    info!("removing group {group}");
    groups.remove_group(group, options)?;
    Ok(SyncOutcome {
        changed: true,
        packages: vec![group.to_string()],
    })
}
