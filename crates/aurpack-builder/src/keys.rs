use std::process::Command;

use anyhow::Result;
use aurpack_core::RunAs;
use aurpack_upstream::{apply_identity, run_command};
use tracing::debug;

/// Imports signing keys into the keyring of the user that runs builds.
pub trait KeyImporter {
    fn import_keys(&self, keys: &[String], identity: &RunAs) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GpgKeyImporter;

impl KeyImporter for GpgKeyImporter {
    fn import_keys(&self, keys: &[String], identity: &RunAs) -> Result<()> {
        for key in keys {
            debug!("importing pgp key {key}");
            let mut command = build_key_import_command(key);
            apply_identity(&mut command, identity)?;
            run_command(&mut command, &format!("failed to import pgp key {key}"))?;
        }
        Ok(())
    }
}

pub(crate) fn build_key_import_command(key: &str) -> Command {
    let mut command = Command::new("gpg");
    command.arg("--recv-keys").arg(key);
    command
}
