use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{anyhow, Context, Result};
use aurpack_core::RunAs;
use nix::unistd::{chown, Gid, Group, Uid, User};

pub fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

/// Runs a query command; a non-zero exit is reported through `Output::status`, not as an error.
pub(crate) fn query_command(command: &mut Command, context_message: &str) -> Result<Output> {
    command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))
}

/// Numeric ids and home directory behind a [`RunAs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub uid: Option<Uid>,
    pub gid: Option<Gid>,
    pub user: Option<String>,
    pub home: Option<PathBuf>,
}

pub fn resolve_identity(identity: &RunAs) -> Result<ResolvedIdentity> {
    let mut resolved = ResolvedIdentity::default();
    if let Some(user) = &identity.user {
        let entry = User::from_name(user)
            .with_context(|| format!("failed to look up user '{user}'"))?
            .ok_or_else(|| anyhow!("unknown user '{user}'"))?;
        resolved.uid = Some(entry.uid);
        resolved.gid = Some(entry.gid);
        resolved.user = Some(entry.name);
        resolved.home = Some(entry.dir);
    }
    if let Some(group) = &identity.group {
        let entry = Group::from_name(group)
            .with_context(|| format!("failed to look up group '{group}'"))?
            .ok_or_else(|| anyhow!("unknown group '{group}'"))?;
        resolved.gid = Some(entry.gid);
    }
    Ok(resolved)
}

/// Switches the spawned process to the configured user and group.
pub fn apply_identity(command: &mut Command, identity: &RunAs) -> Result<()> {
    let resolved = resolve_identity(identity)?;
    if let Some(uid) = resolved.uid {
        command.uid(uid.as_raw());
    }
    if let Some(gid) = resolved.gid {
        command.gid(gid.as_raw());
    }
    if let (Some(user), Some(home)) = (&resolved.user, &resolved.home) {
        command.env("HOME", home).env("USER", user);
    }
    Ok(())
}

/// Hands `path` to the configured owner. No-op when the identity is inherited.
pub fn chown_to(path: &Path, identity: &RunAs) -> Result<()> {
    if identity.is_inherited() {
        return Ok(());
    }
    let resolved = resolve_identity(identity)?;
    chown(path, resolved.uid, resolved.gid)
        .with_context(|| format!("failed to change owner of {}", path.display()))
}
