use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use aurpack_core::{parse_package_release, PackageDatabase, PackageGroups, PackageRelease, RunAs};
use tracing::debug;

use crate::process::{apply_identity, query_command, run_command};

const PACMAN: &str = "pacman";

/// `pacman` command-line client. Queries run as the caller, installs as `install_identity`.
#[derive(Debug, Clone, Default)]
pub struct Pacman {
    install_identity: RunAs,
}

impl Pacman {
    pub fn new(install_identity: RunAs) -> Self {
        Self { install_identity }
    }

    fn query_release(&self, flag: &str, name: &str) -> Result<Option<PackageRelease>> {
        let mut command = build_info_command(flag, name);
        let output = query_command(&mut command, &format!("pacman {flag} '{name}'"))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.trim().is_empty() {
            return Ok(None);
        }

        parse_package_release(&stdout)
            .map(Some)
            .ok_or_else(|| anyhow!("unrecognized pacman {flag} output for '{name}'"))
    }

    fn run_privileged(&self, mut command: Command, context_message: &str) -> Result<()> {
        apply_identity(&mut command, &self.install_identity)
            .with_context(|| format!("{context_message}: failed to switch identity"))?;
        run_command(&mut command, context_message)
    }
}

impl PackageDatabase for Pacman {
    fn query_remote(&self, name: &str) -> Result<Option<PackageRelease>> {
        self.query_release("-Si", name)
    }

    fn query_installed(&self, name: &str) -> Result<Option<PackageRelease>> {
        debug!("checking pacman for {name}");
        self.query_release("-Qi", name)
    }

    fn search_providers(&self, pattern: &str) -> Result<Vec<String>> {
        let mut command = build_provider_search_command(pattern);
        let output = query_command(&mut command, &format!("pacman -Ssq '{pattern}'"))?;
        // pacman exits non-zero when nothing matches.
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(parse_name_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn install_remote(&self, names: &[&str]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.run_privileged(
            build_remote_install_command(names),
            &format!("failed to install {} with pacman", names.join(" ")),
        )
    }

    fn install_local_file(&self, path: &Path) -> Result<()> {
        self.run_privileged(
            build_local_install_command(path),
            &format!("failed to install {} with pacman", path.display()),
        )
    }
}

impl PackageGroups for Pacman {
    fn group_installed(&self, group: &str) -> Result<bool> {
        debug!("checking pacman for group {group}");
        let mut command = build_group_query_command(group);
        let output = query_command(&mut command, &format!("pacman -Qg '{group}'"))?;
        if !output.status.success() {
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .any(|line| line.split_whitespace().next() == Some(group)))
    }

    fn install_group(&self, group: &str, options: &[String]) -> Result<()> {
        self.run_privileged(
            build_group_command("--sync", group, options),
            &format!("failed to install package group {group}"),
        )
    }

    fn remove_group(&self, group: &str, options: &[String]) -> Result<()> {
        self.run_privileged(
            build_group_command("--remove", group, options),
            &format!("failed to remove package group {group}"),
        )
    }
}

fn base_pacman_command() -> Command {
    let mut command = Command::new(PACMAN);
    command.env("LC_ALL", "C");
    command
}

pub(crate) fn build_info_command(flag: &str, name: &str) -> Command {
    let mut command = base_pacman_command();
    command.arg(flag).arg(name);
    command
}

pub(crate) fn build_provider_search_command(pattern: &str) -> Command {
    let mut command = base_pacman_command();
    command.arg("-Ssq").arg(pattern);
    command
}

pub(crate) fn build_remote_install_command(names: &[&str]) -> Command {
    let mut command = base_pacman_command();
    command
        .arg("-S")
        .arg("--noconfirm")
        .arg("--noprogressbar")
        .arg("--needed")
        .args(names);
    command
}

pub(crate) fn build_local_install_command(path: &Path) -> Command {
    let mut command = base_pacman_command();
    command
        .arg("-U")
        .arg("--noconfirm")
        .arg("--noprogressbar")
        .arg(path);
    command
}

pub(crate) fn build_group_query_command(group: &str) -> Command {
    let mut command = base_pacman_command();
    command.arg("-Qg").arg(group);
    command
}

pub(crate) fn build_group_command(action: &str, group: &str, options: &[String]) -> Command {
    let mut command = base_pacman_command();
    command
        .arg(action)
        .arg("--noconfirm")
        .arg("--noprogressbar")
        .args(options)
        .arg(group);
    command
}

pub(crate) fn parse_name_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}
