use std::collections::BTreeMap;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use aurpack_core::RunAs;
use aurpack_upstream::{apply_identity, chown_to, run_command};
use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything `makepkg` needs to build one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub package_dir: PathBuf,
    pub identity: RunAs,
    pub environment: BTreeMap<String, String>,
    pub skip_pgp_check: bool,
}

/// Side effects of a source build. Every created file is handed to `owner`.
pub trait ActionExecutor {
    fn create_dir(&self, path: &Path, owner: &RunAs) -> Result<()>;

    /// Downloads `url` to `dest` unless `dest` already exists. Returns whether a download happened.
    fn download_if_missing(&self, url: &str, dest: &Path, owner: &RunAs) -> Result<bool>;

    fn extract_archive(&self, archive: &Path, dest_dir: &Path, owner: &RunAs) -> Result<()>;

    /// Copies `source` over `dest`, replacing any existing file.
    fn overlay_file(&self, source: &Path, dest: &Path, owner: &RunAs) -> Result<()>;

    /// Appends `suffix` to every line of `path` matching `pattern`.
    /// Returns whether the file changed.
    fn append_to_matching_lines(
        &self,
        path: &Path,
        pattern: &Regex,
        suffix: &str,
    ) -> Result<bool>;

    fn run_build(&self, request: &BuildRequest) -> Result<()>;
}

/// Local filesystem plus `tar` and `makepkg`.
#[derive(Debug, Clone)]
pub struct ShellActionExecutor {
    client: Client,
}

impl ShellActionExecutor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("aurpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build download HTTP client")?;
        Ok(Self { client })
    }
}

impl ActionExecutor for ShellActionExecutor {
    fn create_dir(&self, path: &Path, owner: &RunAs) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
        fs::set_permissions(path, fs::Permissions::from_mode(DIR_MODE))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
        chown_to(path, owner)
    }

    fn download_if_missing(&self, url: &str, dest: &Path, owner: &RunAs) -> Result<bool> {
        if dest.exists() {
            debug!("{} already present, skipping download", dest.display());
            return Ok(false);
        }

        debug!("downloading {url}");
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("failed to download {url}: status {status}"));
        }

        let partial = partial_download_path(dest);
        let mut file = File::create(&partial)
            .with_context(|| format!("failed to create {}", partial.display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("failed to write {}", partial.display()))?;
        drop(file);
        fs::rename(&partial, dest).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                partial.display(),
                dest.display()
            )
        })?;
        set_file_mode(dest)?;
        chown_to(dest, owner)?;
        Ok(true)
    }

    fn extract_archive(&self, archive: &Path, dest_dir: &Path, owner: &RunAs) -> Result<()> {
        let mut command = build_extract_command(archive, dest_dir);
        apply_identity(&mut command, owner)?;
        run_command(
            &mut command,
            &format!("failed to extract {}", archive.display()),
        )
    }

    fn overlay_file(&self, source: &Path, dest: &Path, owner: &RunAs) -> Result<()> {
        fs::copy(source, dest).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                dest.display()
            )
        })?;
        set_file_mode(dest)?;
        chown_to(dest, owner)
    }

    fn append_to_matching_lines(
        &self,
        path: &Path,
        pattern: &Regex,
        suffix: &str,
    ) -> Result<bool> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let Some(updated) = append_to_lines(&content, pattern, suffix) else {
            return Ok(false);
        };
        fs::write(path, updated).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(true)
    }

    fn run_build(&self, request: &BuildRequest) -> Result<()> {
        let mut command = build_makepkg_command(request);
        apply_identity(&mut command, &request.identity)?;
        run_command(
            &mut command,
            &format!("makepkg failed in {}", request.package_dir.display()),
        )
    }
}

fn set_file_mode(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

fn partial_download_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Rewrites `content` with `suffix` appended to each matching line. `None` when nothing matched.
pub(crate) fn append_to_lines(content: &str, pattern: &Regex, suffix: &str) -> Option<String> {
    let mut changed = false;
    let mut output = String::with_capacity(content.len() + suffix.len());
    for line in content.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        output.push_str(body);
        if pattern.is_match(body) {
            output.push(' ');
            output.push_str(suffix);
            changed = true;
        }
        output.push_str(newline);
    }
    changed.then_some(output)
}

pub(crate) fn build_extract_command(archive: &Path, dest_dir: &Path) -> Command {
    let mut command = Command::new("tar");
    command.arg("-xf").arg(archive).arg("-C").arg(dest_dir);
    command
}

pub(crate) fn build_makepkg_command(request: &BuildRequest) -> Command {
    let mut command = Command::new("makepkg");
    command.arg("-sf").arg("--noconfirm");
    if request.skip_pgp_check {
        command.arg("--skippgpcheck");
    }
    command
        .current_dir(&request.package_dir)
        .envs(&request.environment);
    command
}
