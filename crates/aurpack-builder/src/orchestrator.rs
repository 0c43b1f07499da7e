use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;
use aurpack_core::{AurError, Origin, PackageNode, SyncOptions};
use aurpack_resolver::{plan_from_root, PackageInfoSource};
use regex::Regex;
use tracing::{debug, info};

use crate::actions::{ActionExecutor, BuildRequest};
use crate::keys::KeyImporter;
use crate::layout::BuildLayout;

/// Result of one orchestration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub changed: bool,
    /// Packages built or installed, in the order the work happened.
    pub packages: Vec<String>,
}

impl SyncOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str) {
        self.changed = true;
        if !self.packages.iter().any(|existing| existing == name) {
            self.packages.push(name.to_string());
        }
    }
}

/// Lines invoking `./configure` with at least one argument.
pub(crate) fn configure_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"./configure.+$").expect("valid regex"))
}

/// Walks a resolved plan and builds or installs whatever is not satisfied yet.
pub struct BuildOrchestrator<'a> {
    source: &'a PackageInfoSource<'a>,
    executor: &'a dyn ActionExecutor,
    keys: &'a dyn KeyImporter,
    options: &'a SyncOptions,
    layout: BuildLayout,
    keys_imported: Cell<bool>,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        source: &'a PackageInfoSource<'a>,
        executor: &'a dyn ActionExecutor,
        keys: &'a dyn KeyImporter,
        options: &'a SyncOptions,
    ) -> Self {
        Self {
            source,
            executor,
            keys,
            options,
            layout: BuildLayout::new(&options.build_dir, options.package_extension),
            keys_imported: Cell::new(false),
        }
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Builds `name` from its recipe unless an artifact is already on disk.
    pub fn build(&self, name: &str) -> Result<SyncOutcome> {
        let node = self.source.node(name, Origin::SourceBuild)?;
        let mut outcome = SyncOutcome::unchanged();
        if let Some(artifact) = self.layout.find_artifact(&node)? {
            debug!("{node} already built at {}", artifact.display());
            return Ok(outcome);
        }
        self.build_package(&node)?;
        outcome.record(&node.name);
        Ok(outcome)
    }

    /// Installs the existing artifact of `name` unless that version is installed.
    pub fn install(&self, name: &str) -> Result<SyncOutcome> {
        let node = self.source.node(name, Origin::SourceBuild)?;
        let mut outcome = SyncOutcome::unchanged();
        if node.already_installed() {
            debug!("{node} already installed");
            return Ok(outcome);
        }
        let artifact = self.layout.find_artifact(&node)?.ok_or_else(|| AurError::Install {
            name: node.name.clone(),
            reason: format!(
                "no built artifact under {}",
                self.layout.package_dir(&node.name).display()
            ),
        })?;
        self.install_artifact(&node, &artifact)?;
        outcome.record(&node.name);
        Ok(outcome)
    }

    /// Resolves `name` with its dependency closure and brings every node up to date.
    pub fn ensure_installed(&self, name: &str) -> Result<SyncOutcome> {
        let mut outcome = SyncOutcome::unchanged();
        let root = self.source.node(name, Origin::SourceBuild)?;
        if root.already_installed() {
            info!("{name} {} is up to date", root.version);
            return Ok(outcome);
        }

        let plan = plan_from_root(self.source, root)?;
        info!("resolved {} package(s) for {name}", plan.graph.len());

        for node in plan.ordered() {
            if node.already_installed() {
                debug!("{node} already installed, skipping");
                continue;
            }
            match node.origin {
                Origin::PackageManager => {
                    self.install_from_repository(node)?;
                    outcome.record(&node.name);
                }
                Origin::SourceBuild => {
                    let artifact = match self.layout.find_artifact(node)? {
                        Some(artifact) => {
                            debug!("{node} already built at {}", artifact.display());
                            artifact
                        }
                        None => self.build_package(node)?,
                    };
                    self.install_artifact(node, &artifact)?;
                    outcome.record(&node.name);
                }
            }
        }

        Ok(outcome)
    }

    fn import_keys_once(&self) -> Result<()> {
        if self.keys_imported.get() || self.options.pgp_keys.is_empty() {
            return Ok(());
        }
        self.keys
            .import_keys(&self.options.pgp_keys, &self.options.build_identity())?;
        self.keys_imported.set(true);
        Ok(())
    }

    /// Runs every build step for `node` and returns the artifact it produced.
    fn build_package(&self, node: &PackageNode) -> Result<PathBuf> {
        info!("building {node}");
        self.run_build_steps(node).map_err(|err| AurError::Build {
            name: node.name.clone(),
            reason: format!("{err:#}"),
        })?;

        self.layout.find_artifact(node)?.ok_or_else(|| {
            AurError::Build {
                name: node.name.clone(),
                reason: format!(
                    "build produced no artifact at {}",
                    self.layout.expected_artifact_path(node).display()
                ),
            }
            .into()
        })
    }

    fn run_build_steps(&self, node: &PackageNode) -> Result<()> {
        self.import_keys_once()?;

        let owner = self.options.build_identity();
        let build_dir = self.layout.build_dir();
        self.executor.create_dir(build_dir, &owner)?;

        let archive = self.layout.snapshot_archive_path(&node.name);
        let url = self.source.host().snapshot_url(&node.name);
        if self.executor.download_if_missing(&url, &archive, &owner)? {
            debug!("downloaded {url}");
        }
        self.executor.extract_archive(&archive, build_dir, &owner)?;

        let package_dir = self.layout.package_dir(&node.name);
        if let Some(recipe) = self.options.recipe_override(&node.name) {
            debug!("overlaying recipe {} for {}", recipe.display(), node.name);
            self.executor
                .overlay_file(recipe, &self.layout.recipe_path(&node.name), &owner)?;
        }
        for patch in self.options.patches_for(&node.name) {
            let Some(file_name) = patch.file_name() else {
                continue;
            };
            self.executor
                .overlay_file(patch, &package_dir.join(file_name), &owner)?;
        }
        if let Some(flags) = self.options.configure_flags.as_deref() {
            let changed = self.executor.append_to_matching_lines(
                &self.layout.recipe_path(&node.name),
                configure_line_pattern(),
                flags,
            )?;
            debug!("configure flags applied to {}: {changed}", node.name);
        }

        self.executor.run_build(&BuildRequest {
            package_dir,
            identity: owner,
            environment: self.options.environment.clone(),
            skip_pgp_check: self.options.skip_pgp_check,
        })
    }

    fn install_artifact(&self, node: &PackageNode, artifact: &Path) -> Result<()> {
        info!("installing {node} from {}", artifact.display());
        self.source
            .database()
            .install_local_file(artifact)
            .map_err(|err| install_failure(node, err))
    }

    fn install_from_repository(&self, node: &PackageNode) -> Result<()> {
        info!("installing {node} from the package repositories");
        self.source
            .database()
            .install_remote(&[node.name.as_str()])
            .map_err(|err| install_failure(node, err))
    }
}

fn install_failure(node: &PackageNode, err: anyhow::Error) -> anyhow::Error {
    AurError::Install {
        name: node.name.clone(),
        reason: format!("{err:#}"),
    }
    .into()
}
