use anyhow::Result;
use aurpack_core::{
    default_arch, parse_recipe_probe_output, AurError, Origin, PackageDatabase, PackageInfo,
    PackageNode, PackageRelease, RecipeEvaluator, RecipeHost,
};
use tracing::debug;

/// Read-only view over the package database and the recipe host.
pub struct PackageInfoSource<'a> {
    database: &'a dyn PackageDatabase,
    host: &'a dyn RecipeHost,
    evaluator: &'a dyn RecipeEvaluator,
    default_arch: String,
}

impl<'a> PackageInfoSource<'a> {
    pub fn new(
        database: &'a dyn PackageDatabase,
        host: &'a dyn RecipeHost,
        evaluator: &'a dyn RecipeEvaluator,
    ) -> Self {
        Self {
            database,
            host,
            evaluator,
            default_arch: default_arch().to_string(),
        }
    }

    /// Architecture substituted for every recipe arch other than `any`.
    pub fn with_default_arch(mut self, arch: impl Into<String>) -> Self {
        self.default_arch = arch.into();
        self
    }

    pub fn database(&self) -> &'a dyn PackageDatabase {
        self.database
    }

    pub fn host(&self) -> &'a dyn RecipeHost {
        self.host
    }

    pub fn fetch_latest_info(&self, name: &str, origin: Origin) -> Result<PackageInfo> {
        match origin {
            Origin::PackageManager => {
                let release = self
                    .database
                    .query_remote(name)
                    .map_err(|err| query_failure(name, err))?
                    .ok_or_else(|| AurError::Resolution {
                        name: name.to_string(),
                        reason: "not found in the package manager".to_string(),
                    })?;
                Ok(PackageInfo {
                    version: release.version,
                    arch: release.arch,
                    dependencies: Vec::new(),
                })
            }
            Origin::SourceBuild => {
                let recipe =
                    self.host
                        .fetch_recipe(name)?
                        .ok_or_else(|| AurError::Resolution {
                            name: name.to_string(),
                            reason: "recipe host has no recipe for this package".to_string(),
                        })?;
                let output = self.evaluator.evaluate(name, &recipe)?;
                parse_recipe_probe_output(&output, &self.default_arch).map_err(|err| {
                    AurError::RecipeEvaluation {
                        name: name.to_string(),
                        reason: format!("{err:#}"),
                    }
                    .into()
                })
            }
        }
    }

    /// Installed version, or `None` when the package is not installed.
    pub fn installed_info(&self, name: &str) -> Result<Option<PackageRelease>> {
        self.database
            .query_installed(name)
            .map_err(|err| query_failure(name, err))
    }

    /// Fetches metadata and the installed snapshot and builds the node.
    pub fn node(&self, name: &str, origin: Origin) -> Result<PackageNode> {
        let info = self.fetch_latest_info(name, origin)?;
        let installed = self.installed_info(name)?;
        let node = PackageNode::new(name, origin, info, installed);
        debug!("resolved {node}");
        Ok(node)
    }
}

pub(crate) fn query_failure(name: &str, err: anyhow::Error) -> anyhow::Error {
    AurError::Resolution {
        name: name.to_string(),
        reason: format!("package manager query failed: {err:#}"),
    }
    .into()
}
