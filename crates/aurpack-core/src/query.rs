use std::path::Path;

use anyhow::Result;

use crate::node::PackageRelease;

/// System package manager: local database queries plus install operations.
pub trait PackageDatabase {
    /// Latest version available from the configured repositories.
    fn query_remote(&self, name: &str) -> Result<Option<PackageRelease>>;

    /// Installed version, `None` when the package is not installed.
    fn query_installed(&self, name: &str) -> Result<Option<PackageRelease>>;

    /// Package names matching `pattern`, in the order the index reports them.
    fn search_providers(&self, pattern: &str) -> Result<Vec<String>>;

    fn install_remote(&self, names: &[&str]) -> Result<()>;

    fn install_local_file(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Found,
    NotFound,
    Unexpected(u16),
}

/// Remote repository of build recipes keyed by package name.
pub trait RecipeHost {
    /// Recipe text, `None` when the host has no such package.
    fn fetch_recipe(&self, name: &str) -> Result<Option<String>>;

    fn probe(&self, name: &str) -> Result<ProbeStatus>;

    /// Location of the source snapshot archive for `name`.
    fn snapshot_url(&self, name: &str) -> String;
}

/// Runs a recipe in isolation and returns the raw probe output.
pub trait RecipeEvaluator {
    fn evaluate(&self, name: &str, recipe: &str) -> Result<String>;
}

pub trait PackageGroups {
    fn group_installed(&self, group: &str) -> Result<bool>;

    fn install_group(&self, group: &str, options: &[String]) -> Result<()>;

    fn remove_group(&self, group: &str, options: &[String]) -> Result<()>;
}
