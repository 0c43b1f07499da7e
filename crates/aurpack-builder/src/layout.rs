use anyhow::{Context, Result};
use aurpack_core::{PackageExtension, PackageNode};
use std::fs;
use std::path::{Path, PathBuf};

pub const RECIPE_FILE_NAME: &str = "PKGBUILD";

/// Paths under the build directory. Every package builds in `{build_dir}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    build_dir: PathBuf,
    extension: PackageExtension,
}

impl BuildLayout {
    pub fn new(build_dir: impl Into<PathBuf>, extension: PackageExtension) -> Self {
        Self {
            build_dir: build_dir.into(),
            extension,
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn extension(&self) -> PackageExtension {
        self.extension
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.build_dir.join(name)
    }

    pub fn recipe_path(&self, name: &str) -> PathBuf {
        self.package_dir(name).join(RECIPE_FILE_NAME)
    }

    pub fn snapshot_archive_path(&self, name: &str) -> PathBuf {
        self.build_dir.join(format!("{name}.tar.gz"))
    }

    pub fn expected_artifact_path(&self, node: &PackageNode) -> PathBuf {
        self.package_dir(&node.name)
            .join(node.artifact_file_name(self.extension))
    }

    /// Locates a built package file for `node`.
    ///
    /// The exact `{name}-{version}-{arch}` file wins. Otherwise the first file (by
    /// name) starting with `{name}-` is accepted, whatever version it carries.
    pub fn find_artifact(&self, node: &PackageNode) -> Result<Option<PathBuf>> {
        let expected = self.expected_artifact_path(node);
        if expected.is_file() {
            return Ok(Some(expected));
        }

        let dir = self.package_dir(&node.name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let prefix = format!("{}-", node.name);
        let suffix = format!(".{}", self.extension.as_str());
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("failed to read build directory: {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with(&prefix) && file_name.ends_with(&suffix) {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}
