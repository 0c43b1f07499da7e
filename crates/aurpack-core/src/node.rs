use std::fmt;

use serde::{Deserialize, Serialize};

use crate::archive::PackageExtension;

/// Which subsystem satisfies a package.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    SourceBuild,
    PackageManager,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceBuild => "source-build",
            Self::PackageManager => "package-manager",
        }
    }
}

/// Version and architecture reported for a single package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRelease {
    pub version: String,
    pub arch: String,
}

/// Latest upstream metadata for a package, before the installed state is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    pub version: String,
    pub arch: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// One resolved package. Immutable once constructed; graphs key nodes by `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageNode {
    pub name: String,
    pub origin: Origin,
    pub version: String,
    pub arch: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub installed: Option<PackageRelease>,
}

impl PackageNode {
    pub fn new(
        name: impl Into<String>,
        origin: Origin,
        info: PackageInfo,
        installed: Option<PackageRelease>,
    ) -> Self {
        // The package manager resolves its own transitive dependencies.
        let dependencies = match origin {
            Origin::SourceBuild => info.dependencies,
            Origin::PackageManager => Vec::new(),
        };
        Self {
            name: name.into(),
            origin,
            version: info.version,
            arch: info.arch,
            dependencies,
            installed,
        }
    }

    pub fn is_source_build(&self) -> bool {
        self.origin == Origin::SourceBuild
    }

    /// Installed means the recorded installed version is exactly the resolved one.
    pub fn already_installed(&self) -> bool {
        self.installed
            .as_ref()
            .is_some_and(|installed| installed.version == self.version)
    }

    pub fn artifact_file_name(&self, extension: PackageExtension) -> String {
        format!(
            "{}-{}-{}.{}",
            self.name,
            self.version,
            self.arch,
            extension.as_str()
        )
    }
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::SourceBuild => write!(f, "Aur({}-{})", self.name, self.version),
            Origin::PackageManager => write!(f, "Pacman({}-{})", self.name, self.version),
        }
    }
}
