use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::archive::PackageExtension;

pub const DEFAULT_BUILD_DIR: &str = "/var/cache/aurpack/build";
pub const DEFAULT_RECIPE_HOST: &str = "https://aur.archlinux.org";
pub const DEFAULT_EVAL_TIMEOUT_SECS: u64 = 1;
pub const DEFAULT_EVAL_USER: &str = "nobody";
pub const DEFAULT_EVAL_GROUP: &str = "nobody";

/// User and group a spawned command runs as. Unset fields keep the caller's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunAs {
    pub user: Option<String>,
    pub group: Option<String>,
}

impl RunAs {
    pub fn is_inherited(&self) -> bool {
        self.user.is_none() && self.group.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncOptions {
    pub build_dir: PathBuf,
    pub build_user: Option<String>,
    pub build_group: Option<String>,
    pub install_user: Option<String>,
    pub install_group: Option<String>,
    /// Package name to a local recipe that replaces the fetched one.
    pub recipe_overrides: BTreeMap<String, PathBuf>,
    /// Package name to local files copied next to the recipe before building.
    pub patches: BTreeMap<String, Vec<PathBuf>>,
    /// Appended to every `./configure` line of a recipe.
    pub configure_flags: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub skip_pgp_check: bool,
    pub pgp_keys: Vec<String>,
    pub package_extension: PackageExtension,
    pub recipe_host: String,
    pub eval_timeout_secs: u64,
    /// Recipe evaluation identity. An empty string keeps the caller's identity.
    pub eval_user: Option<String>,
    pub eval_group: Option<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            build_user: None,
            build_group: None,
            install_user: None,
            install_group: None,
            recipe_overrides: BTreeMap::new(),
            patches: BTreeMap::new(),
            configure_flags: None,
            environment: BTreeMap::new(),
            skip_pgp_check: false,
            pgp_keys: Vec::new(),
            package_extension: PackageExtension::default(),
            recipe_host: DEFAULT_RECIPE_HOST.to_string(),
            eval_timeout_secs: DEFAULT_EVAL_TIMEOUT_SECS,
            eval_user: Some(DEFAULT_EVAL_USER.to_string()),
            eval_group: Some(DEFAULT_EVAL_GROUP.to_string()),
        }
    }
}

impl SyncOptions {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let options: Self = toml::from_str(input).context("failed to parse aurpack config")?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.build_dir.as_os_str().is_empty() {
            return Err(anyhow!("build_dir must not be empty"));
        }
        if self.eval_timeout_secs == 0 {
            return Err(anyhow!("eval_timeout_secs must be greater than zero"));
        }
        let host = self.recipe_host.trim();
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(anyhow!(
                "recipe_host must be an http(s) URL: {}",
                self.recipe_host
            ));
        }
        for key in &self.pgp_keys {
            if key.trim().is_empty() || key.chars().any(char::is_whitespace) {
                return Err(anyhow!("invalid pgp key identifier: '{key}'"));
            }
        }
        for (name, files) in &self.patches {
            for file in files {
                if file.file_name().is_none() {
                    return Err(anyhow!(
                        "patch '{}' for package '{name}' has no file name",
                        file.display()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn build_identity(&self) -> RunAs {
        RunAs {
            user: self.build_user.clone(),
            group: self.build_group.clone(),
        }
    }

    pub fn install_identity(&self) -> RunAs {
        RunAs {
            user: self.install_user.clone(),
            group: self.install_group.clone(),
        }
    }

    pub fn eval_identity(&self) -> RunAs {
        let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());
        RunAs {
            user: non_empty(&self.eval_user),
            group: non_empty(&self.eval_group),
        }
    }

    pub fn eval_timeout(&self) -> Duration {
        Duration::from_secs(self.eval_timeout_secs)
    }

    pub fn recipe_override(&self, name: &str) -> Option<&PathBuf> {
        self.recipe_overrides.get(name)
    }

    pub fn patches_for(&self, name: &str) -> &[PathBuf] {
        self.patches.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}
