use serde::{Deserialize, Serialize};

/// Compression suffix of the package files the build tool produces.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PackageExtension {
    #[default]
    #[serde(rename = "pkg.tar.xz")]
    TarXz,
    #[serde(rename = "pkg.tar.zst")]
    TarZst,
    #[serde(rename = "pkg.tar.gz")]
    TarGz,
}

impl PackageExtension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarXz => "pkg.tar.xz",
            Self::TarZst => "pkg.tar.zst",
            Self::TarGz => "pkg.tar.gz",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pkg.tar.xz" | "xz" => Some(Self::TarXz),
            "pkg.tar.zst" | "zst" => Some(Self::TarZst),
            "pkg.tar.gz" | "gz" => Some(Self::TarGz),
            _ => None,
        }
    }

    pub fn infer_from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        [Self::TarXz, Self::TarZst, Self::TarGz]
            .into_iter()
            .find(|extension| lower.ends_with(&format!(".{}", extension.as_str())))
    }
}
