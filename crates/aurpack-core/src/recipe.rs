use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use regex::Regex;

use crate::node::{PackageInfo, PackageRelease};

/// Architecture value that marks a package as architecture independent.
pub const ANY_ARCH: &str = "any";

const RECIPE_PROBE_TRAILER: &str = r#"
echo
echo version ${pkgver}-${pkgrel}
echo arch ${arch[@]}
echo depends ${depends[@]} ${makedepends[@]}
"#;

pub fn default_arch() -> &'static str {
    std::env::consts::ARCH
}

/// Recipe text followed by the echo lines the metadata probe reads back.
pub fn recipe_probe_script(recipe: &str) -> String {
    let mut script = String::with_capacity(recipe.len() + RECIPE_PROBE_TRAILER.len() + 1);
    script.push_str(recipe);
    if !recipe.ends_with('\n') {
        script.push('\n');
    }
    script.push_str(RECIPE_PROBE_TRAILER);
    script
}

/// Parses the last three lines of probe output into package metadata.
///
/// Any architecture other than `any` is replaced by `default_arch`, and every
/// dependency is reduced to its bare name.
pub fn parse_recipe_probe_output(output: &str, default_arch: &str) -> Result<PackageInfo> {
    let lines = output
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    if lines.len() < 3 {
        return Err(anyhow!(
            "recipe probe produced {} line(s), expected version, arch and depends",
            lines.len()
        ));
    }
    let tail = &lines[lines.len() - 3..];

    let version = probe_field(tail[0], "version")?
        .next()
        .ok_or_else(|| anyhow!("recipe probe did not report a version"))?;
    if version.starts_with('-') || version.ends_with('-') {
        return Err(anyhow!(
            "recipe does not declare both pkgver and pkgrel (got '{version}')"
        ));
    }

    let arch = if probe_field(tail[1], "arch")?.any(|value| value == ANY_ARCH) {
        ANY_ARCH.to_string()
    } else {
        default_arch.to_string()
    };

    let dependencies = probe_field(tail[2], "depends")?
        .filter_map(strip_dependency_constraint)
        .collect();

    Ok(PackageInfo {
        version: version.to_string(),
        arch,
        dependencies,
    })
}

fn probe_field<'a>(line: &'a str, key: &str) -> Result<impl Iterator<Item = &'a str>> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(found) if found == key => Ok(tokens),
        _ => Err(anyhow!("malformed recipe probe line, expected '{key}': {line}")),
    }
}

/// Reduces a declared dependency such as `bar>=2.0` to its bare name `bar`.
pub fn strip_dependency_constraint(raw: &str) -> Option<String> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let name = NAME.get_or_init(|| Regex::new(r"[a-z0-9\-_.]+").expect("valid regex"));
    name.find(raw).map(|found| found.as_str().to_string())
}

/// Extracts version and architecture from package-manager info output.
pub fn parse_package_release(output: &str) -> Option<PackageRelease> {
    static RELEASE: OnceLock<Regex> = OnceLock::new();
    let release = RELEASE.get_or_init(|| {
        Regex::new(r"(?s)Version\s*: ([\w.:+~-]+).+?Architecture\s*: (\w+)").expect("valid regex")
    });
    let captures = release.captures(output)?;
    Some(PackageRelease {
        version: captures.get(1)?.as_str().to_string(),
        arch: captures.get(2)?.as_str().to_string(),
    })
}
