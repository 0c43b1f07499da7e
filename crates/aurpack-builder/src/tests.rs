use super::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use aurpack_core::{
    AurError, Origin, PackageDatabase, PackageExtension, PackageGroups, PackageInfo, PackageNode,
    PackageRelease, ProbeStatus, RecipeEvaluator, RecipeHost, RunAs, SyncOptions,
};
use aurpack_resolver::PackageInfoSource;
use regex::Regex;

use crate::actions::{append_to_lines, build_extract_command, build_makepkg_command};
use crate::keys::build_key_import_command;
use crate::orchestrator::configure_line_pattern;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "aurpack-builder-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    path
}

#[derive(Default)]
struct FakeDatabase {
    remote: BTreeMap<String, String>,
    installed: RefCell<BTreeMap<String, String>>,
    /// Versions recorded when a local artifact of the package is installed.
    built_versions: BTreeMap<String, String>,
    installs: RefCell<Vec<String>>,
    fail_install: Option<String>,
}

impl FakeDatabase {
    fn release(version: &str) -> PackageRelease {
        PackageRelease {
            version: version.to_string(),
            arch: "x86_64".to_string(),
        }
    }

    fn installs(&self) -> Vec<String> {
        self.installs.borrow().clone()
    }
}

impl PackageDatabase for FakeDatabase {
    fn query_remote(&self, name: &str) -> Result<Option<PackageRelease>> {
        Ok(self.remote.get(name).map(|version| Self::release(version)))
    }

    fn query_installed(&self, name: &str) -> Result<Option<PackageRelease>> {
        Ok(self
            .installed
            .borrow()
            .get(name)
            .map(|version| Self::release(version)))
    }

    fn search_providers(&self, _pattern: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn install_remote(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if self.fail_install.as_deref() == Some(*name) {
                return Err(anyhow!("pacman exited with status 1"));
            }
            self.installs.borrow_mut().push(format!("remote:{name}"));
            if let Some(version) = self.remote.get(*name) {
                self.installed
                    .borrow_mut()
                    .insert(name.to_string(), version.clone());
            }
        }
        Ok(())
    }

    fn install_local_file(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let name = self
            .built_versions
            .keys()
            .filter(|name| file_name.starts_with(&format!("{name}-")))
            .max_by_key(|name| name.len())
            .cloned()
            .ok_or_else(|| anyhow!("unknown artifact {file_name}"))?;
        if self.fail_install.as_deref() == Some(name.as_str()) {
            return Err(anyhow!("pacman exited with status 1"));
        }
        self.installs.borrow_mut().push(format!("local:{file_name}"));
        let version = self.built_versions[&name].clone();
        self.installed.borrow_mut().insert(name, version);
        Ok(())
    }
}

/// Recipes are stored directly in probe-output form.
#[derive(Default)]
struct FakeHost {
    recipes: BTreeMap<String, String>,
    fetches: RefCell<Vec<String>>,
}

impl FakeHost {
    fn fetch_count(&self, name: &str) -> usize {
        self.fetches
            .borrow()
            .iter()
            .filter(|fetched| fetched.as_str() == name)
            .count()
    }
}

impl RecipeHost for FakeHost {
    fn fetch_recipe(&self, name: &str) -> Result<Option<String>> {
        self.fetches.borrow_mut().push(name.to_string());
        Ok(self.recipes.get(name).cloned())
    }

    fn probe(&self, name: &str) -> Result<ProbeStatus> {
        Ok(if self.recipes.contains_key(name) {
            ProbeStatus::Found
        } else {
            ProbeStatus::NotFound
        })
    }

    fn snapshot_url(&self, name: &str) -> String {
        format!("https://aur.example.test/cgit/aur.git/snapshot/{name}.tar.gz")
    }
}

struct PassthroughEvaluator;

impl RecipeEvaluator for PassthroughEvaluator {
    fn evaluate(&self, _name: &str, recipe: &str) -> Result<String> {
        Ok(recipe.to_string())
    }
}

/// Records every action and drops an artifact into the package directory on build.
#[derive(Default)]
struct FakeExecutor {
    versions: BTreeMap<String, String>,
    actions: RefCell<Vec<String>>,
    fail_build: Option<String>,
    no_artifact: Option<String>,
}

impl FakeExecutor {
    fn record(&self, action: String) {
        self.actions.borrow_mut().push(action);
    }

    fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }

    fn builds(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| action.strip_prefix("makepkg ").map(ToString::to_string))
            .collect()
    }
}

impl ActionExecutor for FakeExecutor {
    fn create_dir(&self, path: &Path, _owner: &RunAs) -> Result<()> {
        fs::create_dir_all(path)?;
        self.record(format!("mkdir {}", path.display()));
        Ok(())
    }

    fn download_if_missing(&self, url: &str, _dest: &Path, _owner: &RunAs) -> Result<bool> {
        self.record(format!("download {url}"));
        Ok(true)
    }

    fn extract_archive(&self, archive: &Path, dest_dir: &Path, _owner: &RunAs) -> Result<()> {
        self.record(format!(
            "extract {} -> {}",
            archive.display(),
            dest_dir.display()
        ));
        Ok(())
    }

    fn overlay_file(&self, source: &Path, dest: &Path, _owner: &RunAs) -> Result<()> {
        self.record(format!("overlay {} -> {}", source.display(), dest.display()));
        Ok(())
    }

    fn append_to_matching_lines(
        &self,
        path: &Path,
        pattern: &Regex,
        suffix: &str,
    ) -> Result<bool> {
        self.record(format!(
            "append {} /{}/ {suffix}",
            path.display(),
            pattern.as_str()
        ));
        Ok(true)
    }

    fn run_build(&self, request: &BuildRequest) -> Result<()> {
        let name = request
            .package_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        self.record(format!("makepkg {name}"));
        if self.fail_build.as_deref() == Some(name.as_str()) {
            return Err(anyhow!("makepkg exited with status 4"));
        }
        fs::create_dir_all(&request.package_dir)?;
        if self.no_artifact.as_deref() == Some(name.as_str()) {
            return Ok(());
        }
        let version = &self.versions[&name];
        fs::write(
            request
                .package_dir
                .join(format!("{name}-{version}-x86_64.pkg.tar.xz")),
            b"artifact",
        )?;
        Ok(())
    }
}

#[derive(Default)]
struct FakeKeys {
    imports: RefCell<Vec<(Vec<String>, RunAs)>>,
}

impl KeyImporter for FakeKeys {
    fn import_keys(&self, keys: &[String], identity: &RunAs) -> Result<()> {
        self.imports
            .borrow_mut()
            .push((keys.to_vec(), identity.clone()));
        Ok(())
    }
}

struct Fixture {
    database: FakeDatabase,
    host: FakeHost,
    executor: FakeExecutor,
    keys: FakeKeys,
    options: SyncOptions,
}

impl Fixture {
    fn new() -> Self {
        let options = SyncOptions {
            build_dir: test_dir(),
            ..SyncOptions::default()
        };
        Self {
            database: FakeDatabase::default(),
            host: FakeHost::default(),
            executor: FakeExecutor::default(),
            keys: FakeKeys::default(),
            options,
        }
    }

    fn with_recipe(mut self, name: &str, version: &str, depends: &[&str]) -> Self {
        self.host.recipes.insert(
            name.to_string(),
            format!("version {version}\narch x86_64\ndepends {}\n", depends.join(" ")),
        );
        self.database
            .built_versions
            .insert(name.to_string(), version.to_string());
        self.executor
            .versions
            .insert(name.to_string(), version.to_string());
        self
    }

    fn with_remote(mut self, name: &str, version: &str) -> Self {
        self.database
            .remote
            .insert(name.to_string(), version.to_string());
        self
    }

    fn with_installed(self, name: &str, version: &str) -> Self {
        self.database
            .installed
            .borrow_mut()
            .insert(name.to_string(), version.to_string());
        self
    }

    fn source(&self) -> PackageInfoSource<'_> {
        PackageInfoSource::new(&self.database, &self.host, &PassthroughEvaluator)
            .with_default_arch("x86_64")
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.options.build_dir.join(name)
    }
}

/// `app` needs `zlib` from the repositories and `lib` from the recipe host.
fn app_fixture() -> Fixture {
    Fixture::new()
        .with_recipe("app", "2.0-1", &["zlib", "lib>=1.0"])
        .with_recipe("lib", "1.0-1", &["zlib"])
        .with_remote("zlib", "1.3-2")
}

fn run_ensure(fixture: &Fixture, name: &str) -> Result<SyncOutcome> {
    let source = fixture.source();
    let orchestrator =
        BuildOrchestrator::new(&source, &fixture.executor, &fixture.keys, &fixture.options);
    orchestrator.ensure_installed(name)
}

fn aur_error(err: &anyhow::Error) -> &AurError {
    err.downcast_ref::<AurError>()
        .expect("error must carry an AurError")
}

#[test]
fn ensure_installed_builds_and_installs_dependencies_first() {
    let fixture = app_fixture();
    let outcome = run_ensure(&fixture, "app").expect("sync must succeed");

    assert!(outcome.changed);
    assert_eq!(outcome.packages, vec!["zlib", "lib", "app"]);
    assert_eq!(fixture.executor.builds(), vec!["lib", "app"]);
    assert_eq!(
        fixture.database.installs(),
        vec![
            "remote:zlib",
            "local:lib-1.0-1-x86_64.pkg.tar.xz",
            "local:app-2.0-1-x86_64.pkg.tar.xz",
        ]
    );

    let actions = fixture.executor.actions();
    assert!(actions.contains(
        &"download https://aur.example.test/cgit/aur.git/snapshot/lib.tar.gz".to_string()
    ));
    assert!(actions.contains(&format!(
        "extract {} -> {}",
        fixture.options.build_dir.join("lib.tar.gz").display(),
        fixture.options.build_dir.display()
    )));
    assert!(fixture.keys.imports.borrow().is_empty());

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn second_sync_without_changes_does_nothing() {
    let fixture = app_fixture();
    run_ensure(&fixture, "app").expect("first sync must succeed");
    let actions_before = fixture.executor.actions().len();
    let installs_before = fixture.database.installs().len();

    let outcome = run_ensure(&fixture, "app").expect("second sync must succeed");
    assert_eq!(outcome, SyncOutcome::unchanged());
    assert_eq!(fixture.executor.actions().len(), actions_before);
    assert_eq!(fixture.database.installs().len(), installs_before);

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn installed_dependencies_are_skipped() {
    let fixture = app_fixture()
        .with_installed("zlib", "1.3-2")
        .with_installed("lib", "1.0-1");
    let outcome = run_ensure(&fixture, "app").expect("sync must succeed");

    assert_eq!(outcome.packages, vec!["app"]);
    assert_eq!(fixture.executor.builds(), vec!["app"]);
    assert_eq!(
        fixture.database.installs(),
        vec!["local:app-2.0-1-x86_64.pkg.tar.xz"]
    );

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn outdated_installed_version_triggers_rebuild() {
    let fixture = app_fixture()
        .with_installed("zlib", "1.3-2")
        .with_installed("lib", "1.0-1")
        .with_installed("app", "1.9-1");
    let outcome = run_ensure(&fixture, "app").expect("sync must succeed");

    assert!(outcome.changed);
    assert_eq!(fixture.executor.builds(), vec!["app"]);
    assert_eq!(fixture.host.fetch_count("app"), 1);
    assert_eq!(fixture.host.fetch_count("lib"), 1);

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn existing_artifact_is_installed_without_building() {
    let fixture = app_fixture();
    let lib_dir = fixture.package_dir("lib");
    fs::create_dir_all(&lib_dir).expect("must create package dir");
    fs::write(lib_dir.join("lib-1.0-1-x86_64.pkg.tar.xz"), b"prebuilt")
        .expect("must write artifact");

    run_ensure(&fixture, "app").expect("sync must succeed");

    assert_eq!(fixture.executor.builds(), vec!["app"]);
    assert!(fixture
        .database
        .installs()
        .contains(&"local:lib-1.0-1-x86_64.pkg.tar.xz".to_string()));

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn artifact_of_another_version_shadows_the_rebuild() {
    let fixture = app_fixture();
    let lib_dir = fixture.package_dir("lib");
    fs::create_dir_all(&lib_dir).expect("must create package dir");
    fs::write(lib_dir.join("lib-0.9-3-x86_64.pkg.tar.xz"), b"stale")
        .expect("must write artifact");

    run_ensure(&fixture, "app").expect("sync must succeed");

    assert_eq!(fixture.executor.builds(), vec!["app"]);
    assert!(fixture
        .database
        .installs()
        .contains(&"local:lib-0.9-3-x86_64.pkg.tar.xz".to_string()));

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn failed_build_aborts_remaining_nodes() {
    let mut fixture = app_fixture();
    fixture.executor.fail_build = Some("lib".to_string());

    let err = run_ensure(&fixture, "app").expect_err("build failure must abort");
    match aur_error(&err) {
        AurError::Build { name, reason } => {
            assert_eq!(name, "lib");
            assert!(reason.contains("status 4"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fixture.executor.builds(), vec!["lib"]);
    assert_eq!(fixture.database.installs(), vec!["remote:zlib"]);

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn build_without_artifact_is_a_build_failure() {
    let mut fixture = app_fixture();
    fixture.executor.no_artifact = Some("lib".to_string());

    let err = run_ensure(&fixture, "app").expect_err("missing artifact must fail");
    match aur_error(&err) {
        AurError::Build { name, reason } => {
            assert_eq!(name, "lib");
            assert!(reason.contains("produced no artifact"), "{reason}");
            assert!(reason.contains("lib-1.0-1-x86_64.pkg.tar.xz"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn failed_install_is_an_install_failure() {
    let mut fixture = app_fixture();
    fixture.database.fail_install = Some("zlib".to_string());

    let err = run_ensure(&fixture, "app").expect_err("install failure must abort");
    assert_eq!(
        aur_error(&err),
        &AurError::Install {
            name: "zlib".to_string(),
            reason: "pacman exited with status 1".to_string(),
        }
    );
    assert!(fixture.executor.builds().is_empty());

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn unresolvable_dependency_fails_before_any_action() {
    let fixture = Fixture::new().with_recipe("app", "1.0-1", &["ghost"]);

    let err = run_ensure(&fixture, "app").expect_err("resolution must fail");
    assert!(matches!(
        aur_error(&err),
        AurError::Resolution { name, .. } if name == "ghost"
    ));
    assert!(fixture.executor.actions().is_empty());
}

#[test]
fn build_customizations_are_applied_and_keys_imported_once() {
    let mut fixture = app_fixture();
    let build_dir = fixture.options.build_dir.clone();
    fixture.options.build_user = Some("builder".to_string());
    fixture.options.pgp_keys = vec!["ABCDEF0123456789".to_string()];
    fixture.options.configure_flags = Some("--disable-docs".to_string());
    fixture.options.recipe_overrides.insert(
        "app".to_string(),
        PathBuf::from("/etc/aurpack/app.PKGBUILD"),
    );
    fixture.options.patches.insert(
        "app".to_string(),
        vec![PathBuf::from("/etc/aurpack/patches/fix-build.patch")],
    );

    run_ensure(&fixture, "app").expect("sync must succeed");

    let actions = fixture.executor.actions();
    let app_recipe = build_dir.join("app").join("PKGBUILD");
    assert!(actions.contains(&format!(
        "overlay /etc/aurpack/app.PKGBUILD -> {}",
        app_recipe.display()
    )));
    assert!(actions.contains(&format!(
        "overlay /etc/aurpack/patches/fix-build.patch -> {}",
        build_dir.join("app").join("fix-build.patch").display()
    )));
    assert!(actions.contains(&format!(
        "append {} /./configure.+$/ --disable-docs",
        app_recipe.display()
    )));
    assert!(!actions
        .iter()
        .any(|action| action.starts_with("overlay") && action.contains("/lib/")));

    let imports = fixture.keys.imports.borrow();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].0, vec!["ABCDEF0123456789"]);
    assert_eq!(imports[0].1.user.as_deref(), Some("builder"));

    let _ = fs::remove_dir_all(&build_dir);
}

#[test]
fn installed_root_short_circuits() {
    let fixture = app_fixture().with_installed("app", "2.0-1");
    let outcome = run_ensure(&fixture, "app").expect("sync must succeed");
    assert_eq!(outcome, SyncOutcome::unchanged());
    assert!(fixture.executor.actions().is_empty());
    assert!(fixture.database.installs().is_empty());
}

#[test]
fn build_action_only_builds_missing_artifacts() {
    let fixture = app_fixture();
    let source = fixture.source();
    let orchestrator =
        BuildOrchestrator::new(&source, &fixture.executor, &fixture.keys, &fixture.options);

    let first = orchestrator.build("lib").expect("build must succeed");
    assert!(first.changed);
    assert_eq!(first.packages, vec!["lib"]);
    assert!(orchestrator
        .layout()
        .expected_artifact_path(&source.node("lib", Origin::SourceBuild).expect("node"))
        .is_file());

    let second = orchestrator.build("lib").expect("build must succeed");
    assert!(!second.changed);
    assert_eq!(fixture.executor.builds(), vec!["lib"]);
    assert!(fixture.database.installs().is_empty());

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

#[test]
fn install_action_requires_a_built_artifact() {
    let fixture = app_fixture();
    let source = fixture.source();
    let orchestrator =
        BuildOrchestrator::new(&source, &fixture.executor, &fixture.keys, &fixture.options);

    let err = orchestrator.install("lib").expect_err("missing artifact");
    assert!(matches!(aur_error(&err), AurError::Install { name, .. } if name == "lib"));

    orchestrator.build("lib").expect("build must succeed");
    let outcome = orchestrator.install("lib").expect("install must succeed");
    assert!(outcome.changed);
    assert_eq!(
        fixture.database.installs(),
        vec!["local:lib-1.0-1-x86_64.pkg.tar.xz"]
    );

    let again = orchestrator.install("lib").expect("install must succeed");
    assert!(!again.changed);

    let _ = fs::remove_dir_all(&fixture.options.build_dir);
}

fn layout_node(name: &str, version: &str, arch: &str) -> PackageNode {
    PackageNode::new(
        name,
        Origin::SourceBuild,
        PackageInfo {
            version: version.to_string(),
            arch: arch.to_string(),
            dependencies: Vec::new(),
        },
        None,
    )
}

#[test]
fn layout_paths_follow_build_dir() {
    let layout = BuildLayout::new("/srv/aur", PackageExtension::TarZst);
    let node = layout_node("foo", "1.0-1", "any");
    assert_eq!(layout.package_dir("foo"), PathBuf::from("/srv/aur/foo"));
    assert_eq!(
        layout.recipe_path("foo"),
        PathBuf::from("/srv/aur/foo/PKGBUILD")
    );
    assert_eq!(
        layout.snapshot_archive_path("foo"),
        PathBuf::from("/srv/aur/foo.tar.gz")
    );
    assert_eq!(
        layout.expected_artifact_path(&node),
        PathBuf::from("/srv/aur/foo/foo-1.0-1-any.pkg.tar.zst")
    );
}

#[test]
fn find_artifact_prefers_exact_match_then_sorted_fallback() {
    let root = test_dir();
    let layout = BuildLayout::new(&root, PackageExtension::TarXz);
    let node = layout_node("foo", "2.0-1", "x86_64");
    assert_eq!(layout.find_artifact(&node).expect("probe"), None);

    let dir = layout.package_dir("foo");
    fs::create_dir_all(&dir).expect("must create package dir");
    fs::write(dir.join("foo-1.9-1-x86_64.pkg.tar.zst"), b"").expect("write");
    fs::write(dir.join("PKGBUILD"), b"").expect("write");
    assert_eq!(layout.find_artifact(&node).expect("probe"), None);

    fs::write(dir.join("foo-1.8-1-x86_64.pkg.tar.xz"), b"").expect("write");
    fs::write(dir.join("foo-1.9-1-x86_64.pkg.tar.xz"), b"").expect("write");
    assert_eq!(
        layout.find_artifact(&node).expect("probe"),
        Some(dir.join("foo-1.8-1-x86_64.pkg.tar.xz"))
    );

    fs::write(dir.join("foo-2.0-1-x86_64.pkg.tar.xz"), b"").expect("write");
    assert_eq!(
        layout.find_artifact(&node).expect("probe"),
        Some(dir.join("foo-2.0-1-x86_64.pkg.tar.xz"))
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn append_to_lines_only_touches_matching_lines() {
    let pattern = Regex::new(r"\./configure").expect("valid regex");
    let recipe = "build() {\n  ./configure --prefix=/usr\n  make\n}";
    let updated = append_to_lines(recipe, &pattern, "--disable-docs").expect("must change");
    assert_eq!(
        updated,
        "build() {\n  ./configure --prefix=/usr --disable-docs\n  make\n}"
    );

    assert_eq!(append_to_lines("make\n", &pattern, "--x"), None);
}

#[test]
fn configure_flags_only_extend_configure_calls_with_arguments() {
    let pattern = configure_line_pattern();
    let recipe = "build() {\n  ./configure --prefix=/usr\n  ./configure\n  make\n}\n";
    assert_eq!(
        append_to_lines(recipe, pattern, "--disable-docs").expect("must change"),
        "build() {\n  ./configure --prefix=/usr --disable-docs\n  ./configure\n  make\n}\n"
    );

    assert_eq!(append_to_lines("  ./configure\n", pattern, "--x"), None);
}

#[test]
fn shell_executor_manages_files_in_place() {
    let executor = ShellActionExecutor::new().expect("client must build");
    let owner = RunAs::default();
    let root = test_dir();
    let dir = root.join("pkg");

    executor.create_dir(&dir, &owner).expect("must create dir");
    let mode = fs::metadata(&dir).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    let source = root.join("custom.PKGBUILD");
    fs::write(&source, "build() {\n  ./configure\n}\n").expect("write");
    let recipe = dir.join("PKGBUILD");
    fs::write(&recipe, "stale").expect("write");
    executor
        .overlay_file(&source, &recipe, &owner)
        .expect("must overlay");
    let mode = fs::metadata(&recipe).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o644);

    let pattern = Regex::new(r"\./configure").expect("valid regex");
    assert!(executor
        .append_to_matching_lines(&recipe, &pattern, "--without-x")
        .expect("must append"));
    assert_eq!(
        fs::read_to_string(&recipe).expect("read"),
        "build() {\n  ./configure --without-x\n}\n"
    );

    let archive = root.join("pkg.tar.gz");
    fs::write(&archive, b"cached").expect("write");
    let downloaded = executor
        .download_if_missing("http://127.0.0.1:9/pkg.tar.gz", &archive, &owner)
        .expect("existing archive must be reused");
    assert!(!downloaded);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn extract_command_targets_build_dir() {
    let command = build_extract_command(Path::new("/srv/aur/foo.tar.gz"), Path::new("/srv/aur"));
    assert_eq!(command.get_program(), "tar");
    let args = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(args, vec!["-xf", "/srv/aur/foo.tar.gz", "-C", "/srv/aur"]);
}

#[test]
fn makepkg_command_carries_flags_and_environment() {
    let mut request = BuildRequest {
        package_dir: PathBuf::from("/srv/aur/foo"),
        identity: RunAs::default(),
        environment: BTreeMap::from([("MAKEFLAGS".to_string(), "-j4".to_string())]),
        skip_pgp_check: false,
    };
    let command = build_makepkg_command(&request);
    assert_eq!(command.get_program(), "makepkg");
    let args = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(args, vec!["-sf", "--noconfirm"]);
    assert_eq!(command.get_current_dir(), Some(Path::new("/srv/aur/foo")));
    let envs = command
        .get_envs()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.map(|value| value.to_string_lossy().into_owned()),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        envs,
        vec![("MAKEFLAGS".to_string(), Some("-j4".to_string()))]
    );

    request.skip_pgp_check = true;
    let command = build_makepkg_command(&request);
    let args = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(args, vec!["-sf", "--noconfirm", "--skippgpcheck"]);
}

#[test]
fn key_import_command_uses_gpg() {
    let command = build_key_import_command("ABCDEF0123456789");
    assert_eq!(command.get_program(), "gpg");
    let args = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(args, vec!["--recv-keys", "ABCDEF0123456789"]);
}

#[derive(Default)]
struct FakeGroups {
    installed: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<String>>,
}

impl PackageGroups for FakeGroups {
    fn group_installed(&self, group: &str) -> Result<bool> {
        Ok(self.installed.borrow().contains(group))
    }

    fn install_group(&self, group: &str, options: &[String]) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("install {group} {}", options.join(" ")));
        self.installed.borrow_mut().insert(group.to_string());
        Ok(())
    }

    fn remove_group(&self, group: &str, options: &[String]) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(format!("remove {group} {}", options.join(" ")));
        self.installed.borrow_mut().remove(group);
        Ok(())
    }
}

#[test]
fn group_install_and_remove_report_changes() {
    let groups = FakeGroups::default();
    let options = vec!["--needed".to_string()];

    let outcome = install_group(&groups, "base-devel", &options).expect("install");
    assert!(outcome.changed);
    assert_eq!(outcome.packages, vec!["base-devel"]);
    assert!(!install_group(&groups, "base-devel", &options)
        .expect("install")
        .changed);

    assert!(remove_group(&groups, "base-devel", &[]).expect("remove").changed);
    assert!(!remove_group(&groups, "base-devel", &[]).expect("remove").changed);
    assert_eq!(
        groups.calls.borrow().clone(),
        vec!["install base-devel --needed", "remove base-devel "]
    );
}
