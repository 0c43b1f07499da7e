use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aurpack_builder::{
    install_group, remove_group, BuildOrchestrator, GpgKeyImporter, ShellActionExecutor,
    SyncOutcome,
};
use aurpack_core::SyncOptions;
use aurpack_resolver::{resolve_install_plan, PackageInfoSource};
use aurpack_upstream::{AurHost, Pacman, ShellRecipeEvaluator};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::completion::write_completions_script;
use crate::render::{
    format_graph_lines, format_order_lines, outcome_status, GraphReport, TerminalRenderer,
};
use crate::{Cli, Commands, GroupCommands};

pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/aurpack/config.toml";

pub(crate) fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

pub(crate) fn default_log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Reads the config file, then applies command-line overrides.
pub(crate) fn load_options(
    config: Option<&Path>,
    build_dir: Option<PathBuf>,
    skip_pgp_check: bool,
) -> Result<SyncOptions> {
    let mut options = match config {
        Some(path) => read_options_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.is_file() {
                read_options_file(default_path)?
            } else {
                SyncOptions::default()
            }
        }
    };
    if let Some(build_dir) = build_dir {
        options.build_dir = build_dir;
    }
    if skip_pgp_check {
        options.skip_pgp_check = true;
    }
    options.validate()?;
    Ok(options)
}

fn read_options_file(path: &Path) -> Result<SyncOptions> {
    debug!("loading config from {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    SyncOptions::from_toml_str(&content)
        .with_context(|| format!("invalid config: {}", path.display()))
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();

    match cli.command {
        Commands::Completions { shell } => {
            let mut stdout = io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
        }
        Commands::Group { action } => {
            let options = load_options(cli.config.as_deref(), cli.build_dir, cli.skip_pgp_check)?;
            let pacman = Pacman::new(options.install_identity());
            let (verb, group, outcome) = match action {
                GroupCommands::Install { group, options } => {
                    let outcome = install_group(&pacman, &group, &options)?;
                    ("installed group", group, outcome)
                }
                GroupCommands::Remove { group, options } => {
                    let outcome = remove_group(&pacman, &group, &options)?;
                    ("removed group", group, outcome)
                }
            };
            if outcome.changed {
                renderer.print_status("ok", &format!("{verb} {group}"));
            } else {
                renderer.print_status("skip", &format!("group {group} unchanged"));
            }
        }
        Commands::Sync { name } => {
            let options = load_options(cli.config.as_deref(), cli.build_dir, cli.skip_pgp_check)?;
            run_orchestrated(renderer, &options, "synced", &name, |orchestrator| {
                orchestrator.ensure_installed(&name)
            })?;
        }
        Commands::Build { name } => {
            let options = load_options(cli.config.as_deref(), cli.build_dir, cli.skip_pgp_check)?;
            run_orchestrated(renderer, &options, "built", &name, |orchestrator| {
                orchestrator.build(&name)
            })?;
        }
        Commands::Install { name } => {
            let options = load_options(cli.config.as_deref(), cli.build_dir, cli.skip_pgp_check)?;
            run_orchestrated(renderer, &options, "installed", &name, |orchestrator| {
                orchestrator.install(&name)
            })?;
        }
        Commands::Graph { name, json } => {
            let options = load_options(cli.config.as_deref(), cli.build_dir, cli.skip_pgp_check)?;
            let services = Services::from_options(&options)?;
            let source = services.source();
            let plan = resolve_install_plan(&source, &name)?;
            if json {
                let report = GraphReport::from_plan(&plan);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("failed to serialize dependency graph")?
                );
            } else {
                renderer.print_section("graph");
                renderer.print_lines(&format_graph_lines(&plan));
                renderer.print_section("order");
                renderer.print_lines(&format_order_lines(&plan));
            }
        }
    }

    Ok(())
}

/// Concrete collaborators for one invocation.
struct Services {
    pacman: Pacman,
    host: AurHost,
    evaluator: ShellRecipeEvaluator,
}

impl Services {
    fn from_options(options: &SyncOptions) -> Result<Self> {
        Ok(Self {
            pacman: Pacman::new(options.install_identity()),
            host: AurHost::new(&options.recipe_host)?,
            evaluator: ShellRecipeEvaluator::new(options.eval_timeout(), options.eval_identity()),
        })
    }

    fn source(&self) -> PackageInfoSource<'_> {
        PackageInfoSource::new(&self.pacman, &self.host, &self.evaluator)
    }
}

fn run_orchestrated<F>(
    renderer: TerminalRenderer,
    options: &SyncOptions,
    verb: &str,
    name: &str,
    action: F,
) -> Result<SyncOutcome>
where
    F: FnOnce(&BuildOrchestrator<'_>) -> Result<SyncOutcome>,
{
    let services = Services::from_options(options)?;
    let source = services.source();
    let executor = ShellActionExecutor::new()?;
    let keys = GpgKeyImporter;
    let orchestrator = BuildOrchestrator::new(&source, &executor, &keys, options);

    let spinner = renderer.start_spinner(name);
    let result = action(&orchestrator);
    spinner.finish();

    let outcome = result?;
    let (status, message) = outcome_status(verb, name, &outcome);
    renderer.print_status(status, &message);
    Ok(outcome)
}
