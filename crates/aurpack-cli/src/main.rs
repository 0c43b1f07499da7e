mod completion;
mod dispatch;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::dispatch::{init_tracing, run_cli};

#[derive(Parser, Debug)]
#[command(name = "aurpack")]
#[command(version)]
#[command(
    about = "Build and install AUR packages together with their dependencies",
    long_about = None
)]
struct Cli {
    /// TOML configuration file. Defaults to /etc/aurpack/config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    build_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    skip_pgp_check: bool,
    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve, build and install a package with every missing dependency.
    Sync { name: String },
    /// Build a package from its recipe unless an artifact already exists.
    Build { name: String },
    /// Install an already built package.
    Install { name: String },
    /// Print the resolved dependency graph and its build order.
    Graph {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Install or remove a package group.
    Group {
        #[command(subcommand)]
        action: GroupCommands,
    },
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommands {
    Install {
        group: String,
        /// Extra option passed to pacman, repeatable.
        #[arg(long = "pacman-option", allow_hyphen_values = true)]
        options: Vec<String>,
    },
    Remove {
        group: String,
        #[arg(long = "pacman-option", allow_hyphen_values = true)]
        options: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(cli)
}
