mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use commands::SyncArgs;

/// urnc -- keep a student copy of a course repository up to date.
#[derive(Parser)]
#[command(name = "urnc", version, about)]
struct Cli {
    /// Root folder for resolving relative paths.
    #[arg(short = 'f', long, global = true)]
    root: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.urnc/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the outcome as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull the repo and automatically merge local changes.
    Pull(SyncArgs),

    /// Clone the repo, or fast-forward an existing clone.
    Clone(SyncArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = commands::load_config(cli.config.as_deref());

    if let Some(root) = &cli.root {
        std::env::set_current_dir(root)
            .with_context(|| format!("changing into root folder {}", root.display()))?;
    }

    let args = match &cli.command {
        Commands::Pull(args) | Commands::Clone(args) => args,
    };
    commands::init_logging(&config, args.log_file.as_deref(), cli.verbose);
    if let Some(err) = config_error {
        tracing::warn!(error = %err, "ignoring unreadable config, using defaults");
    }

    let outcome = match &cli.command {
        Commands::Pull(args) => commands::pull::run(&config, args),
        Commands::Clone(args) => commands::clone::run(&config, args),
    };
    commands::report(&outcome, cli.json)?;

    // Exit 0 even when the sync failed; the outcome has been logged.
    Ok(())
}
