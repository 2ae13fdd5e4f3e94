pub mod clone;
pub mod pull;

use std::path::{Path, PathBuf};

use clap::Args;
use urnc_core::{Config, ConfigError, SyncEngine, SyncOutcome, SyncRequest};
use urnc_telemetry::logging;

/// Arguments shared by `pull` and `clone`.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// URL or path of the published repository. Omit to sync the repository
    /// containing the current directory.
    pub git_url: Option<String>,

    /// The name of the output folder.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// The branch to clone (default from config, else "main").
    #[arg(short, long)]
    pub branch: Option<String>,

    /// The depth for the initial clone (default from config, else 1).
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Append log output to this file.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
}

impl SyncArgs {
    /// Request for these arguments, with config values filling the gaps.
    pub fn request(&self, config: &Config) -> SyncRequest {
        let mut request = config.request(self.git_url.clone());
        request.target = self.output.clone();
        if let Some(branch) = &self.branch {
            request.branch = branch.clone();
        }
        if let Some(depth) = self.depth {
            request.depth = depth;
        }
        request
    }
}

/// Load `path` (or `~/.urnc/config.toml`). A broken config file must not
/// stop a sync, so on error the defaults are used and the error is handed
/// back for logging once a subscriber exists.
pub fn load_config(path: Option<&Path>) -> (Config, Option<ConfigError>) {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    }
}

/// Engine carrying the configured committer identity.
pub fn engine(config: &Config) -> SyncEngine {
    SyncEngine::new().with_identity(config.identity.clone())
}

/// Set up logging: stdout always, plus the first usable log file out of the
/// `--log-file` flag, the config, and the default locations.
pub fn init_logging(config: &Config, log_file: Option<&Path>, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let json = config.logging.json;

    let file = log_file
        .map(Path::to_path_buf)
        .or_else(|| config.logging.file.clone())
        .or_else(logging::default_log_file);

    if let Some(path) = &file {
        if logging::init_logging_with_file("urnc", level, json, path).is_ok() {
            return;
        }
    }
    if json {
        logging::init_logging_json("urnc", level);
    } else {
        logging::init_logging("urnc", level);
    }
    if let Some(path) = file {
        tracing::warn!(file = %path.display(), "log file is not writable, logging to stdout only");
    }
}

/// Log the outcome and optionally print it as JSON.
pub fn report(outcome: &SyncOutcome, json: bool) -> anyhow::Result<()> {
    match outcome {
        SyncOutcome::Cloned { folder } => {
            tracing::info!(folder = %folder.display(), "clone complete")
        }
        SyncOutcome::Synced(report) => tracing::info!(
            workdir = %report.workdir.display(),
            renamed = report.renamed.len(),
            restored = report.restored.len(),
            committed = report.snapshot_committed,
            "sync complete"
        ),
        SyncOutcome::Followed { workdir } => {
            tracing::info!(workdir = %workdir.display(), "fast-forward complete")
        }
        SyncOutcome::Failed(failure) => tracing::error!(
            reason = ?failure.reason,
            message = %failure.message,
            "sync failed"
        ),
    }
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    }
    Ok(())
}
