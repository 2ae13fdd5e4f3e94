use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// System-wide log file tried first when none is configured.
pub const SYSTEM_LOG_FILE: &str = "/var/log/urnc.log";

/// Log file name in the home directory, used when the system one is not
/// writable.
pub const HOME_LOG_FILE: &str = ".urnc.log";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize logging with human-readable output format.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back
/// to `default_level` (e.g. "info", "debug", "urnc_core=debug,warn").
///
/// Safe to call multiple times (e.g. in tests) -- subsequent calls are no-ops.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, "logging initialised (human-readable)");
}

/// Initialize logging with JSON output format.
///
/// Safe to call multiple times -- subsequent calls are no-ops.
pub fn init_logging_json(service_name: &str, default_level: &str) {
    fmt()
        .json()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::debug!(service = service_name, "logging initialised (json)");
}

/// Log to stdout (human-readable or JSON) and append plain-text lines to
/// `path`.
///
/// Fails only if the file cannot be opened; a second initialisation is a
/// no-op like the other entry points.
pub fn init_logging_with_file(
    service_name: &str,
    default_level: &str,
    json: bool,
    path: &Path,
) -> std::io::Result<()> {
    let file = open_append(path)?;

    let human = (!json).then(|| fmt::layer().with_target(true));
    let machine = json.then(|| fmt::layer().json().with_target(true));
    let to_file = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(human)
        .with(machine)
        .with(to_file)
        .try_init()
        .ok();

    tracing::debug!(
        service = service_name,
        file = %path.display(),
        "logging initialised (stdout + file)"
    );
    Ok(())
}

/// Candidate log files in order of preference: the system log, then
/// `~/.urnc.log`.
pub fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(SYSTEM_LOG_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(HOME_LOG_FILE));
    }
    candidates
}

/// First of `candidates` that can be opened for appending.
pub fn first_writable(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|path| open_append(path).is_ok())
        .cloned()
}

/// The log file to use when none is configured, or `None` if neither
/// default location is writable.
pub fn default_log_file() -> Option<PathBuf> {
    first_writable(&log_file_candidates())
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
