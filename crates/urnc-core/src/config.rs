use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::locate::{SyncRequest, DEFAULT_BRANCH, DEFAULT_DEPTH};
use crate::snapshot::Identity;

/// Top-level configuration loaded from `~/.urnc/config.toml`.
///
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub identity: Identity,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from `~/.urnc/config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;
        if self.identity.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "identity.name must not be empty".into(),
            ));
        }
        if !self.identity.email.contains('@') {
            return Err(ConfigError::Validation(format!(
                "identity.email '{}' is not an email address",
                self.identity.email
            )));
        }
        Ok(())
    }

    /// A request carrying the configured branch and depth.
    pub fn request(&self, remote: Option<String>) -> SyncRequest {
        SyncRequest {
            remote,
            branch: self.sync.branch.clone(),
            depth: self.sync.depth,
            ..SyncRequest::default()
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".urnc")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Branch cloned when the working copy does not exist yet.
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            depth: default_depth(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync.branch must not be empty".into(),
            ));
        }
        if self.depth == 0 {
            return Err(ConfigError::Validation(
                "sync.depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_branch() -> String {
    DEFAULT_BRANCH.into()
}
fn default_depth() -> u32 {
    DEFAULT_DEPTH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Log file. When unset the CLI tries `/var/log/urnc.log`, then
    /// `~/.urnc.log`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
