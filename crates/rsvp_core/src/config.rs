//! Runtime configuration for the response store.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable or a JSON document.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_PATH: &str = "rsvp.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const ENV_DATABASE_PATH: &str = "RSVP_DATABASE_PATH";
const ENV_BUSY_TIMEOUT_MS: &str = "RSVP_BUSY_TIMEOUT_MS";
const ENV_LOG_LEVEL: &str = "RSVP_LOG_LEVEL";
const ENV_LOG_DIR: &str = "RSVP_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    /// JSON document could not be parsed into a configuration.
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings needed to open a unit of work and start logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a configuration from defaults overridden by `RSVP_*` variables.
    ///
    /// An unparsable `RSVP_BUSY_TIMEOUT_MS` falls back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(timeout) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = timeout.trim().parse().unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|dir| !dir.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }
}
