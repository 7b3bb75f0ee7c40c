//! Store configuration parsing.
//!
//! A config file is optional; every field has a default matching
//! [`KvStore::open`](crate::KvStore::open).
//!
//! ```toml
//! path = "data/app.sqlite"
//! autocommit = true
//! busy_timeout_ms = 2000
//! format = "json"
//!
//! [logging]
//! level = "pdict=debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::kv::{Format, KvError, KvStore, OpenOptions};

/// Default backing file name.
pub const DEFAULT_PATH: &str = "pdict.sqlite";

/// Store configuration loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite file.
    pub path: PathBuf,
    /// Commit after every mutation.
    pub autocommit: bool,
    /// Lock wait in milliseconds; the engine default when unset.
    pub busy_timeout_ms: Option<u64>,
    /// Value serializer.
    pub format: Format,
    /// Log output settings (used by the CLI).
    pub logging: LoggingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            autocommit: true,
            busy_timeout_ms: None,
            format: Format::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"pdict=trace"`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Colored output when writing to a terminal.
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
            color: true,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Open options described by this configuration.
    pub fn open_options(&self) -> OpenOptions<Format> {
        let options = OpenOptions::new()
            .autocommit(self.autocommit)
            .serializer(self.format);
        match self.busy_timeout_ms {
            Some(ms) => options.busy_timeout(Duration::from_millis(ms)),
            None => options,
        }
    }

    /// Open the configured store.
    pub fn open(&self) -> Result<KvStore<Format>, KvError> {
        self.open_options().open(&self.path)
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    /// TOML parse error.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
