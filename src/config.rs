//! Configuration file parser for crier.toml.
//!
//! The config file is optional - a missing file yields `Config::default()`,
//! which runs the daemon against `crier.db` in the working directory with
//! no delivery routes. Unknown keys are silently ignored by serde.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level daemon configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to `Default::default()`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database file.
    pub database_path: String,

    /// Detection cycle period in seconds.
    pub poll_interval_secs: u64,

    /// Per-fetch timeout in seconds, distinct from the cycle period.
    pub fetch_timeout_secs: u64,

    /// Admit loopback and private-network feed hosts (self-hosted feeds).
    pub allow_private_feeds: bool,

    /// Lower the default log filter to debug.
    pub debug: bool,

    /// Delivery routes: channel id → webhook URL.
    pub channels: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "crier.db".to_string(),
            poll_interval_secs: 60,
            fetch_timeout_secs: 30,
            allow_private_feeds: false,
            debug: false,
            channels: HashMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB) - refuses a corrupted or hostile
    /// file before reading it into memory.
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                return Ok(Self::default());
            }
            _ => {}
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
