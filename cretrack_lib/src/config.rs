//! Tracker configuration, loaded from an optional TOML file.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Error types for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Upper bound on `follow_up_days` (ten years).
pub const MAX_FOLLOW_UP_DAYS: i64 = 3650;

/// Tunables for ingestion and listing.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// City appended to addresses that carry no comma.
    pub default_city: String,
    /// State appended to addresses that carry no comma.
    pub default_state: String,
    /// Days from today to the first follow-up of a newly imported company client.
    pub follow_up_days: i64,
    /// Per-file upload ceiling in bytes.
    pub max_upload_bytes: u64,
    /// Maximum Levenshtein distance between normalized names considered duplicates.
    pub dedup_threshold: usize,
    pub page_size: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_city: "Nashville".to_string(),
            default_state: "TN".to_string(),
            follow_up_days: 7,
            max_upload_bytes: 10 * 1024 * 1024,
            dedup_threshold: 3,
            page_size: 10,
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_state.trim().is_empty() {
            return Err(ConfigError::Invalid("default_state must not be empty".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive".into()));
        }
        if !(0..=MAX_FOLLOW_UP_DAYS).contains(&self.follow_up_days) {
            return Err(ConfigError::Invalid(format!(
                "follow_up_days must be between 0 and {}",
                MAX_FOLLOW_UP_DAYS
            )));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::Invalid("page_size must be between 1 and 100".into()));
        }
        Ok(())
    }
}
