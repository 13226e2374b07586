//! Error types for the library layer.

use std::fmt;

use crate::config::ConfigError;
use crate::ingest::FileError;
use crate::store::StoreError;

/// Errors produced by the library layer.
#[derive(Debug)]
pub enum CreTrackerError {
    /// The persistence gateway failed to load or save a collection.
    Store(StoreError),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// An uploaded file was rejected before any row was processed.
    File(FileError),
    /// Configuration could not be loaded.
    Config(ConfigError),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// A fault during row processing, deduplication or reconciliation that
    /// would leave the relational invariants broken.
    Pipeline(String),
}

impl fmt::Display for CreTrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::File(e) => write!(f, "File error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Pipeline(msg) => write!(f, "Pipeline error: {}", msg),
        }
    }
}

impl std::error::Error for CreTrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::File(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CreTrackerError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<serde_json::Error> for CreTrackerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<FileError> for CreTrackerError {
    fn from(e: FileError) -> Self {
        Self::File(e)
    }
}

impl From<ConfigError> for CreTrackerError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
