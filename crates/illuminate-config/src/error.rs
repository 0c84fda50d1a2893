//! Error types for the configuration store

use thiserror::Error;

/// Errors that can occur during configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Rejected at write time: weight < 0 or a threshold outside [0, 1]
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Engine config not found
    #[error("Engine config not found: {0}")]
    NotFound(String),

    /// Serialization error for stored settings
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Serialization(e.to_string())
    }
}
