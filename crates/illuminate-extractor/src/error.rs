//! Error types for the extraction pipeline.

use thiserror::Error;

use crate::types::EngineFailure;

/// Errors surfaced by the extraction pipeline.
///
/// Individual engine failures and timeouts are not errors; they are
/// recorded in [`crate::types::ProcessingResult::failures`] and the
/// call continues with whatever output the remaining engines produced.
/// Only a call that can produce no output at all fails.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The strategy resolved to an engine set with no enabled,
    /// available members.
    #[error("No extraction engines are enabled and available")]
    NoEnginesAvailable,

    /// Every dispatched engine failed or timed out, so there is
    /// nothing to vote over.
    #[error("All {} dispatched engines failed", failures.len())]
    AllEnginesFailed {
        /// Per-engine failure reasons, in dispatch order.
        failures: Vec<EngineFailure>,
    },

    /// Configuration could not be read or was rejected.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<illuminate_config::ConfigError> for ExtractionError {
    fn from(err: illuminate_config::ConfigError) -> Self {
        ExtractionError::Config(err.to_string())
    }
}
