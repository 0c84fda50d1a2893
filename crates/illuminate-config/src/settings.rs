//! Global extraction settings

use crate::error::ConfigError;
use illuminate_domain::Strategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global knobs for the extraction pipeline
///
/// Stored as a single document in the [`crate::ConfigStore`] and read once
/// per call as part of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Weighted score a cluster must reach under Ensemble/Sequential/Single
    pub consensus_threshold: f64,

    /// Permissive threshold used under Parallel, to maximize recall
    pub parallel_consensus_threshold: f64,

    /// A single-engine cluster whose own confidence exceeds this is kept
    /// even below the consensus threshold
    pub single_engine_override: f64,

    /// Minimum excerpt length in characters; shorter candidates are dropped
    pub min_description_length: usize,

    /// Maximum excerpt length in characters; longer candidates are dropped
    pub max_description_length: usize,

    /// Default confidence floor applied when the caller passes none
    pub min_confidence: f64,

    /// Strategy used when the caller passes none
    pub default_strategy: Strategy,

    /// Sequential mode stops early once this many descriptions are merged
    pub sufficient_coverage: usize,

    /// Whole-call deadline in seconds; on expiry, completed engines are
    /// merged best-effort
    pub call_timeout_secs: u64,
}

impl GlobalSettings {
    /// Get the call-level deadline as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Consensus threshold effective for a given strategy
    pub fn threshold_for(&self, strategy: Strategy) -> f64 {
        match strategy {
            Strategy::Parallel => self.parallel_consensus_threshold,
            _ => self.consensus_threshold,
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("consensus_threshold", self.consensus_threshold),
            (
                "parallel_consensus_threshold",
                self.parallel_consensus_threshold,
            ),
            ("single_engine_override", self.single_engine_override),
            ("min_confidence", self.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} {value} outside [0.0, 1.0]"
                )));
            }
        }
        if self.min_description_length == 0 {
            return Err(ConfigError::InvalidConfig(
                "min_description_length must be greater than 0".to_string(),
            ));
        }
        if self.min_description_length >= self.max_description_length {
            return Err(ConfigError::InvalidConfig(format!(
                "min_description_length {} must be below max_description_length {}",
                self.min_description_length, self.max_description_length
            )));
        }
        if self.sufficient_coverage == 0 {
            return Err(ConfigError::InvalidConfig(
                "sufficient_coverage must be greater than 0".to_string(),
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load settings from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)
            .map_err(|e| ConfigError::Serialization(format!("Failed to parse TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize TOML: {e}")))
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.6,
            parallel_consensus_threshold: 0.3,
            single_engine_override: 0.85,
            min_description_length: 15,
            max_description_length: 600,
            min_confidence: 0.3,
            default_strategy: Strategy::Ensemble,
            sufficient_coverage: 8,
            call_timeout_secs: 300,
        }
    }
}
