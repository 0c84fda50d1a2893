//! The engine capability trait

use async_trait::async_trait;
use illuminate_domain::DescriptionCandidate;
use thiserror::Error;

/// Errors raised inside an engine call
///
/// These are caught at the registry/coordinator boundary and accounted as a
/// per-engine failure; they never abort the extraction call on their own.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Engine cannot currently serve requests (missing model, dead endpoint)
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// Underlying LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Engine produced output the adapter could not interpret
    #[error("Invalid engine output: {0}")]
    InvalidOutput(String),

    /// Any other engine-internal failure
    #[error("Engine failure: {0}")]
    Failed(String),
}

/// Capability set every extraction engine implements
///
/// Engines are stateless and safely shared across concurrent extraction
/// calls; per-call state never leaks between invocations. Candidate spans
/// must already be translated to original-text character coordinates when
/// they leave the engine.
#[async_trait]
pub trait DescriptionEngine: Send + Sync {
    /// Stable engine identifier, used as the config key and vote source
    fn name(&self) -> &str;

    /// Engine version, for observability
    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Weight hint used to seed the config store the first time this
    /// engine is registered; admins can retune it afterwards
    fn default_weight(&self) -> f64 {
        1.0
    }

    /// Whether the engine can currently serve requests
    async fn is_available(&self) -> bool {
        true
    }

    /// Extract description candidates from chapter text
    async fn extract(&self, text: &str) -> Result<Vec<DescriptionCandidate>, EngineError>;
}
