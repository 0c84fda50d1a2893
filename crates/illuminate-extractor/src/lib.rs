//! Illuminate Extractor
//!
//! Multi-engine consensus extraction of illustratable scene descriptions
//! from book chapters.
//!
//! # Architecture
//!
//! ```text
//! Text → StrategyCoordinator → N × DescriptionEngine → EnsembleVoter
//!      → QualityScorer → ProcessingResult
//! ```
//!
//! A call dispatches the chapter text to one or more registered engines
//! according to an execution [`Strategy`](illuminate_domain::Strategy),
//! merges duplicate findings across engines by weighted consensus, and
//! returns the surviving descriptions ranked by illustration priority.
//! Engine weights and thresholds live in a durable
//! [`ConfigStore`](illuminate_config::ConfigStore) snapshot-read once per
//! call.
//!
//! # Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use illuminate_config::ConfigStore;
//! use illuminate_engines::HeuristicEngine;
//! use illuminate_extractor::{EngineRegistry, ExtractionRequest, StrategyCoordinator};
//!
//! # tokio_test::block_on(async {
//! let config = Arc::new(ConfigStore::in_memory().unwrap());
//! let mut registry = EngineRegistry::new(Arc::clone(&config));
//! registry.register(Arc::new(HeuristicEngine::new())).unwrap();
//!
//! let coordinator = StrategyCoordinator::new(registry, config);
//! let request = ExtractionRequest::new(
//!     "ch_001",
//!     "Старый замок возвышался на холме. Высокая женщина в сером плаще стояла у ворот.",
//! );
//! let result = coordinator.extract(request).await.unwrap();
//! for description in &result.descriptions {
//!     println!("[{}] {}", description.description_type, description.content);
//! }
//! # });
//! ```

#![warn(missing_docs)]

mod coordinator;
mod error;
mod registry;
mod scorer;
mod types;
mod voter;

#[cfg(test)]
mod tests;

pub use coordinator::StrategyCoordinator;
pub use error::ExtractionError;
pub use registry::{ActiveEngine, EngineRegistry};
pub use scorer::QualityScorer;
pub use types::{EngineFailure, ExtractionRequest, ProcessingResult, QualityMetrics};
pub use voter::{
    text_similarity, EnsembleVoter, VoteOutcome, VoteParams, SPAN_OVERLAP_THRESHOLD,
    TEXT_SIMILARITY_THRESHOLD,
};
