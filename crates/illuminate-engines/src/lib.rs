//! Illuminate Extraction Engines
//!
//! Heterogeneous text-analysis engines behind one capability trait.
//!
//! # Overview
//!
//! Two broad engine families exist:
//!
//! - **Fast local engines** (`HeuristicEngine`): cue-based sentence
//!   classification, low latency, lower recall, no chunking needed for
//!   normal chapter lengths.
//! - **LLM-based chunked engines** (`LlmEngine`): higher recall and semantic
//!   quality at higher latency; large chapters are split by `TextChunker`
//!   and each chunk goes through a structured-output extraction call.
//!
//! An engine that fails to initialize marks itself unavailable; the registry
//! excludes it without aborting startup.
//!
//! # Example
//!
//! ```
//! use illuminate_engines::{DescriptionEngine, HeuristicEngine};
//!
//! # tokio_test::block_on(async {
//! let engine = HeuristicEngine::new();
//! let candidates = engine
//!     .extract("The old castle rose above the misty hill.")
//!     .await
//!     .unwrap();
//! assert!(!candidates.is_empty());
//! # });
//! ```

#![warn(missing_docs)]

mod chunking;
mod engine;
mod heuristic;
mod llm;
mod parser;
mod prompt;
mod scripted;

pub use chunking::{Chunk, ChunkerConfig, TextChunker};
pub use engine::{DescriptionEngine, EngineError};
pub use heuristic::HeuristicEngine;
pub use llm::{LlmEngine, LlmEngineOptions};
pub use prompt::PromptBuilder;
pub use scripted::ScriptedEngine;
