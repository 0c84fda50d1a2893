//! Request and result types for extraction calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use illuminate_domain::{DescriptionCandidate, MergedDescription, Strategy};

/// A single extraction call over one chapter of prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Identifier of the chapter the text belongs to. Carried through
    /// to the result untouched.
    pub chapter_id: String,
    /// The chapter text to extract descriptions from.
    pub text: String,
    /// Strategy override for this call. `None` uses the configured
    /// default strategy.
    pub strategy: Option<Strategy>,
    /// Confidence floor override for this call. `None` uses the
    /// configured global floor.
    pub min_confidence: Option<f64>,
}

impl ExtractionRequest {
    /// A request with no per-call overrides.
    pub fn new(chapter_id: impl Into<String>, text: impl Into<String>) -> Self {
        ExtractionRequest {
            chapter_id: chapter_id.into(),
            text: text.into(),
            strategy: None,
            min_confidence: None,
        }
    }

    /// Pins the strategy for this call.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Why a dispatched engine produced no usable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineFailure {
    /// Engine identifier.
    pub engine: String,
    /// Human-readable failure reason.
    pub reason: String,
    /// True when the engine exceeded its configured deadline rather
    /// than returning an error.
    pub timed_out: bool,
}

/// Observability counters for one extraction call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Strategy actually executed, after adaptive resolution.
    pub strategy_used: Strategy,
    /// Number of engines dispatched.
    pub engines_run: usize,
    /// Number of dispatched engines that failed or timed out.
    pub engines_failed: usize,
    /// Subset of failures that were deadline expiries.
    pub engines_timed_out: usize,
    /// Raw candidates collected across all engines, before voting.
    pub candidates_total: usize,
    /// Clusters formed during deduplication.
    pub clusters_total: usize,
    /// Clusters with agreement from two or more engines.
    pub clusters_merged: usize,
    /// Clusters rejected by the consensus threshold.
    pub below_threshold: usize,
    /// Fraction of clusters that survived voting, in `[0, 1]`.
    pub consensus_rate: f64,
    /// Wall-clock duration of the call in milliseconds.
    pub elapsed_ms: u64,
}

/// The outcome of one extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Chapter identifier from the request.
    pub chapter_id: String,
    /// Merged, scored descriptions ordered by descending priority.
    pub descriptions: Vec<MergedDescription>,
    /// Raw per-engine candidates, keyed by engine identifier.
    pub processor_results: BTreeMap<String, Vec<DescriptionCandidate>>,
    /// Engines that returned usable output, sorted by identifier.
    pub engines_used: Vec<String>,
    /// Engines that were dispatched but produced nothing.
    pub failures: Vec<EngineFailure>,
    /// Counters describing how the call went.
    pub quality_metrics: QualityMetrics,
}

impl ProcessingResult {
    /// An empty result for a call that had nothing to extract.
    pub fn empty(chapter_id: String, strategy: Strategy) -> Self {
        ProcessingResult {
            chapter_id,
            descriptions: Vec::new(),
            processor_results: BTreeMap::new(),
            engines_used: Vec::new(),
            failures: Vec::new(),
            quality_metrics: QualityMetrics {
                strategy_used: strategy,
                ..QualityMetrics::default()
            },
        }
    }
}
