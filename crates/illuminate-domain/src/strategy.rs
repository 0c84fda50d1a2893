//! Strategy module - execution policies for the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution strategy controlling which engines run for one extraction call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Run only the highest-weight available engine. Fastest, lowest recall.
    Single,

    /// Run all available engines concurrently, vote with a permissive
    /// threshold to maximize recall.
    Parallel,

    /// Run engines one at a time in descending weight order, merging
    /// incrementally; may stop early once sufficient coverage is reached.
    Sequential,

    /// Run all available engines concurrently and apply the full weighted
    /// consensus vote. Default production mode.
    Ensemble,

    /// Choose Single/Sequential/Ensemble per call from text heuristics.
    Adaptive,
}

impl Strategy {
    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Single => "single",
            Strategy::Parallel => "parallel",
            Strategy::Sequential => "sequential",
            Strategy::Ensemble => "ensemble",
            Strategy::Adaptive => "adaptive",
        }
    }

    /// Parse a strategy from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(Strategy::Single),
            "parallel" => Some(Strategy::Parallel),
            "sequential" => Some(Strategy::Sequential),
            "ensemble" => Some(Strategy::Ensemble),
            "adaptive" => Some(Strategy::Adaptive),
            _ => None,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Ensemble
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
