//! Span module - character offsets into the original chapter text

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` into the original chapter text.
///
/// Spans always refer to original-text coordinates: engines that work on
/// chunks translate their local offsets before a candidate leaves the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive), in characters
    pub start: usize,
    /// End offset (exclusive), in characters
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// Returns `None` when `start >= end`, which no valid excerpt can have.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Length of the span in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans are never empty by construction; kept for clippy symmetry
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Shift both offsets by `base`, translating chunk-local coordinates
    /// into original-text coordinates.
    pub fn offset_by(&self, base: usize) -> Self {
        Self {
            start: self.start + base,
            end: self.end + base,
        }
    }

    /// Check that the span lies within a text of `text_len` characters
    pub fn within(&self, text_len: usize) -> bool {
        self.end <= text_len
    }

    /// Interval Jaccard: overlap length divided by union length.
    ///
    /// Returns a value in [0.0, 1.0]; disjoint spans score 0.0 and identical
    /// spans score 1.0. Two engines reporting slightly different boundaries
    /// for the same excerpt typically score well above 0.5.
    pub fn overlap_ratio(&self, other: &Span) -> f64 {
        let overlap_start = self.start.max(other.start);
        let overlap_end = self.end.min(other.end);
        if overlap_start >= overlap_end {
            return 0.0;
        }
        let intersection = (overlap_end - overlap_start) as f64;
        let union_start = self.start.min(other.start);
        let union_end = self.end.max(other.end);
        let union = (union_end - union_start) as f64;
        intersection / union
    }
}
