//! Description module - the fundamental unit of Illuminate's extraction pipeline

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of a visual description excerpt
///
/// Ordered by illustration priority: when two merged descriptions tie on
/// weighted score, a LOCATION wins over a CHARACTER, and so on down the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionType {
    /// Scene or setting: a castle, a forest clearing, a drawing room
    Location,
    /// A character's appearance or visual presence
    Character,
    /// Mood, light, weather - the feel of a scene
    Atmosphere,
    /// A significant physical object
    Object,
    /// A visually distinctive action or movement
    Action,
}

impl DescriptionType {
    /// All types, in priority order (highest first)
    pub const ALL: [DescriptionType; 5] = [
        DescriptionType::Location,
        DescriptionType::Character,
        DescriptionType::Atmosphere,
        DescriptionType::Object,
        DescriptionType::Action,
    ];

    /// Tie-break rank: lower is better (Location beats Character, etc.)
    pub fn priority_rank(&self) -> u8 {
        match self {
            DescriptionType::Location => 0,
            DescriptionType::Character => 1,
            DescriptionType::Atmosphere => 2,
            DescriptionType::Object => 3,
            DescriptionType::Action => 4,
        }
    }

    /// Base priority contribution for quality scoring, on the 0-100 scale
    pub fn base_priority(&self) -> f64 {
        match self {
            DescriptionType::Location => 40.0,
            DescriptionType::Character => 35.0,
            DescriptionType::Atmosphere => 30.0,
            DescriptionType::Object => 25.0,
            DescriptionType::Action => 20.0,
        }
    }

    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionType::Location => "location",
            DescriptionType::Character => "character",
            DescriptionType::Atmosphere => "atmosphere",
            DescriptionType::Object => "object",
            DescriptionType::Action => "action",
        }
    }

    /// Parse a type from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "location" => Some(DescriptionType::Location),
            "character" => Some(DescriptionType::Character),
            "atmosphere" => Some(DescriptionType::Atmosphere),
            "object" => Some(DescriptionType::Object),
            "action" => Some(DescriptionType::Action),
            _ => None,
        }
    }
}

impl fmt::Display for DescriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One engine's proposed excerpt: type, confidence and character span.
///
/// Candidates are transient - they exist between an engine call and the
/// consensus vote, after which only merged descriptions survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionCandidate {
    /// Excerpt text, verbatim from the source
    pub content: String,

    /// Category of the description
    pub description_type: DescriptionType,

    /// Engine's own confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Character span into the original chapter text
    pub span: Span,

    /// Identifier of the engine that produced this candidate
    pub source_engine: String,

    /// Entities mentioned in the excerpt, in order of appearance
    pub entities_mentioned: Vec<String>,
}

impl DescriptionCandidate {
    /// Validate candidate invariants against the source text length
    pub fn validate(&self, text_len: usize) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("content is empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence {} out of range [0.0, 1.0]",
                self.confidence
            ));
        }
        if !self.span.within(text_len) {
            return Err(format!(
                "span ({}, {}) exceeds text length {}",
                self.span.start, self.span.end, text_len
            ));
        }
        if self.source_engine.is_empty() {
            return Err("source_engine is empty".to_string());
        }
        Ok(())
    }

    /// Word count of the excerpt
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// A description candidate cluster after weighted consensus.
///
/// This is what the caller persists and what the downstream image queue
/// consumes, one unit of work per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedDescription {
    /// Excerpt text, taken verbatim from the highest-weight contributor
    pub content: String,

    /// Category of the description
    pub description_type: DescriptionType,

    /// Confidence of the representative candidate in [0.0, 1.0]
    pub confidence: f64,

    /// Character span of the representative candidate
    pub span: Span,

    /// Entities mentioned, from the representative candidate
    pub entities_mentioned: Vec<String>,

    /// Number of engines whose candidates merged into this cluster
    pub consensus_count: usize,

    /// Engines that contributed a candidate to this cluster
    pub contributing_engines: BTreeSet<String>,

    /// Weight-normalized consensus score in [0.0, 1.0]
    pub weighted_score: f64,

    /// Illustration priority in [0.0, 100.0], filled by the quality scorer
    pub priority_score: f64,
}

impl MergedDescription {
    /// Dedup key for the downstream image queue: span plus type.
    ///
    /// The queue treats each unique key as one unit of work, guaranteeing
    /// at-most-one image generation per description.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.description_type.as_str(),
            self.span.start,
            self.span.end
        )
    }
}
