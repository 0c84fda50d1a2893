//! LLM-based chunked extraction engine
//!
//! Splits long chapters with `TextChunker`, runs one structured-output
//! extraction call per chunk, anchors returned excerpts back to
//! original-text character coordinates, and post-filters by length bounds
//! and confidence before candidates leave the engine.

use crate::chunking::{Chunk, ChunkerConfig, TextChunker};
use crate::engine::{DescriptionEngine, EngineError};
use crate::parser::parse_llm_response;
use crate::prompt::PromptBuilder;
use async_trait::async_trait;
use illuminate_domain::{DescriptionCandidate, Span};
use illuminate_llm::LlmProvider;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tuning knobs for the LLM engine
#[derive(Debug, Clone)]
pub struct LlmEngineOptions {
    /// Chunking limits for long chapters
    pub chunker: ChunkerConfig,
    /// Candidates below this confidence are dropped before returning
    pub min_confidence: f64,
    /// Minimum excerpt length in characters
    pub min_description_length: usize,
    /// Maximum excerpt length in characters
    pub max_description_length: usize,
    /// Optional language hint forwarded into the prompt
    pub language_hint: Option<String>,
}

impl Default for LlmEngineOptions {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            min_confidence: 0.3,
            min_description_length: 15,
            max_description_length: 600,
            language_hint: None,
        }
    }
}

/// Chunked LLM extraction engine
///
/// Higher recall and semantic quality than the local engines, at higher
/// latency and cost. Shares its provider across concurrent calls.
pub struct LlmEngine {
    provider: Arc<dyn LlmProvider>,
    chunker: TextChunker,
    options: LlmEngineOptions,
    name: String,
}

impl LlmEngine {
    /// Create an engine over the given provider with default options
    pub fn new(provider: Arc<dyn LlmProvider>) -> Result<Self, EngineError> {
        Self::with_options(provider, LlmEngineOptions::default())
    }

    /// Create an engine with explicit options
    pub fn with_options(
        provider: Arc<dyn LlmProvider>,
        options: LlmEngineOptions,
    ) -> Result<Self, EngineError> {
        let chunker = TextChunker::new(options.chunker).map_err(EngineError::Failed)?;
        Ok(Self {
            provider,
            chunker,
            options,
            name: "llm".to_string(),
        })
    }

    /// Override the engine name (when several LLM engines coexist)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn extract_chunk(
        &self,
        chunk: &Chunk,
    ) -> Result<Vec<DescriptionCandidate>, EngineError> {
        let mut builder = PromptBuilder::new(chunk.text.clone());
        if let Some(language) = &self.options.language_hint {
            builder = builder.with_language_hint(language.clone());
        }
        let prompt = builder.build();

        debug!(engine = %self.name, prompt_chars = prompt.len(), "calling LLM");

        let response = self
            .provider
            .generate(&prompt)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        let raw_candidates = parse_llm_response(&response)?;

        let mut candidates = Vec::new();
        for raw in raw_candidates {
            let excerpt_chars = raw.content.chars().count();
            if excerpt_chars < self.options.min_description_length
                || excerpt_chars > self.options.max_description_length
            {
                continue;
            }
            if raw.confidence < self.options.min_confidence {
                continue;
            }

            // Anchor the verbatim excerpt inside the chunk; a paraphrased
            // excerpt cannot be located and is dropped
            let Some(byte_idx) = chunk.text.find(&raw.content) else {
                warn!(
                    engine = %self.name,
                    "excerpt not found verbatim in chunk, dropping candidate"
                );
                continue;
            };
            let local_start = chunk.text[..byte_idx].chars().count();
            let start = chunk.base_offset + local_start;
            let Some(span) = Span::new(start, start + excerpt_chars) else {
                continue;
            };

            candidates.push(DescriptionCandidate {
                content: raw.content,
                description_type: raw.description_type,
                confidence: raw.confidence,
                span,
                source_engine: self.name.clone(),
                entities_mentioned: raw.entities,
            });
        }

        Ok(candidates)
    }

    /// Drop duplicates produced by chunk overlap regions, keeping the
    /// higher-confidence copy
    fn dedup_overlap(candidates: Vec<DescriptionCandidate>) -> Vec<DescriptionCandidate> {
        let mut best: BTreeMap<(usize, usize, u8), DescriptionCandidate> = BTreeMap::new();
        for candidate in candidates {
            let key = (
                candidate.span.start,
                candidate.span.end,
                candidate.description_type.priority_rank(),
            );
            match best.get(&key) {
                Some(existing) if existing.confidence >= candidate.confidence => {}
                _ => {
                    best.insert(key, candidate);
                }
            }
        }
        best.into_values().collect()
    }
}

#[async_trait]
impl DescriptionEngine for LlmEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_weight(&self) -> f64 {
        1.2
    }

    async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    async fn extract(&self, text: &str) -> Result<Vec<DescriptionCandidate>, EngineError> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            engine = %self.name,
            chunks = chunks.len(),
            chars = text.chars().count(),
            "starting chunked extraction"
        );

        let mut all_candidates = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(engine = %self.name, "processing chunk {}/{}", idx + 1, chunks.len());
            let chunk_candidates = self.extract_chunk(chunk).await?;
            all_candidates.extend(chunk_candidates);
        }

        let candidates = Self::dedup_overlap(all_candidates);

        info!(
            engine = %self.name,
            candidates = candidates.len(),
            "chunked extraction complete"
        );

        Ok(candidates)
    }
}
