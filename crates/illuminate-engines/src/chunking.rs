//! Offset-tracking text chunking for engines with bounded context windows
//!
//! Chunks carry an absolute base offset (in characters) so candidate spans
//! found inside a chunk can be translated back to original-text coordinates.
//! Consecutive chunks may share an overlap region so descriptions straddling
//! a boundary are seen whole by at least one chunk.

use tracing::debug;

/// Sentence terminators considered safe break points
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Chunking limits, all measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Hard upper bound on chunk length
    pub max_chunk_chars: usize,
    /// Preferred lower bound; break points below it are skipped when possible
    pub min_chunk_chars: usize,
    /// Number of trailing characters repeated at the start of the next chunk
    pub overlap_chars: usize,
}

impl ChunkerConfig {
    /// Validate the limits
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_chars == 0 {
            return Err("max_chunk_chars must be greater than 0".to_string());
        }
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(format!(
                "min_chunk_chars {} cannot exceed max_chunk_chars {}",
                self.min_chunk_chars, self.max_chunk_chars
            ));
        }
        if self.overlap_chars >= self.max_chunk_chars {
            return Err(format!(
                "overlap_chars {} must be below max_chunk_chars {}",
                self.overlap_chars, self.max_chunk_chars
            ));
        }
        Ok(())
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 4_000,
            min_chunk_chars: 500,
            overlap_chars: 200,
        }
    }
}

/// One bounded segment of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, a verbatim slice of the original
    pub text: String,
    /// Absolute character offset of the chunk's first character
    pub base_offset: usize,
    /// Leading characters duplicated from the previous chunk
    pub overlap: usize,
}

impl Chunk {
    /// Character length of the chunk
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits long chapter text into bounded, overlap-aware segments
///
/// Prefers paragraph boundaries, falls back to sentence ends, then to
/// whitespace, and hard-cuts only when a single word exceeds the limit.
/// Chunks tile the entire input without gaps: concatenating chunk texts
/// minus their overlap prefixes reconstructs the original exactly.
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    /// Create a chunker with validated limits
    pub fn new(config: ChunkerConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunk the given text
    ///
    /// Empty or whitespace-only input yields no chunks, which the caller
    /// treats as an empty extraction result rather than an error.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, so char-indexed slices are cheap
        let chars: Vec<char> = text.chars().collect();
        let mut bounds: Vec<usize> = Vec::with_capacity(chars.len() + 1);
        for (byte_idx, _) in text.char_indices() {
            bounds.push(byte_idx);
        }
        bounds.push(text.len());

        let total = chars.len();
        if total <= self.config.max_chunk_chars {
            return vec![Chunk {
                text: text.to_string(),
                base_offset: 0,
                overlap: 0,
            }];
        }

        let paragraph_breaks = Self::paragraph_breaks(&chars);
        let sentence_breaks = Self::sentence_breaks(&chars);
        let word_breaks = Self::word_breaks(&chars);

        let mut chunks = Vec::new();
        let mut core_start = 0usize;

        while core_start < total {
            let remaining = total - core_start;
            let core_end = if remaining <= self.config.max_chunk_chars {
                total
            } else {
                let limit = core_start + self.config.max_chunk_chars;
                let floor = core_start + self.config.min_chunk_chars.max(1);
                Self::last_break_in(&paragraph_breaks, floor, limit)
                    .or_else(|| Self::last_break_in(&sentence_breaks, floor, limit))
                    .or_else(|| Self::last_break_in(&word_breaks, floor, limit))
                    // No break point at all: a single overlong word gets cut
                    .unwrap_or(limit)
            };

            let overlap = if chunks.is_empty() {
                0
            } else {
                self.config.overlap_chars.min(core_start)
            };
            let chunk_start = core_start - overlap;

            chunks.push(Chunk {
                text: text[bounds[chunk_start]..bounds[core_end]].to_string(),
                base_offset: chunk_start,
                overlap,
            });

            core_start = core_end;
        }

        debug!(
            total_chars = total,
            chunk_count = chunks.len(),
            "text chunked"
        );

        chunks
    }

    /// Positions where a new paragraph starts (first char after a blank line)
    fn paragraph_breaks(chars: &[char]) -> Vec<usize> {
        let mut breaks = Vec::new();
        let mut newline_run = 0usize;
        for (idx, &c) in chars.iter().enumerate() {
            if c == '\n' {
                newline_run += 1;
            } else {
                if newline_run >= 2 {
                    breaks.push(idx);
                }
                newline_run = 0;
            }
        }
        breaks
    }

    /// Positions following a sentence terminator plus whitespace
    fn sentence_breaks(chars: &[char]) -> Vec<usize> {
        let mut breaks = Vec::new();
        for idx in 2..chars.len() {
            if !chars[idx].is_whitespace()
                && chars[idx - 1].is_whitespace()
                && SENTENCE_TERMINATORS.contains(&chars[idx - 2])
            {
                breaks.push(idx);
            }
        }
        breaks
    }

    /// Positions at the start of a word (after any whitespace)
    fn word_breaks(chars: &[char]) -> Vec<usize> {
        let mut breaks = Vec::new();
        for idx in 1..chars.len() {
            if !chars[idx].is_whitespace() && chars[idx - 1].is_whitespace() {
                breaks.push(idx);
            }
        }
        breaks
    }

    /// Last break position within `(floor, limit]`, if any
    fn last_break_in(breaks: &[usize], floor: usize, limit: usize) -> Option<usize> {
        let upper = breaks.partition_point(|&b| b <= limit);
        if upper == 0 {
            return None;
        }
        let candidate = breaks[upper - 1];
        (candidate > floor).then_some(candidate)
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}
