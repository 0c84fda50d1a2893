//! Fast local cue-based extraction engine
//!
//! Classifies sentences by counting visual-description cue words per
//! category. Low latency and always available, at lower recall than the
//! LLM engine; in ensemble mode its votes mostly corroborate.
//!
//! Cue lists cover English and Russian prose, matched as lowercase stems so
//! inflected forms still hit.

use crate::engine::{DescriptionEngine, EngineError};
use async_trait::async_trait;
use illuminate_domain::{DescriptionCandidate, DescriptionType, Span};
use tracing::debug;

const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Cue stems per category, lowercase
const LOCATION_CUES: &[&str] = &[
    "castle", "hill", "forest", "room", "house", "mountain", "valley", "street", "tower",
    "garden", "village", "hall", "field", "shore", "замок", "холм", "лес", "комнат", "дом",
    "гора", "горы", "долин", "улиц", "башн", "сад", "деревн", "зал", "поле", "берег",
];

const CHARACTER_CUES: &[&str] = &[
    "eyes", "hair", "face", "tall", "wore", "dressed", "smile", "beard", "cloak", "глаза",
    "волос", "лицо", "высок", "одет", "улыб", "борода", "плащ", "смотрел", "смотрела",
];

const ATMOSPHERE_CUES: &[&str] = &[
    "dark", "mist", "fog", "gloom", "silence", "shadow", "twilight", "storm", "dawn",
    "туман", "мрак", "тишин", "тень", "тени", "сумерк", "гроза", "рассвет", "тревог",
];

const OBJECT_CUES: &[&str] = &[
    "sword", "ring", "book", "lamp", "mirror", "chest", "goblet", "letter", "меч",
    "кольц", "книг", "ламп", "зеркал", "сундук", "кубок", "письм",
];

const ACTION_CUES: &[&str] = &[
    "ran", "leapt", "struck", "galloped", "fell", "climbed", "бежал", "прыгн", "удари",
    "скакал", "упал", "взбирал",
];

/// Descriptive verbs that mark scene-setting prose
const SCENE_VERBS: &[&str] = &[
    "rose", "stood", "stretched", "towered", "loomed", "возвышал", "стоял", "тянул",
    "высил", "раскинул",
];

/// Function words that open sentences capitalized without being names
const SENTENCE_FUNCTION_WORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "by", "under", "over", "he", "she", "it", "they",
    "we", "you", "but", "and", "then", "when", "there", "и", "а", "но", "в", "на", "у",
    "из", "под", "над", "он", "она", "оно", "они", "мы", "вы", "его", "её", "их", "когда",
    "там", "потом", "затем",
];

const BASE_CONFIDENCE: f64 = 0.4;
const CONFIDENCE_PER_CUE: f64 = 0.15;
const MAX_CONFIDENCE: f64 = 0.85;
const MIN_SENTENCE_WORDS: usize = 4;

/// Cue-based sentence classifier
pub struct HeuristicEngine {
    min_confidence: f64,
}

impl HeuristicEngine {
    /// Create an engine with the default confidence floor
    pub fn new() -> Self {
        Self {
            min_confidence: 0.4,
        }
    }

    /// Create with a custom confidence floor
    pub fn with_min_confidence(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    fn classify(sentence_lower: &str) -> Option<(DescriptionType, usize)> {
        let count = |cues: &[&str]| {
            cues.iter()
                .filter(|cue| sentence_lower.contains(*cue))
                .count()
        };

        let mut scores = [
            (DescriptionType::Location, count(LOCATION_CUES) + count(SCENE_VERBS)),
            (DescriptionType::Character, count(CHARACTER_CUES)),
            (DescriptionType::Atmosphere, count(ATMOSPHERE_CUES)),
            (DescriptionType::Object, count(OBJECT_CUES)),
            (DescriptionType::Action, count(ACTION_CUES)),
        ];

        // Stable by construction: scores are listed in priority order, so
        // max_by_key on hits alone resolves ties toward Location first
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        let (winner, hits) = scores[0];
        (hits > 0).then_some((winner, hits))
    }

    /// Capitalized tokens in order, deduplicated.
    ///
    /// The opening word only counts when it is not a function word or a cue
    /// stem, so "Иван смотрел..." yields Иван while "Старый замок..." does
    /// not yield the adjective for known stems like "высок".
    fn harvest_entities(sentence: &str) -> Vec<String> {
        let mut entities: Vec<String> = Vec::new();
        for (idx, token) in sentence.split_whitespace().enumerate() {
            let cleaned: String = token
                .trim_matches(|c: char| !c.is_alphabetic())
                .to_string();
            let mut chars = cleaned.chars();
            let is_name = matches!(chars.next(), Some(first) if first.is_uppercase())
                && cleaned.chars().count() >= 2;
            if !is_name {
                continue;
            }
            if idx == 0 && Self::is_common_word(&cleaned.to_lowercase()) {
                continue;
            }
            if !entities.contains(&cleaned) {
                entities.push(cleaned);
            }
        }
        entities
    }

    fn is_common_word(lower: &str) -> bool {
        SENTENCE_FUNCTION_WORDS.contains(&lower)
            || [
                LOCATION_CUES,
                CHARACTER_CUES,
                ATMOSPHERE_CUES,
                OBJECT_CUES,
                ACTION_CUES,
                SCENE_VERBS,
            ]
            .iter()
            .any(|cues| cues.iter().any(|cue| lower.starts_with(cue)))
    }
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DescriptionEngine for HeuristicEngine {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn default_weight(&self) -> f64 {
        0.8
    }

    async fn extract(&self, text: &str) -> Result<Vec<DescriptionCandidate>, EngineError> {
        let chars: Vec<char> = text.chars().collect();
        let mut candidates = Vec::new();

        let mut idx = 0usize;
        while idx < chars.len() {
            // Skip inter-sentence whitespace
            while idx < chars.len() && chars[idx].is_whitespace() {
                idx += 1;
            }
            if idx >= chars.len() {
                break;
            }

            let start = idx;
            while idx < chars.len() && !SENTENCE_TERMINATORS.contains(&chars[idx]) {
                idx += 1;
            }
            let content_end = idx;
            // Consume the terminator run ("?!", "...") into the span
            while idx < chars.len() && SENTENCE_TERMINATORS.contains(&chars[idx]) {
                idx += 1;
            }
            let span_end = idx;

            let sentence: String = chars[start..content_end].iter().collect();
            if sentence.split_whitespace().count() < MIN_SENTENCE_WORDS {
                continue;
            }

            let sentence_lower = sentence.to_lowercase();
            let Some((description_type, hits)) = Self::classify(&sentence_lower) else {
                continue;
            };

            let confidence =
                (BASE_CONFIDENCE + CONFIDENCE_PER_CUE * hits as f64).min(MAX_CONFIDENCE);
            if confidence < self.min_confidence {
                continue;
            }
            let Some(span) = Span::new(start, span_end) else {
                continue;
            };

            candidates.push(DescriptionCandidate {
                content: sentence.trim_end().to_string(),
                description_type,
                confidence,
                span,
                source_engine: self.name().to_string(),
                entities_mentioned: Self::harvest_entities(&sentence),
            });
        }

        debug!(
            candidates = candidates.len(),
            chars = chars.len(),
            "heuristic extraction complete"
        );

        Ok(candidates)
    }
}
