//! Illustration priority scoring for merged descriptions.

use illuminate_domain::MergedDescription;

/// Visual-detail cues that raise a description's illustration value.
/// Stems, matched case-insensitively, covering English and Russian prose.
const DETAIL_CUES: &[&str] = &[
    "golden",
    "silver",
    "crimson",
    "emerald",
    "ancient",
    "weathered",
    "ornate",
    "carved",
    "gleaming",
    "shadow",
    "mist",
    "moonlight",
    "candlelight",
    "золот",
    "серебр",
    "багров",
    "древн",
    "резн",
    "тен",
    "туман",
    "лунн",
    "мерца",
];

/// Excerpts inside this word range illustrate well; shorter ones lack
/// detail and longer ones lack focus.
const IDEAL_WORDS_MIN: usize = 8;
const IDEAL_WORDS_MAX: usize = 60;

const CONFIDENCE_BONUS_SCALE: f64 = 30.0;
const LENGTH_PENALTY_PER_WORD: f64 = 0.5;
const LENGTH_PENALTY_CAP: f64 = 15.0;
const DETAIL_BONUS_PER_CUE: f64 = 2.5;
const DETAIL_BONUS_CAP: f64 = 10.0;

/// Assigns each merged description a priority in `[0, 100]` and orders
/// the batch by it.
///
/// Scoring is a pure function of the description itself, so the same
/// input batch always comes out in the same order. The sort is stable:
/// equal priorities keep their deduplication-emission order.
pub struct QualityScorer;

impl QualityScorer {
    /// Score every description in place, then sort by descending priority.
    pub fn score_and_rank(descriptions: &mut [MergedDescription]) {
        for description in descriptions.iter_mut() {
            description.priority_score = Self::priority(description);
        }
        descriptions.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    }

    fn priority(description: &MergedDescription) -> f64 {
        let base = description.description_type.base_priority();
        let confidence_bonus = description.weighted_score * CONFIDENCE_BONUS_SCALE;
        let length_penalty = Self::length_penalty(description);
        let detail_bonus = Self::detail_bonus(&description.content);
        (base + confidence_bonus - length_penalty + detail_bonus).clamp(0.0, 100.0)
    }

    fn length_penalty(description: &MergedDescription) -> f64 {
        let words = description.content.split_whitespace().count();
        let distance = if words < IDEAL_WORDS_MIN {
            IDEAL_WORDS_MIN - words
        } else if words > IDEAL_WORDS_MAX {
            words - IDEAL_WORDS_MAX
        } else {
            0
        };
        (distance as f64 * LENGTH_PENALTY_PER_WORD).min(LENGTH_PENALTY_CAP)
    }

    fn detail_bonus(content: &str) -> f64 {
        let lowered = content.to_lowercase();
        let hits = DETAIL_CUES
            .iter()
            .filter(|cue| lowered.contains(*cue))
            .count();
        (hits as f64 * DETAIL_BONUS_PER_CUE).min(DETAIL_BONUS_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use illuminate_domain::{DescriptionType, Span};
    use std::collections::BTreeSet;

    fn merged(
        content: &str,
        description_type: DescriptionType,
        weighted_score: f64,
        start: usize,
        end: usize,
    ) -> MergedDescription {
        MergedDescription {
            content: content.to_string(),
            description_type,
            confidence: weighted_score,
            span: Span::new(start, end).unwrap(),
            entities_mentioned: vec![],
            consensus_count: 1,
            contributing_engines: BTreeSet::new(),
            weighted_score,
            priority_score: 0.0,
        }
    }

    #[test]
    fn test_scores_stay_in_range() {
        let mut batch = vec![
            merged("x y", DescriptionType::Action, 0.0, 0, 3),
            merged(
                "the ancient golden hall gleaming with carved silver and ornate shadow work under moonlight",
                DescriptionType::Location,
                1.0,
                0,
                90,
            ),
        ];
        QualityScorer::score_and_rank(&mut batch);
        for d in &batch {
            assert!((0.0..=100.0).contains(&d.priority_score), "{}", d.priority_score);
        }
    }

    #[test]
    fn test_location_outranks_action_at_equal_score() {
        let mut batch = vec![
            merged("a sudden leap across the narrow icy chasm below", DescriptionType::Action, 0.8, 0, 47),
            merged("a stone bridge across the narrow icy chasm below", DescriptionType::Location, 0.8, 50, 98),
        ];
        QualityScorer::score_and_rank(&mut batch);
        assert_eq!(batch[0].description_type, DescriptionType::Location);
    }

    #[test]
    fn test_higher_consensus_score_ranks_first_within_type() {
        let mut batch = vec![
            merged("a quiet village green beneath the old clock tower", DescriptionType::Location, 0.6, 0, 49),
            merged("a quiet harbor town beneath the old lighthouse hill", DescriptionType::Location, 0.9, 60, 111),
        ];
        QualityScorer::score_and_rank(&mut batch);
        assert!(batch[0].weighted_score > batch[1].weighted_score);
    }

    #[test]
    fn test_visual_detail_raises_priority() {
        let mut plain = vec![merged(
            "the hall was large and people stood around in it",
            DescriptionType::Location,
            0.7,
            0,
            48,
        )];
        let mut vivid = vec![merged(
            "the golden hall lay in shadow under gleaming candlelight",
            DescriptionType::Location,
            0.7,
            0,
            56,
        )];
        QualityScorer::score_and_rank(&mut plain);
        QualityScorer::score_and_rank(&mut vivid);
        assert!(vivid[0].priority_score > plain[0].priority_score);
    }

    #[test]
    fn test_very_short_excerpt_penalized() {
        let mut batch = vec![
            merged("dark tower", DescriptionType::Location, 0.7, 0, 10),
            merged(
                "the dark tower stood alone on the wide empty plain",
                DescriptionType::Location,
                0.7,
                20,
                70,
            ),
        ];
        QualityScorer::score_and_rank(&mut batch);
        assert_eq!(batch[0].span.start, 20);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = merged("an iron gate wrought with thorned vines and leaves", DescriptionType::Object, 0.5, 0, 50);
        let second = merged("an oak door banded with rough iron and old nails", DescriptionType::Object, 0.5, 60, 108);
        let mut batch = vec![first.clone(), second];
        QualityScorer::score_and_rank(&mut batch);
        assert_eq!(batch[0].span, first.span);
    }
}
