//! Weighted consensus voting over per-engine candidates.
//!
//! The voter is pure: given the same candidates and weights it produces
//! byte-identical output, regardless of the order engines finished in.
//! All inputs arrive keyed by engine identifier in [`BTreeMap`]s, so
//! iteration order is fixed before any arithmetic happens.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use illuminate_domain::{DescriptionCandidate, MergedDescription};

/// Two spans referring to the same excerpt overlap at least this much.
pub const SPAN_OVERLAP_THRESHOLD: f64 = 0.5;

/// Two texts this similar are the same excerpt even when spans disagree.
pub const TEXT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Thresholds for one voting pass, taken from the config snapshot.
#[derive(Debug, Clone, Copy)]
pub struct VoteParams {
    /// Weighted score a cluster must reach to be kept.
    pub consensus_threshold: f64,
    /// A single-engine cluster whose own confidence reaches this is kept
    /// even below the consensus threshold.
    pub single_engine_override: f64,
}

/// Result of one voting pass.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// Surviving descriptions in deduplication-emission order.
    pub descriptions: Vec<MergedDescription>,
    /// Clusters formed before thresholding.
    pub clusters_total: usize,
    /// Clusters with candidates from two or more engines.
    pub clusters_merged: usize,
    /// Clusters rejected by the consensus threshold.
    pub below_threshold: usize,
}

struct Cluster<'a> {
    members: Vec<(&'a str, &'a DescriptionCandidate)>,
}

/// Merges duplicate candidates across engines and applies the weighted
/// consensus threshold.
pub struct EnsembleVoter;

impl EnsembleVoter {
    /// Run the two-phase vote: cluster duplicates, then score and filter.
    ///
    /// `weights` must hold every engine that completed this call, including
    /// engines that returned zero candidates; the weight sum is the
    /// normalization denominator, so an engine that found nothing still
    /// drags down the score of clusters it did not confirm. Engines that
    /// failed or timed out must not appear.
    pub fn vote(
        candidates_by_engine: &BTreeMap<String, Vec<DescriptionCandidate>>,
        weights: &BTreeMap<String, f64>,
        params: &VoteParams,
    ) -> VoteOutcome {
        let clusters = Self::cluster(candidates_by_engine);
        let clusters_total = clusters.len();
        let total_weight: f64 = weights.values().sum();

        let mut clusters_merged = 0;
        let mut below_threshold = 0;
        let mut scored: Vec<MergedDescription> = Vec::new();

        for cluster in &clusters {
            let merged = Self::merge_cluster(cluster, weights, total_weight);
            if merged.consensus_count >= 2 {
                clusters_merged += 1;
            }

            let single_override = merged.consensus_count == 1
                && merged.confidence >= params.single_engine_override
                && Self::cluster_weight(cluster, weights) > 0.0;

            if merged.weighted_score >= params.consensus_threshold || single_override {
                scored.push(merged);
            } else {
                debug!(
                    score = merged.weighted_score,
                    threshold = params.consensus_threshold,
                    content = %merged.content,
                    "cluster below consensus threshold"
                );
                below_threshold += 1;
            }
        }

        let descriptions = Self::resolve_cross_type_overlaps(scored);

        VoteOutcome {
            descriptions,
            clusters_total,
            clusters_merged,
            below_threshold,
        }
    }

    /// Phase one: greedy clustering in deterministic candidate order.
    ///
    /// Candidates are sorted by span, then type rank, then engine id, and
    /// each joins the first existing cluster any member of which refers to
    /// the same excerpt. Two candidates are the same excerpt when their
    /// spans overlap at least half while sharing a type, or when their
    /// normalized texts are nearly identical.
    fn cluster(
        candidates_by_engine: &BTreeMap<String, Vec<DescriptionCandidate>>,
    ) -> Vec<Cluster<'_>> {
        let mut flat: Vec<(&str, &DescriptionCandidate)> = candidates_by_engine
            .iter()
            .flat_map(|(engine, candidates)| {
                candidates.iter().map(move |c| (engine.as_str(), c))
            })
            .collect();
        flat.sort_by(|(ea, a), (eb, b)| {
            (a.span.start, a.span.end, a.description_type.priority_rank(), *ea).cmp(&(
                b.span.start,
                b.span.end,
                b.description_type.priority_rank(),
                *eb,
            ))
        });

        let mut clusters: Vec<Cluster<'_>> = Vec::new();
        for (engine, candidate) in flat {
            let slot = clusters.iter_mut().find(|cluster| {
                cluster
                    .members
                    .iter()
                    .any(|(_, member)| Self::same_excerpt(candidate, member))
            });
            match slot {
                Some(cluster) => cluster.members.push((engine, candidate)),
                None => clusters.push(Cluster {
                    members: vec![(engine, candidate)],
                }),
            }
        }
        clusters
    }

    fn same_excerpt(a: &DescriptionCandidate, b: &DescriptionCandidate) -> bool {
        if a.description_type == b.description_type
            && a.span.overlap_ratio(&b.span) >= SPAN_OVERLAP_THRESHOLD
        {
            return true;
        }
        text_similarity(&a.content, &b.content) >= TEXT_SIMILARITY_THRESHOLD
    }

    /// Phase two, per cluster: weight-normalized score and representative.
    ///
    /// Each engine votes once per cluster with its best candidate. The
    /// score is `sum(weight * confidence) / sum(all participating weights)`,
    /// so a cluster only one of three engines saw cannot score as high as
    /// one all three confirmed.
    fn merge_cluster(
        cluster: &Cluster<'_>,
        weights: &BTreeMap<String, f64>,
        total_weight: f64,
    ) -> MergedDescription {
        // Best confidence per contributing engine
        let mut votes: BTreeMap<&str, f64> = BTreeMap::new();
        for (engine, candidate) in &cluster.members {
            let entry = votes.entry(engine).or_insert(candidate.confidence);
            if candidate.confidence > *entry {
                *entry = candidate.confidence;
            }
        }

        let numerator: f64 = votes
            .iter()
            .map(|(engine, confidence)| weights.get(*engine).copied().unwrap_or(0.0) * confidence)
            .sum();
        let weighted_score = if total_weight > 0.0 {
            (numerator / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let representative = Self::representative(cluster, weights);
        let contributing_engines: BTreeSet<String> =
            votes.keys().map(|e| e.to_string()).collect();

        MergedDescription {
            content: representative.content.clone(),
            description_type: representative.description_type,
            confidence: representative.confidence,
            span: representative.span,
            entities_mentioned: representative.entities_mentioned.clone(),
            consensus_count: contributing_engines.len(),
            contributing_engines,
            weighted_score,
            priority_score: 0.0,
        }
    }

    /// The candidate whose content and span the merged record carries:
    /// highest-weight engine wins, ties broken by engine id, then by higher
    /// confidence, then by earlier span.
    fn representative<'a>(
        cluster: &'a Cluster<'_>,
        weights: &BTreeMap<String, f64>,
    ) -> &'a DescriptionCandidate {
        let mut best = cluster.members[0];
        for &(engine, candidate) in &cluster.members[1..] {
            let (best_engine, best_candidate) = best;
            let w = weights.get(engine).copied().unwrap_or(0.0);
            let best_w = weights.get(best_engine).copied().unwrap_or(0.0);
            let better = w > best_w
                || (w == best_w
                    && (engine < best_engine
                        || (engine == best_engine
                            && (candidate.confidence > best_candidate.confidence
                                || (candidate.confidence == best_candidate.confidence
                                    && candidate.span.start < best_candidate.span.start)))));
            if better {
                best = (engine, candidate);
            }
        }
        best.1
    }

    fn cluster_weight(cluster: &Cluster<'_>, weights: &BTreeMap<String, f64>) -> f64 {
        let engines: BTreeSet<&str> = cluster.members.iter().map(|(e, _)| *e).collect();
        engines
            .iter()
            .map(|e| weights.get(*e).copied().unwrap_or(0.0))
            .sum()
    }

    /// Surviving clusters of different types can still claim the same text
    /// region. Keep the higher-scored one; ties go to the higher-priority
    /// type, then to the earlier span.
    fn resolve_cross_type_overlaps(
        mut accepted: Vec<MergedDescription>,
    ) -> Vec<MergedDescription> {
        let mut order: Vec<usize> = (0..accepted.len()).collect();
        order.sort_by(|&a, &b| {
            accepted[b]
                .weighted_score
                .total_cmp(&accepted[a].weighted_score)
                .then_with(|| {
                    accepted[a]
                        .description_type
                        .priority_rank()
                        .cmp(&accepted[b].description_type.priority_rank())
                })
                .then_with(|| accepted[a].span.start.cmp(&accepted[b].span.start))
        });

        let mut keep = vec![false; accepted.len()];
        let mut kept_spans: Vec<illuminate_domain::Span> = Vec::new();
        for idx in order {
            let span = accepted[idx].span;
            let claimed = kept_spans
                .iter()
                .any(|kept| kept.overlap_ratio(&span) >= SPAN_OVERLAP_THRESHOLD);
            if !claimed {
                keep[idx] = true;
                kept_spans.push(span);
            }
        }

        let mut idx = 0;
        accepted.retain(|_| {
            let kept = keep[idx];
            idx += 1;
            kept
        });
        accepted
    }
}

/// Similarity of two excerpt texts after normalization, in [0.0, 1.0].
///
/// Exact matches score 1.0 and containment scores just at the merge
/// threshold, which is how two engines quoting the same sentence at
/// slightly different lengths get folded together. Everything else falls
/// back to word-set Jaccard.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_text(a);
    let nb = normalize_text(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return TEXT_SIMILARITY_THRESHOLD;
    }
    let wa: BTreeSet<&str> = na.split_whitespace().collect();
    let wb: BTreeSet<&str> = nb.split_whitespace().collect();
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Lowercased, whitespace-collapsed, punctuation-stripped text.
fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
