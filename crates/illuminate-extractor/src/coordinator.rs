//! Strategy dispatch: which engines run, in what order, under what
//! deadlines.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use illuminate_config::{ConfigStore, GlobalSettings};
use illuminate_domain::{DescriptionCandidate, Strategy};
use illuminate_engines::DescriptionEngine;

use crate::error::ExtractionError;
use crate::registry::{ActiveEngine, EngineRegistry};
use crate::scorer::QualityScorer;
use crate::types::{EngineFailure, ExtractionRequest, ProcessingResult, QualityMetrics};
use crate::voter::{EnsembleVoter, VoteParams};

/// Adaptive mode picks Single below this many characters.
const ADAPTIVE_SINGLE_BELOW: usize = 1_500;
/// Adaptive mode picks Sequential below this many characters, Ensemble above.
const ADAPTIVE_SEQUENTIAL_BELOW: usize = 6_000;

/// Engines that completed one dispatch phase, with whatever they produced.
#[derive(Default)]
struct DispatchOutcome {
    /// Sanitized candidates per engine. An engine that completed but found
    /// nothing is present with an empty list; it still votes.
    completed: BTreeMap<String, Vec<DescriptionCandidate>>,
    failures: Vec<EngineFailure>,
    dispatched: usize,
}

impl DispatchOutcome {
    fn timed_out(&self) -> usize {
        self.failures.iter().filter(|f| f.timed_out).count()
    }
}

/// Runs extraction calls end to end: snapshot, dispatch, vote, rank.
///
/// The configuration snapshot is taken exactly once per call, so admin
/// writes landing mid-call only affect subsequent calls.
pub struct StrategyCoordinator {
    registry: EngineRegistry,
    config: Arc<ConfigStore>,
}

impl StrategyCoordinator {
    /// Build a coordinator over a populated registry.
    pub fn new(registry: EngineRegistry, config: Arc<ConfigStore>) -> Self {
        StrategyCoordinator { registry, config }
    }

    /// Extract, merge and rank descriptions for one chapter.
    ///
    /// Individual engine failures and timeouts are tolerated; the call
    /// only errors when no engine is available or every dispatched engine
    /// failed. Empty or whitespace-only text short-circuits to an empty
    /// result without touching any engine.
    pub async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ProcessingResult, ExtractionError> {
        let started = Instant::now();
        let snapshot = self.config.snapshot()?;
        let global = snapshot.global().clone();
        let requested = request.strategy.unwrap_or(global.default_strategy);

        if request.text.trim().is_empty() {
            debug!(chapter = %request.chapter_id, "empty chapter text, nothing to extract");
            return Ok(ProcessingResult::empty(request.chapter_id, requested));
        }

        let engines = self.registry.active_engines(&snapshot).await?;
        let strategy = match requested {
            Strategy::Adaptive => Self::adapt(&request.text, engines.len()),
            fixed => fixed,
        };
        info!(
            chapter = %request.chapter_id,
            strategy = %strategy,
            engines = engines.len(),
            "extraction dispatched"
        );

        let text: Arc<str> = Arc::from(request.text.as_str());
        let text_chars = text.chars().count();
        let min_confidence = request
            .min_confidence
            .unwrap_or(global.min_confidence)
            .clamp(0.0, 1.0);
        let deadline = started + global.call_timeout();
        let vote_params = VoteParams {
            consensus_threshold: global.threshold_for(strategy),
            single_engine_override: global.single_engine_override,
        };

        let outcome = match strategy {
            Strategy::Single => {
                self.run_serial(
                    &engines[..1],
                    &text,
                    text_chars,
                    min_confidence,
                    &global,
                    deadline,
                    None,
                )
                .await
            }
            Strategy::Sequential => {
                let stop = Some((vote_params, global.sufficient_coverage));
                self.run_serial(
                    &engines,
                    &text,
                    text_chars,
                    min_confidence,
                    &global,
                    deadline,
                    stop,
                )
                .await
            }
            _ => {
                self.run_concurrent(&engines, &text, text_chars, min_confidence, &global, deadline)
                    .await
            }
        };

        if outcome.completed.is_empty() {
            return Err(ExtractionError::AllEnginesFailed {
                failures: outcome.failures,
            });
        }

        let weights: BTreeMap<String, f64> = outcome
            .completed
            .keys()
            .map(|id| (id.clone(), snapshot.engine(id).map_or(0.0, |c| c.weight)))
            .collect();
        let vote = EnsembleVoter::vote(&outcome.completed, &weights, &vote_params);

        let mut descriptions = vote.descriptions;
        QualityScorer::score_and_rank(&mut descriptions);

        let candidates_total = outcome.completed.values().map(Vec::len).sum();
        let consensus_rate = if vote.clusters_total > 0 {
            descriptions.len() as f64 / vote.clusters_total as f64
        } else {
            0.0
        };
        let quality_metrics = QualityMetrics {
            strategy_used: strategy,
            engines_run: outcome.dispatched,
            engines_failed: outcome.failures.len(),
            engines_timed_out: outcome.timed_out(),
            candidates_total,
            clusters_total: vote.clusters_total,
            clusters_merged: vote.clusters_merged,
            below_threshold: vote.below_threshold,
            consensus_rate,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            chapter = %request.chapter_id,
            descriptions = descriptions.len(),
            failed = quality_metrics.engines_failed,
            elapsed_ms = quality_metrics.elapsed_ms,
            "extraction complete"
        );

        Ok(ProcessingResult {
            chapter_id: request.chapter_id,
            descriptions,
            engines_used: outcome.completed.keys().cloned().collect(),
            processor_results: outcome.completed,
            failures: outcome.failures,
            quality_metrics,
        })
    }

    /// Single and Sequential: engines run one at a time in descending
    /// weight order.
    ///
    /// With `early_stop` set, voting runs incrementally after every engine
    /// and the loop ends once enough descriptions survive, skipping the
    /// remaining (cheaper) engines entirely.
    #[allow(clippy::too_many_arguments)]
    async fn run_serial(
        &self,
        engines: &[ActiveEngine],
        text: &Arc<str>,
        text_chars: usize,
        min_confidence: f64,
        global: &GlobalSettings,
        deadline: Instant,
        early_stop: Option<(VoteParams, usize)>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for (idx, active) in engines.iter().enumerate() {
            if Instant::now() >= deadline {
                // Engines never reached still show up in the accounting,
                // mirroring the concurrent path
                debug!("call deadline reached, skipping remaining engines");
                for skipped in &engines[idx..] {
                    outcome.dispatched += 1;
                    outcome.failures.push(EngineFailure {
                        engine: skipped.id().to_string(),
                        reason: "call deadline reached".to_string(),
                        timed_out: true,
                    });
                }
                break;
            }
            outcome.dispatched += 1;
            let engine_deadline = deadline.min(Instant::now() + active.config.timeout());
            match Self::run_engine(&active.engine, text, engine_deadline).await {
                Ok(candidates) => {
                    let kept = Self::sanitize(
                        candidates,
                        text_chars,
                        active.config.confidence_threshold.max(min_confidence),
                        global,
                    );
                    outcome.completed.insert(active.id().to_string(), kept);
                }
                Err(failure) => {
                    warn!(engine = %failure.engine, reason = %failure.reason, "engine failed");
                    outcome.failures.push(failure);
                    continue;
                }
            }

            if let Some((params, sufficient)) = early_stop {
                let weights: BTreeMap<String, f64> = outcome
                    .completed
                    .keys()
                    .map(|id| {
                        let w = engines
                            .iter()
                            .find(|e| e.id() == id)
                            .map_or(0.0, |e| e.config.weight);
                        (id.clone(), w)
                    })
                    .collect();
                let merged = EnsembleVoter::vote(&outcome.completed, &weights, &params);
                if merged.descriptions.len() >= sufficient {
                    info!(
                        descriptions = merged.descriptions.len(),
                        "sufficient coverage reached, stopping early"
                    );
                    break;
                }
            }
        }
        outcome
    }

    /// Parallel and Ensemble: every engine runs concurrently under its own
    /// timeout, all bounded by the call deadline.
    ///
    /// On deadline expiry the remaining tasks are aborted and recorded as
    /// timed out; whatever completed is merged best-effort.
    async fn run_concurrent(
        &self,
        engines: &[ActiveEngine],
        text: &Arc<str>,
        text_chars: usize,
        min_confidence: f64,
        global: &GlobalSettings,
        deadline: Instant,
    ) -> DispatchOutcome {
        let mut join: JoinSet<(String, Result<Vec<DescriptionCandidate>, EngineFailure>)> =
            JoinSet::new();
        let mut thresholds: BTreeMap<String, f64> = BTreeMap::new();
        for active in engines {
            let id = active.id().to_string();
            thresholds.insert(id.clone(), active.config.confidence_threshold);
            let engine = Arc::clone(&active.engine);
            let text = Arc::clone(text);
            let engine_deadline = deadline.min(Instant::now() + active.config.timeout());
            join.spawn(async move {
                let result = Self::run_engine(&engine, &text, engine_deadline).await;
                (id, result)
            });
        }

        let mut outcome = DispatchOutcome {
            dispatched: engines.len(),
            ..DispatchOutcome::default()
        };
        while let Ok(Some(joined)) = timeout_at(deadline, join.join_next()).await {
            match joined {
                Ok((id, Ok(candidates))) => {
                    let kept = Self::sanitize(
                        candidates,
                        text_chars,
                        thresholds.get(&id).copied().unwrap_or(0.0).max(min_confidence),
                        global,
                    );
                    outcome.completed.insert(id, kept);
                }
                Ok((id, Err(failure))) => {
                    warn!(engine = %id, reason = %failure.reason, "engine failed");
                    outcome.failures.push(failure);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "engine task aborted");
                }
            }
        }
        join.abort_all();

        // Engines still running at the deadline are accounted as timeouts
        for active in engines {
            let id = active.id();
            let seen = outcome.completed.contains_key(id)
                || outcome.failures.iter().any(|f| f.engine == id);
            if !seen {
                outcome.failures.push(EngineFailure {
                    engine: id.to_string(),
                    reason: "call deadline reached".to_string(),
                    timed_out: true,
                });
            }
        }
        outcome
    }

    /// One engine call bounded by a deadline.
    async fn run_engine(
        engine: &Arc<dyn DescriptionEngine>,
        text: &str,
        deadline: Instant,
    ) -> Result<Vec<DescriptionCandidate>, EngineFailure> {
        match timeout_at(deadline, engine.extract(text)).await {
            Ok(Ok(candidates)) => Ok(candidates),
            Ok(Err(err)) => Err(EngineFailure {
                engine: engine.name().to_string(),
                reason: err.to_string(),
                timed_out: false,
            }),
            Err(_) => Err(EngineFailure {
                engine: engine.name().to_string(),
                reason: "engine timeout".to_string(),
                timed_out: true,
            }),
        }
    }

    /// Drop candidates that are malformed, under-confident or outside the
    /// configured excerpt length bounds.
    fn sanitize(
        candidates: Vec<DescriptionCandidate>,
        text_chars: usize,
        confidence_floor: f64,
        global: &GlobalSettings,
    ) -> Vec<DescriptionCandidate> {
        candidates
            .into_iter()
            .filter(|candidate| {
                if let Err(reason) = candidate.validate(text_chars) {
                    warn!(
                        engine = %candidate.source_engine,
                        %reason,
                        "dropping malformed candidate"
                    );
                    return false;
                }
                if candidate.confidence < confidence_floor {
                    return false;
                }
                let chars = candidate.content.chars().count();
                chars >= global.min_description_length && chars <= global.max_description_length
            })
            .collect()
    }

    /// Heuristic strategy choice for Adaptive mode.
    ///
    /// Short chapters rarely reward a multi-engine pass, so they get the
    /// single best engine; mid-length ones get the sequential ladder with
    /// its early stop; long chapters get the full ensemble.
    fn adapt(text: &str, engine_count: usize) -> Strategy {
        let chars = text.chars().count();
        if engine_count == 1 || chars < ADAPTIVE_SINGLE_BELOW {
            Strategy::Single
        } else if chars < ADAPTIVE_SEQUENTIAL_BELOW {
            Strategy::Sequential
        } else {
            Strategy::Ensemble
        }
    }
}
