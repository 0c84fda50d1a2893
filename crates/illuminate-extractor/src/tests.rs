//! End-to-end tests for the extraction pipeline

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use illuminate_config::{ConfigStore, EngineConfig, GlobalSettings};
    use illuminate_domain::{DescriptionCandidate, DescriptionType, Span, Strategy};
    use illuminate_engines::ScriptedEngine;

    use crate::{EngineRegistry, ExtractionError, ExtractionRequest, StrategyCoordinator};

    const RUSSIAN_TEXT: &str =
        "Старый замок возвышался на холме. Высокая женщина в сером плаще стояла у ворот.";

    fn candidate(
        content: &str,
        description_type: DescriptionType,
        confidence: f64,
        start: usize,
        end: usize,
    ) -> DescriptionCandidate {
        DescriptionCandidate {
            content: content.to_string(),
            description_type,
            confidence,
            span: Span::new(start, end).unwrap(),
            source_engine: String::new(), // rewritten by ScriptedEngine
            entities_mentioned: vec![],
        }
    }

    fn coordinator_with(
        store: Arc<ConfigStore>,
        engines: Vec<ScriptedEngine>,
    ) -> StrategyCoordinator {
        let mut registry = EngineRegistry::new(Arc::clone(&store));
        for engine in engines {
            registry.register(Arc::new(engine)).unwrap();
        }
        StrategyCoordinator::new(registry, store)
    }

    #[tokio::test]
    async fn test_russian_two_engine_consensus() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut settings = GlobalSettings::default();
        settings.single_engine_override = 0.75;
        store.set_global(&settings).unwrap();

        let alpha = ScriptedEngine::new(
            "alpha",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        )
        .with_weight_hint(1.0);
        let beta = ScriptedEngine::new(
            "beta",
            vec![
                candidate(
                    "замок возвышался на холме",
                    DescriptionType::Location,
                    0.85,
                    7,
                    32,
                ),
                candidate(
                    "Высокая женщина в сером плаще стояла",
                    DescriptionType::Character,
                    0.8,
                    34,
                    70,
                ),
            ],
        )
        .with_weight_hint(1.2);

        let coordinator = coordinator_with(store, vec![alpha, beta]);
        let result = coordinator
            .extract(ExtractionRequest::new("ch_001", RUSSIAN_TEXT))
            .await
            .unwrap();

        assert_eq!(result.descriptions.len(), 2);
        assert_eq!(result.engines_used, vec!["alpha", "beta"]);
        assert!(result.failures.is_empty());

        // The two location candidates merge; the heavier engine's boundaries win
        let location = &result.descriptions[0];
        assert_eq!(location.description_type, DescriptionType::Location);
        assert_eq!(location.consensus_count, 2);
        assert_eq!(location.content, "замок возвышался на холме");
        assert_eq!(location.span, Span::new(7, 32).unwrap());
        assert!((location.weighted_score - (1.0 * 0.9 + 1.2 * 0.85) / 2.2).abs() < 1e-9);

        // The character description stands alone, diluted below the
        // consensus threshold but rescued by the override
        let character = &result.descriptions[1];
        assert_eq!(character.description_type, DescriptionType::Character);
        assert_eq!(character.consensus_count, 1);
        assert_eq!(character.confidence, 0.8);
        assert!(character.weighted_score < 0.6);

        assert!(location.priority_score > character.priority_score);

        let metrics = &result.quality_metrics;
        assert_eq!(metrics.strategy_used, Strategy::Ensemble);
        assert_eq!(metrics.engines_run, 2);
        assert_eq!(metrics.candidates_total, 3);
        assert_eq!(metrics.clusters_total, 2);
        assert_eq!(metrics.clusters_merged, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_is_byte_identical_across_runs() {
        // One engine answers instantly, the other after a pause; completion
        // order must not leak into the output.
        let build = || {
            let store = Arc::new(ConfigStore::in_memory().unwrap());
            let fast = ScriptedEngine::new(
                "fast",
                vec![candidate(
                    "Старый замок возвышался на холме.",
                    DescriptionType::Location,
                    0.9,
                    0,
                    33,
                )],
            );
            let slow = ScriptedEngine::new(
                "slow",
                vec![candidate(
                    "замок возвышался на холме",
                    DescriptionType::Location,
                    0.8,
                    7,
                    32,
                )],
            )
            .with_delay(Duration::from_secs(3));
            coordinator_with(store, vec![fast, slow])
        };

        let request = || ExtractionRequest::new("ch_det", RUSSIAN_TEXT);
        let first = build().extract(request()).await.unwrap();
        let reference = serde_json::to_vec(&first.descriptions).unwrap();
        for _ in 0..5 {
            let again = build().extract(request()).await.unwrap();
            assert_eq!(serde_json::to_vec(&again.descriptions).unwrap(), reference);
        }
    }

    #[tokio::test]
    async fn test_empty_text_short_circuits() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let engine = ScriptedEngine::new(
            "alpha",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let calls = engine.call_counter();
        let coordinator = coordinator_with(store, vec![engine]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_empty", "   \n\t  "))
            .await
            .unwrap();

        assert!(result.descriptions.is_empty());
        assert!(result.engines_used.is_empty());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_engines_available() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let coordinator = coordinator_with(
            Arc::clone(&store),
            vec![ScriptedEngine::new("dead", vec![]).unavailable()],
        );

        let result = coordinator
            .extract(ExtractionRequest::new("ch_x", RUSSIAN_TEXT))
            .await;
        assert!(matches!(result, Err(ExtractionError::NoEnginesAvailable)));
    }

    #[tokio::test]
    async fn test_partial_failure_is_tolerated() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let good = ScriptedEngine::new(
            "good",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let bad = ScriptedEngine::new("bad", vec![]).failing();
        let coordinator = coordinator_with(store, vec![good, bad]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_partial", RUSSIAN_TEXT))
            .await
            .unwrap();

        assert_eq!(result.engines_used, vec!["good"]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].engine, "bad");
        assert!(!result.failures[0].timed_out);
        // The survivor's vote is normalized by its own weight alone;
        // the failed engine casts no vote and dilutes nothing
        assert_eq!(result.descriptions.len(), 1);
        assert!((result.descriptions[0].weighted_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_all_engines_failed_is_typed_error() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let coordinator = coordinator_with(
            store,
            vec![
                ScriptedEngine::new("a", vec![]).failing(),
                ScriptedEngine::new("b", vec![]).failing(),
            ],
        );

        let result = coordinator
            .extract(ExtractionRequest::new("ch_fail", RUSSIAN_TEXT))
            .await;
        match result {
            Err(ExtractionError::AllEnginesFailed { failures }) => {
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected AllEnginesFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_timeout_is_nonfatal() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut slow_config = EngineConfig::new("slow", 1.0);
        slow_config.timeout_secs = 5;
        store.upsert_engine(slow_config).unwrap();

        let fast = ScriptedEngine::new(
            "fast",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let slow = ScriptedEngine::new(
            "slow",
            vec![candidate(
                "замок возвышался на холме",
                DescriptionType::Location,
                0.9,
                7,
                32,
            )],
        )
        .with_delay(Duration::from_secs(120));
        let coordinator = coordinator_with(store, vec![fast, slow]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_slow", RUSSIAN_TEXT))
            .await
            .unwrap();

        assert_eq!(result.engines_used, vec!["fast"]);
        assert_eq!(result.quality_metrics.engines_timed_out, 1);
        assert!(result.failures[0].timed_out);
        // The expired engine's vote is gone entirely, it neither merges
        // nor dilutes
        assert_eq!(result.descriptions.len(), 1);
        assert_eq!(result.descriptions[0].consensus_count, 1);
        assert!((result.descriptions[0].weighted_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_deadline_merges_completed_engines() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut settings = GlobalSettings::default();
        settings.call_timeout_secs = 2;
        store.set_global(&settings).unwrap();

        let fast = ScriptedEngine::new(
            "fast",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let slow = ScriptedEngine::new(
            "slow",
            vec![candidate(
                "замок возвышался на холме",
                DescriptionType::Location,
                0.9,
                7,
                32,
            )],
        )
        .with_delay(Duration::from_secs(30));
        let coordinator = coordinator_with(store, vec![fast, slow]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_deadline", RUSSIAN_TEXT))
            .await
            .unwrap();

        // Whatever finished before the call deadline is merged best-effort
        assert_eq!(result.engines_used, vec!["fast"]);
        assert_eq!(result.descriptions.len(), 1);
        assert!((result.descriptions[0].weighted_score - 0.9).abs() < 1e-9);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].engine, "slow");
        assert!(result.failures[0].timed_out);
        assert_eq!(result.quality_metrics.engines_run, 2);
        assert_eq!(result.quality_metrics.engines_timed_out, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_deadline_with_no_completions_is_error() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut settings = GlobalSettings::default();
        settings.call_timeout_secs = 2;
        store.set_global(&settings).unwrap();

        let make_slow = |name: &str| {
            ScriptedEngine::new(
                name,
                vec![candidate(
                    "Старый замок возвышался на холме.",
                    DescriptionType::Location,
                    0.9,
                    0,
                    33,
                )],
            )
            .with_delay(Duration::from_secs(30))
        };
        let coordinator = coordinator_with(store, vec![make_slow("a"), make_slow("b")]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_stalled", RUSSIAN_TEXT))
            .await;
        match result {
            Err(ExtractionError::AllEnginesFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().all(|f| f.timed_out));
            }
            other => panic!("expected AllEnginesFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_deadline_skips_are_recorded() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut settings = GlobalSettings::default();
        settings.call_timeout_secs = 2;
        store.set_global(&settings).unwrap();

        let early = ScriptedEngine::new(
            "early",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        )
        .with_weight_hint(3.0);
        let mid = ScriptedEngine::new("mid", vec![])
            .with_weight_hint(2.0)
            .with_delay(Duration::from_secs(30));
        let late = ScriptedEngine::new("late", vec![]).with_weight_hint(1.0);
        let late_calls = late.call_counter();
        let coordinator = coordinator_with(store, vec![early, mid, late]);

        let result = coordinator
            .extract(
                ExtractionRequest::new("ch_seq_deadline", RUSSIAN_TEXT)
                    .with_strategy(Strategy::Sequential),
            )
            .await
            .unwrap();

        assert_eq!(result.engines_used, vec!["early"]);
        assert_eq!(late_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        // The engine the deadline cut off mid-call and the one never
        // reached are both accounted as timeouts
        assert_eq!(result.failures.len(), 2);
        let skipped = result
            .failures
            .iter()
            .find(|f| f.engine == "late")
            .expect("skipped engine must be recorded");
        assert!(skipped.timed_out);
        assert_eq!(skipped.reason, "call deadline reached");
        assert_eq!(result.quality_metrics.engines_run, 3);
        assert_eq!(result.quality_metrics.engines_timed_out, 2);
    }

    #[tokio::test]
    async fn test_single_strategy_runs_only_heaviest_engine() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let heavy = ScriptedEngine::new(
            "heavy",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        )
        .with_weight_hint(2.0);
        let light = ScriptedEngine::new("light", vec![]).with_weight_hint(0.5);
        let light_calls = light.call_counter();
        let coordinator = coordinator_with(store, vec![heavy, light]);

        let result = coordinator
            .extract(
                ExtractionRequest::new("ch_single", RUSSIAN_TEXT)
                    .with_strategy(Strategy::Single),
            )
            .await
            .unwrap();

        assert_eq!(result.engines_used, vec!["heavy"]);
        assert_eq!(light_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(result.quality_metrics.engines_run, 1);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_sufficient_coverage() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let mut settings = GlobalSettings::default();
        settings.sufficient_coverage = 1;
        store.set_global(&settings).unwrap();

        let first = ScriptedEngine::new(
            "first",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        )
        .with_weight_hint(2.0);
        let second = ScriptedEngine::new("second", vec![]).with_weight_hint(1.0);
        let second_calls = second.call_counter();
        let coordinator = coordinator_with(store, vec![first, second]);

        let result = coordinator
            .extract(
                ExtractionRequest::new("ch_seq", RUSSIAN_TEXT)
                    .with_strategy(Strategy::Sequential),
            )
            .await
            .unwrap();

        assert_eq!(result.descriptions.len(), 1);
        assert_eq!(second_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(result.quality_metrics.engines_run, 1);
    }

    #[tokio::test]
    async fn test_parallel_uses_permissive_threshold() {
        // One of two equal-weight engines saw the excerpt at 0.7: the
        // diluted score 0.35 fails the ensemble threshold but clears the
        // permissive parallel one.
        let build = |store: Arc<ConfigStore>| {
            let seeing = ScriptedEngine::new(
                "seeing",
                vec![candidate(
                    "Старый замок возвышался на холме.",
                    DescriptionType::Location,
                    0.7,
                    0,
                    33,
                )],
            );
            let blind = ScriptedEngine::new("blind", vec![]);
            coordinator_with(store, vec![seeing, blind])
        };

        let parallel = build(Arc::new(ConfigStore::in_memory().unwrap()))
            .extract(
                ExtractionRequest::new("ch_par", RUSSIAN_TEXT).with_strategy(Strategy::Parallel),
            )
            .await
            .unwrap();
        assert_eq!(parallel.descriptions.len(), 1);

        let ensemble = build(Arc::new(ConfigStore::in_memory().unwrap()))
            .extract(
                ExtractionRequest::new("ch_ens", RUSSIAN_TEXT).with_strategy(Strategy::Ensemble),
            )
            .await
            .unwrap();
        assert!(ensemble.descriptions.is_empty());
        assert_eq!(ensemble.quality_metrics.below_threshold, 1);
    }

    #[tokio::test]
    async fn test_caller_confidence_floor_applies() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let engine = ScriptedEngine::new(
            "alpha",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let coordinator = coordinator_with(store, vec![engine]);

        let mut request = ExtractionRequest::new("ch_floor", RUSSIAN_TEXT);
        request.min_confidence = Some(0.95);
        let result = coordinator.extract(request).await.unwrap();

        assert!(result.descriptions.is_empty());
        assert_eq!(result.quality_metrics.candidates_total, 0);
        // The engine still ran and completed; nothing survived its floor
        assert_eq!(result.engines_used, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_adaptive_resolves_to_concrete_strategy() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let engine = ScriptedEngine::new(
            "alpha",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let coordinator = coordinator_with(store, vec![engine]);

        let result = coordinator
            .extract(
                ExtractionRequest::new("ch_adapt", RUSSIAN_TEXT)
                    .with_strategy(Strategy::Adaptive),
            )
            .await
            .unwrap();

        // Short chapter, one engine: adaptive must report what actually ran
        assert_eq!(result.quality_metrics.strategy_used, Strategy::Single);
    }

    #[tokio::test]
    async fn test_disabled_engine_never_runs() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let main = ScriptedEngine::new(
            "main",
            vec![candidate(
                "Старый замок возвышался на холме.",
                DescriptionType::Location,
                0.9,
                0,
                33,
            )],
        );
        let benched = ScriptedEngine::new("benched", vec![]);
        let benched_calls = benched.call_counter();
        let coordinator = coordinator_with(Arc::clone(&store), vec![main, benched]);
        store.set_engine_enabled("benched", false).unwrap();

        let result = coordinator
            .extract(ExtractionRequest::new("ch_bench", RUSSIAN_TEXT))
            .await
            .unwrap();

        assert_eq!(result.engines_used, vec!["main"]);
        assert_eq!(benched_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        // The disabled engine is not in the denominator either
        assert!((result.descriptions[0].weighted_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_out_of_bounds_candidate_dropped() {
        let store = Arc::new(ConfigStore::in_memory().unwrap());
        let engine = ScriptedEngine::new(
            "wild",
            vec![
                candidate(
                    "Старый замок возвышался на холме.",
                    DescriptionType::Location,
                    0.9,
                    0,
                    33,
                ),
                candidate(
                    "претензия за пределами текста",
                    DescriptionType::Location,
                    0.9,
                    500,
                    900,
                ),
            ],
        );
        let coordinator = coordinator_with(store, vec![engine]);

        let result = coordinator
            .extract(ExtractionRequest::new("ch_wild", RUSSIAN_TEXT))
            .await
            .unwrap();

        assert_eq!(result.quality_metrics.candidates_total, 1);
        assert_eq!(result.descriptions.len(), 1);
        assert_eq!(result.descriptions[0].span, Span::new(0, 33).unwrap());
    }
}
