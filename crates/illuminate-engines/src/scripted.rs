//! Deterministic scripted engine for testing strategies and voting
//!
//! Emits a fixed candidate list, optionally after a delay, optionally
//! failing or reporting itself unavailable. Lets timeout, partial-failure
//! and consensus semantics be exercised without a live model.

use crate::engine::{DescriptionEngine, EngineError};
use async_trait::async_trait;
use illuminate_domain::DescriptionCandidate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Test engine that replays a fixed script
pub struct ScriptedEngine {
    name: String,
    weight_hint: f64,
    candidates: Vec<DescriptionCandidate>,
    delay: Option<Duration>,
    fail: bool,
    available: bool,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    /// Create an engine that returns the given candidates
    ///
    /// `source_engine` on every candidate is rewritten to the engine name.
    pub fn new(name: impl Into<String>, candidates: Vec<DescriptionCandidate>) -> Self {
        let name = name.into();
        let candidates = candidates
            .into_iter()
            .map(|mut c| {
                c.source_engine = name.clone();
                c
            })
            .collect();
        Self {
            name,
            weight_hint: 1.0,
            candidates,
            delay: None,
            fail: false,
            available: true,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the default weight hint
    pub fn with_weight_hint(mut self, weight: f64) -> Self {
        self.weight_hint = weight;
        self
    }

    /// Sleep for `delay` before responding (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every extract call
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Report the engine as unavailable
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Number of extract calls served so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Handle for asserting call counts after the engine moves into the registry
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }
}

#[async_trait]
impl DescriptionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_weight(&self) -> f64 {
        self.weight_hint
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn extract(&self, _text: &str) -> Result<Vec<DescriptionCandidate>, EngineError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EngineError::Failed(format!(
                "scripted failure from {}",
                self.name
            )));
        }
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use illuminate_domain::{DescriptionType, Span};

    fn candidate() -> DescriptionCandidate {
        DescriptionCandidate {
            content: "a candle guttering in the dark hall".to_string(),
            description_type: DescriptionType::Atmosphere,
            confidence: 0.7,
            span: Span::new(0, 35).unwrap(),
            source_engine: "overwritten".to_string(),
            entities_mentioned: vec![],
        }
    }

    #[tokio::test]
    async fn test_rewrites_source_engine() {
        let engine = ScriptedEngine::new("e1", vec![candidate()]);
        let out = engine.extract("whatever").await.unwrap();
        assert_eq!(out[0].source_engine, "e1");
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_engine() {
        let engine = ScriptedEngine::new("e1", vec![candidate()]).failing();
        assert!(matches!(
            engine.extract("x").await,
            Err(EngineError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_engine() {
        let engine = ScriptedEngine::new("e1", vec![]).unavailable();
        assert!(!engine.is_available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_observed() {
        let engine = ScriptedEngine::new("slow", vec![candidate()])
            .with_delay(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        engine.extract("x").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
