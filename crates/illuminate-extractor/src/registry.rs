//! Engine registration and per-call engine selection.

use std::sync::Arc;

use tracing::{info, warn};

use illuminate_config::{ConfigSnapshot, ConfigStore, EngineConfig};
use illuminate_engines::DescriptionEngine;

use crate::error::ExtractionError;

/// An engine paired with its configuration for one extraction call.
#[derive(Clone)]
pub struct ActiveEngine {
    /// The engine itself.
    pub engine: Arc<dyn DescriptionEngine>,
    /// Its config entry, from the call's snapshot.
    pub config: EngineConfig,
}

impl ActiveEngine {
    /// Engine identifier, for logging and result bookkeeping.
    pub fn id(&self) -> &str {
        self.engine.name()
    }
}

/// Holds every registered engine and seeds the config store for
/// newly-seen ones.
///
/// Registration is additive only; which engines actually run for a call
/// is decided per call from the config snapshot and a liveness check,
/// never at registration time.
pub struct EngineRegistry {
    engines: Vec<Arc<dyn DescriptionEngine>>,
    config: Arc<ConfigStore>,
}

impl EngineRegistry {
    /// An empty registry backed by the given config store.
    pub fn new(config: Arc<ConfigStore>) -> Self {
        EngineRegistry {
            engines: Vec::new(),
            config,
        }
    }

    /// Register an engine, seeding its config entry on first sight.
    ///
    /// The engine's `default_weight` hint only lands in the store when no
    /// entry exists for its name; admin-tuned weights are never clobbered.
    /// Registering the same name twice replaces the earlier instance.
    pub fn register(&mut self, engine: Arc<dyn DescriptionEngine>) -> Result<(), ExtractionError> {
        let seed = EngineConfig::new(engine.name(), engine.default_weight());
        self.config.ensure_engine(seed)?;
        info!(
            engine = engine.name(),
            version = engine.version(),
            "engine registered"
        );
        self.engines.retain(|e| e.name() != engine.name());
        self.engines.push(engine);
        Ok(())
    }

    /// Number of registered engines.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Engines eligible for one call: enabled in the snapshot and
    /// currently answering their liveness check.
    ///
    /// Returned in descending weight order (ties by name) so the Single
    /// and Sequential strategies can take from the front. An engine that
    /// reports itself unavailable is skipped with a warning; only an empty
    /// result is an error.
    pub async fn active_engines(
        &self,
        snapshot: &ConfigSnapshot,
    ) -> Result<Vec<ActiveEngine>, ExtractionError> {
        let mut active = Vec::new();
        for engine in &self.engines {
            let Some(config) = snapshot.engine(engine.name()) else {
                // Registered after this snapshot was taken
                warn!(engine = engine.name(), "engine missing from config snapshot");
                continue;
            };
            if !config.enabled {
                continue;
            }
            if !engine.is_available().await {
                warn!(engine = engine.name(), "engine unavailable, skipping");
                continue;
            }
            active.push(ActiveEngine {
                engine: Arc::clone(engine),
                config: config.clone(),
            });
        }

        active.sort_by(|a, b| {
            b.config
                .weight
                .total_cmp(&a.config.weight)
                .then_with(|| a.config.id.cmp(&b.config.id))
        });

        if active.is_empty() {
            return Err(ExtractionError::NoEnginesAvailable);
        }
        Ok(active)
    }
}
