//! SQLite-backed configuration store

use crate::error::ConfigError;
use crate::settings::GlobalSettings;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Per-engine configuration entry
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Engine identifier (matches `DescriptionEngine::name`)
    pub id: String,

    /// Voting weight, >= 0. Zero-weight engines run but contribute no votes.
    pub weight: f64,

    /// Disabled engines are skipped entirely
    pub enabled: bool,

    /// Candidates below this confidence are dropped at the engine boundary
    pub confidence_threshold: f64,

    /// Per-engine call timeout in seconds
    pub timeout_secs: u64,
}

impl EngineConfig {
    /// Create a config with the given weight and default thresholds
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
            enabled: true,
            confidence_threshold: 0.3,
            timeout_secs: 60,
        }
    }

    /// Get the per-engine timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::InvalidConfig("engine id is empty".to_string()));
        }
        if self.weight < 0.0 || !self.weight.is_finite() {
            return Err(ConfigError::InvalidConfig(format!(
                "weight {} must be finite and >= 0",
                self.weight
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "confidence_threshold {} outside [0.0, 1.0]",
                self.confidence_threshold
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Immutable view of the full configuration, read once per extraction call
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    engines: BTreeMap<String, EngineConfig>,
    global: GlobalSettings,
}

impl ConfigSnapshot {
    /// Look up an engine config by id
    pub fn engine(&self, id: &str) -> Option<&EngineConfig> {
        self.engines.get(id)
    }

    /// All engine configs, keyed by id (deterministic iteration order)
    pub fn engines(&self) -> &BTreeMap<String, EngineConfig> {
        &self.engines
    }

    /// Global settings
    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }
}

/// SQLite-backed store for engine configs and global settings
///
/// Survives process restart; mutations take effect on the next snapshot
/// read, never retroactively inside an in-flight call.
pub struct ConfigStore {
    conn: Mutex<Connection>,
}

const GLOBAL_KEY: &str = "global";

impl ConfigStore {
    /// Open (or create) a config store at the given path
    ///
    /// Use [`ConfigStore::in_memory`] for tests.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, ConfigError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ConfigError> {
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace an engine config; validated at write time
    pub fn upsert_engine(&self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO engine_configs (id, weight, enabled, confidence_threshold, timeout_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 weight = excluded.weight,
                 enabled = excluded.enabled,
                 confidence_threshold = excluded.confidence_threshold,
                 timeout_secs = excluded.timeout_secs",
            params![
                config.id,
                config.weight,
                config.enabled as i64,
                config.confidence_threshold,
                config.timeout_secs as i64,
            ],
        )?;
        debug!(engine = %config.id, weight = config.weight, "engine config written");
        Ok(())
    }

    /// Insert a config for a newly-seen engine, keeping any existing row
    ///
    /// Used at registry startup so an engine's `default_weight` hint seeds
    /// the store exactly once.
    pub fn ensure_engine(&self, config: EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO engine_configs
                 (id, weight, enabled, confidence_threshold, timeout_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                config.id,
                config.weight,
                config.enabled as i64,
                config.confidence_threshold,
                config.timeout_secs as i64,
            ],
        )?;
        Ok(())
    }

    /// Fetch a single engine config
    pub fn get_engine(&self, id: &str) -> Result<Option<EngineConfig>, ConfigError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, weight, enabled, confidence_threshold, timeout_secs
                 FROM engine_configs WHERE id = ?1",
                params![id],
                Self::row_to_engine,
            )
            .optional()?;
        Ok(row)
    }

    /// Enable or disable an engine without restart
    pub fn set_engine_enabled(&self, id: &str, enabled: bool) -> Result<(), ConfigError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE engine_configs SET enabled = ?2 WHERE id = ?1",
            params![id, enabled as i64],
        )?;
        if updated == 0 {
            return Err(ConfigError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Update an engine's voting weight; validated at write time
    pub fn set_engine_weight(&self, id: &str, weight: f64) -> Result<(), ConfigError> {
        if weight < 0.0 || !weight.is_finite() {
            return Err(ConfigError::InvalidConfig(format!(
                "weight {weight} must be finite and >= 0"
            )));
        }
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE engine_configs SET weight = ?2 WHERE id = ?1",
            params![id, weight],
        )?;
        if updated == 0 {
            return Err(ConfigError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Replace the global settings document; validated at write time
    pub fn set_global(&self, settings: &GlobalSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        let value = serde_json::to_string(settings)?;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![GLOBAL_KEY, value],
        )?;
        Ok(())
    }

    /// Read the full configuration as one consistent snapshot
    ///
    /// Missing global settings fall back to defaults so a fresh database
    /// is immediately usable.
    pub fn snapshot(&self) -> Result<ConfigSnapshot, ConfigError> {
        let conn = self.lock();

        let mut stmt = conn.prepare(
            "SELECT id, weight, enabled, confidence_threshold, timeout_secs
             FROM engine_configs ORDER BY id",
        )?;
        let mut engines = BTreeMap::new();
        let rows = stmt.query_map([], Self::row_to_engine)?;
        for row in rows {
            let config = row?;
            engines.insert(config.id.clone(), config);
        }

        let global = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![GLOBAL_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|value| serde_json::from_str(&value))
            .transpose()?
            .unwrap_or_default();

        Ok(ConfigSnapshot { engines, global })
    }

    fn row_to_engine(row: &rusqlite::Row<'_>) -> rusqlite::Result<EngineConfig> {
        Ok(EngineConfig {
            id: row.get(0)?,
            weight: row.get(1)?,
            enabled: row.get::<_, i64>(2)? != 0,
            confidence_threshold: row.get(3)?,
            timeout_secs: row.get::<_, i64>(4)? as u64,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-write; propagating the panic is
        // the only sound option for config state.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_snapshot() {
        let store = ConfigStore::in_memory().unwrap();
        store.upsert_engine(EngineConfig::new("heuristic", 1.0)).unwrap();
        store.upsert_engine(EngineConfig::new("llm", 1.2)).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.engines().len(), 2);
        assert_eq!(snapshot.engine("llm").unwrap().weight, 1.2);
    }

    #[test]
    fn test_negative_weight_rejected_at_write() {
        let store = ConfigStore::in_memory().unwrap();
        let result = store.upsert_engine(EngineConfig::new("bad", -0.5));
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
        assert!(store.snapshot().unwrap().engines().is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_rejected_at_write() {
        let store = ConfigStore::in_memory().unwrap();
        let mut config = EngineConfig::new("bad", 1.0);
        config.confidence_threshold = 1.5;
        assert!(store.upsert_engine(config).is_err());
    }

    #[test]
    fn test_ensure_engine_keeps_existing_row() {
        let store = ConfigStore::in_memory().unwrap();
        store.upsert_engine(EngineConfig::new("llm", 2.0)).unwrap();
        store.ensure_engine(EngineConfig::new("llm", 1.0)).unwrap();

        // Admin-tuned weight survives the seed
        assert_eq!(store.get_engine("llm").unwrap().unwrap().weight, 2.0);
    }

    #[test]
    fn test_enable_disable() {
        let store = ConfigStore::in_memory().unwrap();
        store.upsert_engine(EngineConfig::new("heuristic", 1.0)).unwrap();
        store.set_engine_enabled("heuristic", false).unwrap();
        assert!(!store.get_engine("heuristic").unwrap().unwrap().enabled);

        let missing = store.set_engine_enabled("ghost", true);
        assert!(matches!(missing, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_global_settings_round_trip() {
        let store = ConfigStore::in_memory().unwrap();
        let mut settings = GlobalSettings::default();
        settings.consensus_threshold = 0.7;
        store.set_global(&settings).unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.global().consensus_threshold, 0.7);
    }

    #[test]
    fn test_fresh_store_yields_default_globals() {
        let store = ConfigStore::in_memory().unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.global().consensus_threshold, 0.6);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.db");

        {
            let store = ConfigStore::open(&path).unwrap();
            store.upsert_engine(EngineConfig::new("llm", 1.2)).unwrap();
            let mut settings = GlobalSettings::default();
            settings.sufficient_coverage = 5;
            store.set_global(&settings).unwrap();
        }

        let reopened = ConfigStore::open(&path).unwrap();
        let snapshot = reopened.snapshot().unwrap();
        assert_eq!(snapshot.engine("llm").unwrap().weight, 1.2);
        assert_eq!(snapshot.global().sufficient_coverage, 5);
    }

    #[test]
    fn test_snapshot_isolated_from_later_writes() {
        let store = ConfigStore::in_memory().unwrap();
        store.upsert_engine(EngineConfig::new("llm", 1.0)).unwrap();

        let before = store.snapshot().unwrap();
        store.set_engine_weight("llm", 3.0).unwrap();

        assert_eq!(before.engine("llm").unwrap().weight, 1.0);
        assert_eq!(store.snapshot().unwrap().engine("llm").unwrap().weight, 3.0);
    }
}
