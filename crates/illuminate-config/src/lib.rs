//! Illuminate Configuration Layer
//!
//! Durable, hot-reloadable per-engine weights/thresholds and global knobs,
//! backed by SQLite.
//!
//! # Snapshot semantics
//!
//! The coordinator reads a [`ConfigSnapshot`] exactly once per extraction
//! call. Updates written through the admin surface apply to subsequent calls
//! only - an in-flight call never observes a torn read.
//!
//! # Examples
//!
//! ```no_run
//! use illuminate_config::{ConfigStore, EngineConfig};
//!
//! let store = ConfigStore::open("illuminate.db").unwrap();
//! store.upsert_engine(EngineConfig::new("heuristic", 1.0)).unwrap();
//! let snapshot = store.snapshot().unwrap();
//! assert!(snapshot.engine("heuristic").is_some());
//! ```

#![warn(missing_docs)]

mod error;
mod settings;
mod store;

pub use error::ConfigError;
pub use settings::GlobalSettings;
pub use store::{ConfigSnapshot, ConfigStore, EngineConfig};
