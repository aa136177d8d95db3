//! Persisted key-value storage for client-side state (saved filter presets).
//!
//! Backends implement the raw [`KeyValueStore`] trait:
//! - [`MemoryStore`] - Development/testing
//! - [`JsonFileStore`] - One JSON document per key on disk
//! - `RocksDbStore` - RocksDB persistence (feature `rocksdb`)
//!
//! [`PersistedStore`] is the typed layer callers use. It never returns an
//! error: unreadable or corrupt values fall back to the caller's default and
//! failed writes are kept in memory for the rest of the session.

mod file;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksDbStore;

use crate::Result;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw string storage backend
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Typed, infallible view over a [`KeyValueStore`].
///
/// Concurrent writers are not coordinated: the last write wins.
pub struct PersistedStore {
    backend: Arc<dyn KeyValueStore>,
    // Values whose backend write failed, served for the rest of the session
    overlay: DashMap<String, String>,
    degraded: AtomicBool,
}

impl PersistedStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            overlay: DashMap::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Purely in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Read and decode `key`, or return `default` on absence or any failure
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.overlay.get(key) {
            Some(entry) => Some(entry.value().clone()),
            None => match self.backend.read(key) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(target: "storage", key = %key, error = %e, "Store unavailable; using default");
                    self.degraded.store(true, Ordering::Relaxed);
                    return default;
                }
            },
        };

        let Some(raw) = raw else {
            return default;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(target: "storage", key = %key, error = %e, "Corrupt stored value; using default");
                default
            }
        }
    }

    /// Encode and store `value`. Backend failures degrade to memory-only.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(target: "storage", key = %key, error = %e, "Failed to serialize value");
                return;
            }
        };

        match self.backend.write(key, &raw) {
            Ok(()) => {
                debug!(target: "storage", key = %key, bytes = raw.len(), "Persisted value");
                self.overlay.remove(key);
            }
            Err(e) => {
                warn!(target: "storage", key = %key, error = %e, "Write failed; keeping value in memory for this session");
                self.degraded.store(true, Ordering::Relaxed);
                self.overlay.insert(key.to_string(), raw);
            }
        }
    }

    /// Remove `key` from the backend and the session overlay
    pub fn remove(&self, key: &str) {
        self.overlay.remove(key);
        if let Err(e) = self.backend.remove(key) {
            warn!(target: "storage", key = %key, error = %e, "Failed to remove value");
            self.degraded.store(true, Ordering::Relaxed);
        }
    }

    /// True once any backend read or write has failed
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl Default for PersistedStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        page_size: usize,
        dense: bool,
    }

    #[test]
    fn test_get_returns_default_when_missing() {
        let store = PersistedStore::in_memory();
        let prefs = store.get(
            "prefs",
            Prefs {
                page_size: 25,
                dense: false,
            },
        );
        assert_eq!(prefs.page_size, 25);
        assert!(!store.is_degraded());
    }

    #[test]
    fn test_set_then_get() {
        let store = PersistedStore::in_memory();
        let prefs = Prefs {
            page_size: 50,
            dense: true,
        };
        store.set("prefs", &prefs);
        assert_eq!(
            store.get(
                "prefs",
                Prefs {
                    page_size: 0,
                    dense: false
                }
            ),
            prefs
        );
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let backend = Arc::new(MemoryStore::new());
        backend.write("prefs", "{not json").unwrap();
        let store = PersistedStore::new(backend);

        let prefs: Vec<String> = store.get("prefs", vec!["fallback".to_string()]);
        assert_eq!(prefs, vec!["fallback".to_string()]);
    }
}
