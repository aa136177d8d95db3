//! RocksDB backend for persisted client state.

use super::KeyValueStore;
use crate::{Result, VigilError};
use rocksdb::{Options, DB};
use std::path::Path;
use tracing::info;

/// Persistent storage using RocksDB
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| VigilError::Storage(e.to_string()))?;

        info!(target: "storage", "RocksDbStore initialized");
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksDbStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key) {
            Ok(Some(data)) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| VigilError::Storage(format!("non-utf8 value for {}: {}", key, e))),
            Ok(None) => Ok(None),
            Err(e) => Err(VigilError::Storage(e.to_string())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .put(key, value.as_bytes())
            .map_err(|e| VigilError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| VigilError::Storage(e.to_string()))
    }
}
