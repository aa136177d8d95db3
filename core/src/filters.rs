//! Filter state container with saved presets.
//!
//! Criteria edits are purely in-memory. Saved presets go straight to the
//! injected [`PersistedStore`] on every save/delete, so another container
//! over the same store sees them immediately.

use crate::criteria::{CriteriaPatch, FilterCriteria};
use crate::storage::PersistedStore;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Namespace prefix for saved filter keys
pub const SAVED_FILTERS_PREFIX: &str = "vigil.saved_filters";

/// A named snapshot of filter criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    pub filters: FilterCriteria,
    pub created_at: DateTime<Utc>,
}

/// Current filter criteria for one list plus its saved presets
pub struct FilterState {
    criteria: FilterCriteria,
    defaults: FilterCriteria,
    store: Arc<PersistedStore>,
    storage_key: String,
}

impl FilterState {
    /// Create a container for list `namespace` starting at `defaults`
    pub fn new(namespace: &str, defaults: FilterCriteria, store: Arc<PersistedStore>) -> Self {
        let mut defaults = defaults;
        defaults.normalize();
        Self {
            criteria: defaults.clone(),
            defaults,
            store,
            storage_key: format!("{}.{}", SAVED_FILTERS_PREFIX, namespace),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn defaults(&self) -> &FilterCriteria {
        &self.defaults
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Merge `patch` into the current criteria.
    ///
    /// An invalid result (e.g. an inverted date range) is rejected and the
    /// current criteria are kept.
    pub fn update(&mut self, patch: &CriteriaPatch) -> Result<()> {
        if let Err(e) = self.criteria.apply(patch) {
            warn!(target: "filters", error = %e, "Rejected filter update");
            return Err(e);
        }
        debug!(target: "filters", active = self.criteria.active_count(), "Filters updated");
        Ok(())
    }

    /// Restore the default criteria
    pub fn reset(&mut self) {
        self.criteria = self.defaults.clone();
        debug!(target: "filters", "Filters reset to defaults");
    }

    /// Save the current criteria under `name`.
    ///
    /// Blank names are ignored and yield `None`.
    pub fn save(&self, name: &str) -> Option<SavedFilter> {
        let name = name.trim();
        if name.is_empty() {
            debug!(target: "filters", "Ignoring save with empty name");
            return None;
        }

        let saved = SavedFilter {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            filters: self.criteria.clone(),
            created_at: Utc::now(),
        };

        let mut all = self.saved();
        all.push(saved.clone());
        self.store.set(&self.storage_key, &all);

        info!(target: "filters", id = %saved.id, name = %saved.name, "Saved filter");
        Some(saved)
    }

    /// Replace the current criteria with a saved preset
    pub fn load(&mut self, saved: &SavedFilter) {
        let mut filters = saved.filters.clone();
        filters.normalize();
        self.criteria = filters;
        debug!(target: "filters", id = %saved.id, "Loaded saved filter");
    }

    /// Delete the saved preset `id`; unknown ids are ignored
    pub fn delete(&self, id: &str) {
        let mut all = self.saved();
        let before = all.len();
        all.retain(|f| f.id != id);

        if all.len() == before {
            debug!(target: "filters", id = %id, "No saved filter to delete");
            return;
        }

        if all.is_empty() {
            self.store.remove(&self.storage_key);
        } else {
            self.store.set(&self.storage_key, &all);
        }
        info!(target: "filters", id = %id, "Deleted saved filter");
    }

    /// Saved presets in creation order
    pub fn saved(&self) -> Vec<SavedFilter> {
        self.store.get(&self.storage_key, Vec::new())
    }

    pub fn active_count(&self) -> usize {
        self.criteria.active_count()
    }
}
