//! One filterable, paginated list: filter state, debounced criteria and a
//! fetch coordinator wired together.
//!
//! Edits flow through a [`Debouncer`] of the whole criteria value:
//! search-only edits wait for the quiescence window, every other edit is
//! flushed at once (committing any search text typed so far). A driver task
//! forwards each emitted value to the coordinator, which resets pagination
//! whenever the effective criteria actually change.

use crate::config::{ListConfig, ListKind};
use crate::criteria::{CriteriaPatch, DateRange, FilterCriteria};
use crate::debounce::Debouncer;
use crate::filters::{FilterState, SavedFilter};
use crate::loader::VisibilityLoader;
use crate::pagination::{CoordinatorStats, ListView, PageSource, PaginatedCoordinator};
use crate::storage::PersistedStore;
use crate::Result;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct FilteredList<P: PageSource> {
    filters: Mutex<FilterState>,
    effective: Debouncer<FilterCriteria>,
    coordinator: Arc<PaginatedCoordinator<P>>,
    driver: JoinHandle<()>,
}

impl<P: PageSource> FilteredList<P> {
    /// Build a list and start fetching page 0 for `defaults`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        namespace: &str,
        source: Arc<P>,
        config: ListConfig,
        defaults: FilterCriteria,
        store: Arc<PersistedStore>,
    ) -> Result<Self> {
        config.validate()?;
        defaults.validate()?;

        let filters = FilterState::new(namespace, defaults, store);
        let effective = Debouncer::new(filters.criteria().clone(), config.search_debounce);
        let coordinator = Arc::new(PaginatedCoordinator::new(source, config));
        let driver = tokio::spawn(Self::drive(
            Arc::clone(&coordinator),
            effective.subscribe(),
        ));

        info!(target: "list", namespace = %namespace, "List started");
        Ok(Self {
            filters: Mutex::new(filters),
            effective,
            coordinator,
            driver,
        })
    }

    /// List for a dashboard kind with env-tuned config and a
    /// "last N days" default window
    pub fn for_kind(kind: ListKind, source: Arc<P>, store: Arc<PersistedStore>) -> Result<Self> {
        let config = ListConfig::from_env(kind);
        config.validate()?;
        let defaults = FilterCriteria::new(DateRange::last_days(config.default_window_days));
        Self::new(kind.as_str(), source, config, defaults, store)
    }

    async fn drive(
        coordinator: Arc<PaginatedCoordinator<P>>,
        mut effective: watch::Receiver<FilterCriteria>,
    ) {
        loop {
            let criteria = effective.borrow_and_update().clone();
            debug!(target: "list", active = criteria.active_count(), "Applying effective criteria");
            coordinator.set_criteria(criteria).await;

            if effective.changed().await.is_err() {
                break;
            }
        }
    }

    // ---- filter controls ----

    /// Raw criteria as edited, including not-yet-debounced search text
    pub async fn criteria(&self) -> FilterCriteria {
        self.filters.lock().await.criteria().clone()
    }

    /// Criteria the list is currently fetching for
    pub fn effective_criteria(&self) -> FilterCriteria {
        self.effective.current()
    }

    pub async fn update(&self, patch: &CriteriaPatch) -> Result<()> {
        let mut filters = self.filters.lock().await;
        filters.update(patch)?;

        let criteria = filters.criteria().clone();
        if patch.only_search() {
            self.effective.set(criteria);
        } else {
            self.effective.flush(criteria);
        }
        Ok(())
    }

    pub async fn reset(&self) {
        let mut filters = self.filters.lock().await;
        filters.reset();
        self.effective.flush(filters.criteria().clone());
    }

    pub async fn save(&self, name: &str) -> Option<SavedFilter> {
        self.filters.lock().await.save(name)
    }

    pub async fn load(&self, saved: &SavedFilter) {
        let mut filters = self.filters.lock().await;
        filters.load(saved);
        self.effective.flush(filters.criteria().clone());
    }

    pub async fn delete(&self, id: &str) {
        self.filters.lock().await.delete(id);
    }

    pub async fn saved(&self) -> Vec<SavedFilter> {
        self.filters.lock().await.saved()
    }

    pub async fn active_count(&self) -> usize {
        self.filters.lock().await.active_count()
    }

    // ---- list data ----

    pub fn view(&self) -> ListView<P::Item> {
        self.coordinator.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView<P::Item>> {
        self.coordinator.subscribe()
    }

    pub async fn fetch_next(&self) -> bool {
        self.coordinator.fetch_next().await
    }

    pub async fn refetch(&self) -> bool {
        self.coordinator.refetch().await
    }

    pub async fn ensure_fresh(&self) -> bool {
        self.coordinator.ensure_fresh().await
    }

    pub async fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats().await
    }

    pub fn coordinator(&self) -> Arc<PaginatedCoordinator<P>> {
        Arc::clone(&self.coordinator)
    }

    /// Load more pages whenever `sentinel` becomes visible
    pub fn attach_sentinel(&self, sentinel: watch::Receiver<bool>) -> VisibilityLoader {
        VisibilityLoader::spawn(self.coordinator(), sentinel)
    }
}

impl<P: PageSource> Drop for FilteredList<P> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
