// Paginated fetch coordinator
//
// State machine:
//   Idle -> Loading -> Success <-> LoadingMore
//   any fetch failure -> Error (pages kept), retry re-issues the failed page
//
// Every request carries a ticket stamped with the criteria generation. A
// response whose ticket no longer matches the in-flight one is dropped on
// arrival, so a slow page for old criteria never merges into the new list.

use super::cache::QueryCache;
use super::{CoordinatorStats, FetchFailure, FetchState, ListItem, ListView, Page, PageSource};
use crate::config::ListConfig;
use crate::criteria::FilterCriteria;
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    /// Page 0 with nothing to show
    Initial,
    /// Page N appended to pages 0..N
    Next,
    /// Page 0 refreshed while cached pages stay visible
    Revalidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    generation: u64,
    page_index: usize,
    mode: FetchMode,
}

struct CoordinatorInner<T: ListItem> {
    criteria: Option<FilterCriteria>,
    generation: u64,
    state: FetchState,
    pages: Vec<Page<T>>,
    seen: HashSet<T::Id>,
    // At most one request is ever in flight
    in_flight: Option<Ticket>,
    fetched_at: Option<Instant>,
    cache: QueryCache<T>,
    stats: CoordinatorStats,
}

impl<T: ListItem> CoordinatorInner<T> {
    fn new(config: &ListConfig) -> Self {
        Self {
            criteria: None,
            generation: 0,
            state: FetchState::Idle,
            pages: Vec::new(),
            seen: HashSet::new(),
            in_flight: None,
            fetched_at: None,
            cache: QueryCache::new(config.cache_capacity, config.stale_time),
            stats: CoordinatorStats::default(),
        }
    }

    fn has_more(&self) -> bool {
        self.pages.last().map(|p| p.has_more).unwrap_or(false)
    }

    fn issue(&mut self, page_index: usize, mode: FetchMode) -> Ticket {
        let ticket = Ticket {
            generation: self.generation,
            page_index,
            mode,
        };
        self.in_flight = Some(ticket);
        self.stats.requests_issued += 1;
        ticket
    }

    fn clear_pages(&mut self) {
        self.pages.clear();
        self.seen.clear();
    }

    // Append a page, dropping items already accumulated (first occurrence wins)
    fn push_page(&mut self, page: Page<T>) {
        let received = page.items.len();
        let items: Vec<T> = page
            .items
            .into_iter()
            .filter(|item| self.seen.insert(item.id()))
            .collect();

        let dropped = received - items.len();
        if dropped > 0 {
            self.stats.duplicates_dropped += dropped as u64;
            debug!(target: "coordinator", dropped, page = self.pages.len(), "Dropped duplicate items");
        }

        self.pages.push(Page {
            items,
            has_more: page.has_more,
        });
    }

    fn restore(&mut self, pages: Vec<Page<T>>) {
        self.clear_pages();
        for page in pages {
            self.push_page(page);
        }
    }

    fn revalidate_if_stale(&mut self) -> Option<Ticket> {
        if self.in_flight.is_some() || self.state != FetchState::Success {
            return None;
        }
        let fetched_at = self.fetched_at?;
        if !self.cache.is_stale(fetched_at) {
            return None;
        }
        debug!(target: "coordinator", generation = self.generation, "Cached pages are stale; revalidating");
        Some(self.issue(0, FetchMode::Revalidate))
    }

    fn land(&mut self, ticket: Ticket, result: Result<Page<T>>) {
        if ticket.generation != self.generation || self.in_flight != Some(ticket) {
            self.stats.stale_discarded += 1;
            debug!(
                target: "coordinator",
                ticket_generation = ticket.generation,
                generation = self.generation,
                page = ticket.page_index,
                "Discarding response for superseded request"
            );
            return;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                self.stats.pages_fetched += 1;
                if ticket.mode != FetchMode::Next {
                    self.clear_pages();
                    self.fetched_at = Some(Instant::now());
                }
                self.push_page(page);
                self.state = FetchState::Success;

                if let Some(criteria) = &self.criteria {
                    let fetched_at = self.fetched_at.unwrap_or_else(Instant::now);
                    self.cache
                        .store(criteria.fingerprint(), self.pages.clone(), fetched_at);
                }

                debug!(
                    target: "coordinator",
                    page = ticket.page_index,
                    pages = self.pages.len(),
                    has_more = self.has_more(),
                    cached = self.cache.len(),
                    "Page landed"
                );
            }
            Err(e) => {
                self.stats.fetch_errors += 1;
                warn!(target: "coordinator", page = ticket.page_index, error = %e, "Page request failed");
                self.state = FetchState::Error(FetchFailure {
                    page_index: ticket.page_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn snapshot(&self) -> ListView<T> {
        ListView {
            items: self
                .pages
                .iter()
                .flat_map(|p| p.items.iter().cloned())
                .collect(),
            state: self.state.clone(),
            has_next: self.state != FetchState::Loading && self.has_more(),
            is_refreshing: matches!(
                self.in_flight,
                Some(Ticket {
                    mode: FetchMode::Revalidate,
                    ..
                })
            ),
            pages: self.pages.len(),
            generation: self.generation,
        }
    }
}

/// Accumulates cursor-paginated results for one list.
///
/// Cheap to share: wrap in an `Arc` and hand clones of the receiver from
/// [`subscribe`](Self::subscribe) to whoever renders the list.
pub struct PaginatedCoordinator<P: PageSource> {
    source: Arc<P>,
    config: ListConfig,
    inner: Arc<Mutex<CoordinatorInner<P::Item>>>,
    view_tx: Arc<watch::Sender<ListView<P::Item>>>,
}

impl<P: PageSource> PaginatedCoordinator<P> {
    pub fn new(source: Arc<P>, config: ListConfig) -> Self {
        let (view_tx, _) = watch::channel(ListView::default());
        Self {
            source,
            inner: Arc::new(Mutex::new(CoordinatorInner::new(&config))),
            config,
            view_tx: Arc::new(view_tx),
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// Current snapshot
    pub fn view(&self) -> ListView<P::Item> {
        self.view_tx.borrow().clone()
    }

    /// Stream of snapshots, updated on every transition
    pub fn subscribe(&self) -> watch::Receiver<ListView<P::Item>> {
        self.view_tx.subscribe()
    }

    pub async fn criteria(&self) -> Option<FilterCriteria> {
        self.inner.lock().await.criteria.clone()
    }

    pub async fn stats(&self) -> CoordinatorStats {
        self.inner.lock().await.stats.clone()
    }

    /// Apply new effective criteria.
    ///
    /// Different criteria always restart pagination at page 0; anything
    /// still in flight for the old criteria is void. Cached pages for the
    /// new criteria are shown immediately and refreshed in the background
    /// once stale. Re-applying the current criteria only refreshes stale
    /// data.
    pub async fn set_criteria(&self, criteria: FilterCriteria) {
        let mut inner = self.inner.lock().await;

        if inner.criteria.as_ref() == Some(&criteria) {
            if let Some(ticket) = inner.revalidate_if_stale() {
                self.publish(&inner);
                drop(inner);
                self.spawn_fetch(ticket, criteria);
            }
            return;
        }

        inner.generation += 1;
        inner.in_flight = None;
        inner.fetched_at = None;
        inner.clear_pages();
        inner.criteria = Some(criteria.clone());

        let ticket = match inner.cache.lookup(&criteria.fingerprint()) {
            Some(hit) => {
                inner.stats.cache_hits += 1;
                inner.restore(hit.pages);
                inner.fetched_at = Some(hit.fetched_at);
                inner.state = FetchState::Success;
                debug!(target: "coordinator", generation = inner.generation, fresh = hit.fresh, "Serving cached pages");
                if hit.fresh {
                    None
                } else {
                    Some(inner.issue(0, FetchMode::Revalidate))
                }
            }
            None => {
                inner.state = FetchState::Loading;
                Some(inner.issue(0, FetchMode::Initial))
            }
        };

        info!(target: "coordinator", generation = inner.generation, "Criteria changed; pagination reset");
        self.publish(&inner);
        drop(inner);

        if let Some(ticket) = ticket {
            self.spawn_fetch(ticket, criteria);
        }
    }

    /// Request the next page.
    ///
    /// Does nothing (returns `false`) unless the list is in `Success`, the
    /// last page reported more items and no request is in flight.
    pub async fn fetch_next(&self) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.in_flight.is_some() || inner.state != FetchState::Success || !inner.has_more() {
            debug!(target: "coordinator", state = ?inner.state, "fetch_next ignored");
            return false;
        }
        let Some(criteria) = inner.criteria.clone() else {
            return false;
        };

        let page_index = inner.pages.len();
        let ticket = inner.issue(page_index, FetchMode::Next);
        inner.state = FetchState::LoadingMore;
        self.publish(&inner);
        drop(inner);

        self.spawn_fetch(ticket, criteria);
        true
    }

    /// Retry after an error, or refresh page 0 in the background.
    ///
    /// In `Error` the failed page is requested again and the pages already
    /// held stay visible. In `Success` page 0 is refetched and replaces the
    /// accumulation when it lands.
    pub async fn refetch(&self) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.in_flight.is_some() {
            return false;
        }
        let Some(criteria) = inner.criteria.clone() else {
            return false;
        };

        let ticket = match inner.state.clone() {
            FetchState::Error(failure) if failure.page_index == 0 && inner.pages.is_empty() => {
                inner.state = FetchState::Loading;
                inner.issue(0, FetchMode::Initial)
            }
            FetchState::Error(failure) if failure.page_index == 0 => {
                inner.state = FetchState::Success;
                inner.issue(0, FetchMode::Revalidate)
            }
            FetchState::Error(failure) => {
                inner.state = FetchState::LoadingMore;
                inner.issue(failure.page_index, FetchMode::Next)
            }
            FetchState::Success => inner.issue(0, FetchMode::Revalidate),
            _ => return false,
        };

        info!(target: "coordinator", page = ticket.page_index, "Refetching");
        self.publish(&inner);
        drop(inner);

        self.spawn_fetch(ticket, criteria);
        true
    }

    /// Refresh page 0 in the background if the data has gone stale
    pub async fn ensure_fresh(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(ticket) = inner.revalidate_if_stale() else {
            return false;
        };
        let Some(criteria) = inner.criteria.clone() else {
            return false;
        };
        self.publish(&inner);
        drop(inner);

        self.spawn_fetch(ticket, criteria);
        true
    }

    fn publish(&self, inner: &CoordinatorInner<P::Item>) {
        self.view_tx.send_replace(inner.snapshot());
    }

    fn spawn_fetch(&self, ticket: Ticket, criteria: FilterCriteria) {
        let source = Arc::clone(&self.source);
        let inner = Arc::clone(&self.inner);
        let view_tx = Arc::clone(&self.view_tx);
        let page_size = self.config.page_size;

        debug!(
            target: "coordinator",
            generation = ticket.generation,
            page = ticket.page_index,
            mode = ?ticket.mode,
            "Issuing page request"
        );

        tokio::spawn(async move {
            let result = source
                .fetch_page(&criteria, ticket.page_index, page_size)
                .await;

            let mut inner = inner.lock().await;
            inner.land(ticket, result);
            view_tx.send_replace(inner.snapshot());
        });
    }
}
