//! Cursor-paginated fetching.
//!
//! A [`PaginatedCoordinator`] drives one [`PageSource`] for one list: it
//! issues page requests for the current criteria, accumulates landed pages
//! and publishes a [`ListView`] for the presentation layer.

mod cache;
mod coordinator;

pub use coordinator::PaginatedCoordinator;

use crate::criteria::FilterCriteria;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Identity of a list item, used to drop duplicates across pages
pub trait ListItem: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// One batch of items in server order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}

/// Fetches pages of items for a criteria set (the API layer)
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: ListItem;

    async fn fetch_page(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<Self::Item>>;
}

/// A failed page request, kept until the page is retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub page_index: usize,
    pub reason: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} failed: {}", self.page_index, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    /// No criteria applied yet
    #[default]
    Idle,
    /// Page 0 in flight with nothing to show
    Loading,
    /// Page N>0 in flight, pages 0..N held
    LoadingMore,
    Success,
    Error(FetchFailure),
}

/// Read-only snapshot of a list for rendering
#[derive(Debug, Clone)]
pub struct ListView<T> {
    /// All landed pages, concatenated in fetch order
    pub items: Vec<T>,
    pub state: FetchState,
    /// `has_more` of the last landed page
    pub has_next: bool,
    /// A background page-0 refresh is in flight
    pub is_refreshing: bool,
    pub pages: usize,
    pub generation: u64,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            state: FetchState::Idle,
            has_next: false,
            is_refreshing: false,
            pages: 0,
            generation: 0,
        }
    }
}

impl<T> ListView<T> {
    pub fn is_loading(&self) -> bool {
        self.state == FetchState::Loading
    }

    pub fn is_loading_next(&self) -> bool {
        self.state == FetchState::LoadingMore
    }

    /// Any request in flight, including background refreshes
    pub fn is_fetching(&self) -> bool {
        self.is_loading() || self.is_loading_next() || self.is_refreshing
    }

    pub fn error(&self) -> Option<&FetchFailure> {
        match &self.state {
            FetchState::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Coordinator counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    pub requests_issued: u64,
    pub pages_fetched: u64,
    pub fetch_errors: u64,
    pub stale_discarded: u64,
    pub duplicates_dropped: u64,
    pub cache_hits: u64,
}
