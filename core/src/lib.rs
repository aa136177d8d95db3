// Vigil Core Library
// Filterable, cursor-paginated, auto-loading list engine for dashboard views

pub mod api;
pub mod config;
pub mod criteria;
pub mod debounce;
pub mod filters;
pub mod list;
pub mod loader;
pub mod pagination;
pub mod records;
pub mod storage;
pub mod telemetry;

// Export core types
pub use config::{ListConfig, ListKind};
pub use criteria::{CriteriaPatch, DateRange, FacetValue, FilterCriteria};
pub use debounce::Debouncer;
pub use filters::{FilterState, SavedFilter};
pub use list::FilteredList;
pub use loader::{EdgeTrigger, VisibilityLoader};
pub use pagination::{
    CoordinatorStats, FetchFailure, FetchState, ListItem, ListView, Page, PageSource,
    PaginatedCoordinator,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, PersistedStore};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, VigilError>;
