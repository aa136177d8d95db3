// Per-list configuration
//
// Each dashboard list has its own page size, search debounce window and
// staleness window. Defaults come from `ListKind::config`; environment
// variables `VIGIL_<KIND>_<SETTING>` override them.

use crate::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Longest default "last N days" window a list accepts
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Dashboard lists served by the list core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Events,
    Errors,
    Alerts,
    Analytics,
    Journeys,
    Integrations,
}

impl ListKind {
    pub const ALL: [ListKind; 6] = [
        ListKind::Events,
        ListKind::Errors,
        ListKind::Alerts,
        ListKind::Analytics,
        ListKind::Journeys,
        ListKind::Integrations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Events => "events",
            ListKind::Errors => "errors",
            ListKind::Alerts => "alerts",
            ListKind::Analytics => "analytics",
            ListKind::Journeys => "journeys",
            ListKind::Integrations => "integrations",
        }
    }

    /// REST path for the list's page endpoint
    pub fn endpoint(&self) -> String {
        format!("/api/{}", self.as_str())
    }

    /// Multi-select facets the list exposes
    pub fn facets(&self) -> &'static [&'static str] {
        match self {
            ListKind::Events => &["categories", "platforms"],
            ListKind::Errors => &["severities", "statuses", "platforms"],
            ListKind::Alerts => &["severities", "statuses"],
            ListKind::Analytics => &["categories", "platforms"],
            ListKind::Journeys => &["funnels", "platforms"],
            ListKind::Integrations => &["providers", "statuses"],
        }
    }

    /// Boolean toggles the list exposes
    pub fn toggles(&self) -> &'static [&'static str] {
        match self {
            ListKind::Events => &["hasErrors"],
            ListKind::Errors => &["unresolvedOnly"],
            ListKind::Alerts => &["enabledOnly"],
            ListKind::Analytics => &[],
            ListKind::Journeys => &["completedOnly"],
            ListKind::Integrations => &["degradedOnly"],
        }
    }

    /// Built-in defaults, tuned to how volatile each list's data is
    pub fn config(&self) -> ListConfig {
        let (page_size, stale_secs) = match self {
            ListKind::Events => (50, 60),
            ListKind::Errors => (25, 5 * 60),
            ListKind::Alerts => (25, 2 * 60),
            ListKind::Analytics => (100, 10 * 60),
            ListKind::Journeys => (20, 30 * 60),
            ListKind::Integrations => (20, 60),
        };
        ListConfig {
            page_size,
            search_debounce: Duration::from_millis(300),
            stale_time: Duration::from_secs(stale_secs),
            cache_capacity: 16,
            default_window_days: 7,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        ListKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VigilError::Config(format!("unknown list kind: {}", s)))
    }
}

/// Fetch, cache and debounce settings for one list
#[derive(Clone, Debug, PartialEq)]
pub struct ListConfig {
    /// Items requested per page
    pub page_size: usize,
    /// Quiescence window for search text
    pub search_debounce: Duration,
    /// How long fetched pages count as fresh
    pub stale_time: Duration,
    /// Distinct criteria sets kept in the page cache
    pub cache_capacity: usize,
    /// Length of the default "last N days" window
    pub default_window_days: i64,
}

impl Default for ListConfig {
    fn default() -> Self {
        ListKind::Events.config()
    }
}

impl ListConfig {
    /// Defaults for `kind` with `VIGIL_<KIND>_*` overrides applied
    pub fn from_env(kind: ListKind) -> Self {
        let prefix = format!("VIGIL_{}", kind.as_str().to_ascii_uppercase());
        Self::from_lookup(kind, |name| std::env::var(format!("{}_{}", prefix, name)).ok())
    }

    fn from_lookup(kind: ListKind, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = kind.config();
        let num = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(v) = num("PAGE_SIZE") {
            cfg.page_size = v as usize;
        }
        if let Some(v) = num("DEBOUNCE_MS") {
            cfg.search_debounce = Duration::from_millis(v);
        }
        if let Some(v) = num("STALE_SECS") {
            cfg.stale_time = Duration::from_secs(v);
        }
        if let Some(v) = num("CACHE_CAPACITY") {
            cfg.cache_capacity = v as usize;
        }
        if let Some(v) = num("WINDOW_DAYS").and_then(|v| i64::try_from(v).ok()) {
            cfg.default_window_days = v;
        }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(VigilError::Config("page_size must be positive".into()));
        }
        if self.cache_capacity == 0 {
            return Err(VigilError::Config("cache_capacity must be positive".into()));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.default_window_days) {
            return Err(VigilError::Config(format!(
                "default_window_days must be between 0 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        Ok(())
    }
}
