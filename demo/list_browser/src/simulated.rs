// In-process events backend with the same filtering rules as the REST API

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use vigil_core::records::TrackedEvent;
use vigil_core::{FacetValue, FilterCriteria, Page, PageSource, Result, VigilError};

use crate::config::SimulationConfig;

const NAMES: [&str; 5] = [
    "checkout_started",
    "checkout_completed",
    "login_failed",
    "search_performed",
    "profile_updated",
];
const CATEGORIES: [&str; 5] = ["checkout", "checkout", "auth", "search", "profile"];
const PLATFORMS: [&str; 3] = ["ios", "android", "web"];

pub struct SimulatedEvents {
    events: Vec<TrackedEvent>,
    latency: Duration,
    fail_every: u64,
    requests: AtomicU64,
}

impl SimulatedEvents {
    /// Events spaced ten minutes apart, newest first, ending at `now`
    pub fn new(config: &SimulationConfig, now: DateTime<Utc>) -> Self {
        let events = (0..config.total_events)
            .map(|i| {
                let kind = i % NAMES.len();
                TrackedEvent {
                    id: format!("evt-{:05}", i),
                    name: NAMES[kind].to_string(),
                    category: CATEGORIES[kind].to_string(),
                    platform: PLATFORMS[i % PLATFORMS.len()].to_string(),
                    timestamp: now - ChronoDuration::minutes(10 * i as i64),
                    has_error: i % 7 == 0,
                    properties: HashMap::from([("seq".to_string(), serde_json::json!(i))]),
                }
            })
            .collect();

        Self {
            events,
            latency: Duration::from_millis(config.latency_ms),
            fail_every: config.fail_every,
            requests: AtomicU64::new(0),
        }
    }

    fn matches(event: &TrackedEvent, criteria: &FilterCriteria) -> bool {
        if !criteria.date_range.contains(event.timestamp) {
            return false;
        }
        let facet_ok = |key: &str, value: &str| {
            criteria
                .facet(key)
                .map(|values| values.contains(&FacetValue::from(value)))
                .unwrap_or(true)
        };
        if !facet_ok("categories", &event.category) || !facet_ok("platforms", &event.platform) {
            return false;
        }
        if criteria.toggle("hasErrors") && !event.has_error {
            return false;
        }
        match criteria.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                event.name.contains(&q) || event.category.contains(&q)
            }
            _ => true,
        }
    }
}

#[async_trait]
impl PageSource for SimulatedEvents {
    type Item = TrackedEvent;

    async fn fetch_page(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<TrackedEvent>> {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(self.latency).await;

        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(VigilError::Fetch(format!(
                "simulated outage on request {}",
                n
            )));
        }

        let matching: Vec<&TrackedEvent> = self
            .events
            .iter()
            .filter(|e| Self::matches(e, criteria))
            .collect();
        let start = page_index.saturating_mul(page_size).min(matching.len());
        let end = (start + page_size).min(matching.len());

        debug!(target: "list_browser", page = page_index, matching = matching.len(), "Serving simulated page");
        Ok(Page::new(
            matching[start..end].iter().map(|e| (*e).clone()).collect(),
            end < matching.len(),
        ))
    }
}
