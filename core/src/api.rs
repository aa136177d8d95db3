//! REST adapter implementing [`PageSource`] over HTTP.
//!
//! Request: `GET {base_url}{endpoint}?from=..&to=..&<facet>=a,b&search=..&<toggle>=true&page=N&limit=M`
//! Response: `{ "items": [...], "hasMore": bool }`

use crate::config::ListKind;
use crate::criteria::FilterCriteria;
use crate::pagination::{ListItem, Page, PageSource};
use crate::{Result, VigilError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;

/// HTTP client settings
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("VIGIL_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            request_timeout_ms: std::env::var("VIGIL_API_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15_000),
        }
    }
}

/// Query parameters for one page request
pub fn page_query(
    criteria: &FilterCriteria,
    page_index: usize,
    page_size: usize,
) -> Vec<(String, String)> {
    let mut query = vec![
        ("from".to_string(), criteria.date_range.from.to_rfc3339()),
        ("to".to_string(), criteria.date_range.to.to_rfc3339()),
    ];

    for (facet, values) in &criteria.facets {
        if values.is_empty() {
            continue;
        }
        let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        query.push((facet.clone(), joined.join(",")));
    }

    if let Some(search) = criteria.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            query.push(("search".to_string(), search.to_string()));
        }
    }

    for (toggle, on) in &criteria.toggles {
        if *on {
            query.push((toggle.clone(), "true".to_string()));
        }
    }

    query.push(("page".to_string(), page_index.to_string()));
    query.push(("limit".to_string(), page_size.to_string()));
    query
}

/// Page source backed by a dashboard REST endpoint
pub struct RestPageSource<T> {
    client: reqwest::Client,
    url: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestPageSource<T> {
    pub fn new(config: &ApiConfig, endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| VigilError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), endpoint),
            _item: PhantomData,
        })
    }

    pub fn for_kind(config: &ApiConfig, kind: ListKind) -> Result<Self> {
        Self::new(config, &kind.endpoint())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl<T> PageSource for RestPageSource<T>
where
    T: ListItem + DeserializeOwned,
{
    type Item = T;

    async fn fetch_page(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<T>> {
        let query = page_query(criteria, page_index, page_size);
        debug!(target: "api", url = %self.url, page = page_index, "GET page");

        let response = self
            .client
            .get(&self.url)
            .query(&query)
            .send()
            .await
            .map_err(|e| VigilError::Fetch(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::Fetch(format!(
                "{} responded with {}",
                self.url, status
            )));
        }

        response
            .json::<Page<T>>()
            .await
            .map_err(|e| VigilError::Fetch(format!("invalid page from {}: {}", self.url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::DateRange;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_page_query_layout() {
        let to = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let criteria = FilterCriteria::new(DateRange::ending_at(to, 7))
            .with_facet("severities", ["high", "critical"])
            .with_search("  timeout ")
            .with_toggle("unresolvedOnly", true)
            .with_toggle("muted", false);

        let query = page_query(&criteria, 2, 25);
        let get = |k: &str| {
            query
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("from"), Some("2024-01-01T00:00:00+00:00"));
        assert_eq!(get("severities"), Some("critical,high"));
        assert_eq!(get("search"), Some("timeout"));
        assert_eq!(get("unresolvedOnly"), Some("true"));
        assert_eq!(get("muted"), None);
        assert_eq!(get("page"), Some("2"));
        assert_eq!(get("limit"), Some("25"));
    }
}
