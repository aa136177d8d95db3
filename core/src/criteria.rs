//! Filter criteria shared by every list view.
//!
//! Criteria are kept normalised: empty facet sets and blank search text are
//! dropped, so an absent facet and an empty one compare, fingerprint and
//! count the same.

use crate::{Result, VigilError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Query window for a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Create a range, rejecting `from > to`
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    /// The `days` days leading up to now
    pub fn last_days(days: i64) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    /// The `days` days leading up to `to`
    ///
    /// Windows reaching past the earliest representable instant start there.
    pub fn ending_at(to: DateTime<Utc>, days: i64) -> Self {
        let from = Duration::try_days(days.max(0))
            .and_then(|span| to.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { from, to }
    }

    pub fn validate(&self) -> Result<()> {
        if self.from > self.to {
            return Err(VigilError::InvalidFilter(format!(
                "date range starts after it ends ({} > {})",
                self.from.to_rfc3339(),
                self.to.to_rfc3339()
            )));
        }
        Ok(())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts <= self.to
    }
}

/// A single selected value of a multi-select facet
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetValue::Number(n) => write!(f, "{}", n),
            FacetValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        FacetValue::Text(value.to_string())
    }
}

impl From<String> for FacetValue {
    fn from(value: String) -> Self {
        FacetValue::Text(value)
    }
}

impl From<i64> for FacetValue {
    fn from(value: i64) -> Self {
        FacetValue::Number(value)
    }
}

/// Current filter selection for one list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub date_range: DateRange,
    /// Facet key -> selected values. A missing key means no restriction.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub facets: BTreeMap<String, BTreeSet<FacetValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Optional boolean toggles such as `hasErrors`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub toggles: BTreeMap<String, bool>,
}

impl FilterCriteria {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            facets: BTreeMap::new(),
            search: None,
            toggles: BTreeMap::new(),
        }
    }

    /// Builder: select `values` for facet `key`
    pub fn with_facet<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        self.facets
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self.normalize();
        self
    }

    /// Builder: set the search text
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self.normalize();
        self
    }

    /// Builder: set a boolean toggle
    pub fn with_toggle(mut self, key: impl Into<String>, value: bool) -> Self {
        self.toggles.insert(key.into(), value);
        self
    }

    pub fn facet(&self, key: &str) -> Option<&BTreeSet<FacetValue>> {
        self.facets.get(key)
    }

    pub fn toggle(&self, key: &str) -> bool {
        self.toggles.get(key).copied().unwrap_or(false)
    }

    pub fn validate(&self) -> Result<()> {
        self.date_range.validate()
    }

    /// Drop empty facet sets and trim search text, dropping it when blank
    pub fn normalize(&mut self) {
        self.facets.retain(|_, values| !values.is_empty());
        self.search = self
            .search
            .take()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }

    /// Shallow-merge a patch. Rejected patches leave `self` untouched.
    pub fn apply(&mut self, patch: &CriteriaPatch) -> Result<()> {
        let mut next = self.clone();

        if let Some(range) = patch.date_range {
            next.date_range = range;
        }
        for (key, values) in &patch.facets {
            next.facets.insert(key.clone(), values.clone());
        }
        if let Some(search) = &patch.search {
            next.search = search.clone();
        }
        for (key, value) in &patch.toggles {
            match value {
                Some(v) => {
                    next.toggles.insert(key.clone(), *v);
                }
                None => {
                    next.toggles.remove(key);
                }
            }
        }

        next.validate()?;
        next.normalize();
        *self = next;
        Ok(())
    }

    /// Number of active filters shown on the filter badge.
    ///
    /// One per facet with a selection, one for non-blank search text and one
    /// if any toggle is on. The date range never counts.
    pub fn active_count(&self) -> usize {
        let facets = self.facets.values().filter(|v| !v.is_empty()).count();
        let search = self
            .search
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty()) as usize;
        let toggles = self.toggles.values().any(|on| *on) as usize;
        facets + search + toggles
    }

    /// Stable cache key.
    ///
    /// Equal criteria always produce equal fingerprints and different
    /// criteria never share one: the key is the canonical JSON encoding,
    /// where maps and sets are ordered and strings are quoted.
    pub fn fingerprint(&self) -> String {
        let mut canonical = self.clone();
        canonical.normalize();
        serde_json::to_string(&canonical).unwrap_or_else(|_| format!("{:?}", canonical))
    }
}

/// Partial update for `FilterCriteria`.
///
/// Every field present in the patch replaces the current value wholesale;
/// facet sets are never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaPatch {
    pub date_range: Option<DateRange>,
    pub facets: BTreeMap<String, BTreeSet<FacetValue>>,
    /// `Some(None)` clears the search text
    pub search: Option<Option<String>>,
    /// `None` clears the toggle
    pub toggles: BTreeMap<String, Option<bool>>,
}

impl CriteriaPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn facet<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        self.facets
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn clear_facet(mut self, key: impl Into<String>) -> Self {
        self.facets.insert(key.into(), BTreeSet::new());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(Some(text.into()));
        self
    }

    pub fn clear_search(mut self) -> Self {
        self.search = Some(None);
        self
    }

    pub fn toggle(mut self, key: impl Into<String>, value: bool) -> Self {
        self.toggles.insert(key.into(), Some(value));
        self
    }

    pub fn clear_toggle(mut self, key: impl Into<String>) -> Self {
        self.toggles.insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.facets.is_empty()
            && self.search.is_none()
            && self.toggles.is_empty()
    }

    /// True when the patch changes nothing but the search text
    pub fn only_search(&self) -> bool {
        self.search.is_some()
            && self.date_range.is_none()
            && self.facets.is_empty()
            && self.toggles.is_empty()
    }
}
