//! Dashboard list rows as returned by the REST API.

use crate::pagination::ListItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tracked analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    pub id: String,
    pub name: String,
    pub category: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub has_error: bool,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Errors grouped by fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorGroup {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub status: String,
    pub occurrences: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub enabled: bool,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Health probe result for an integration provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub id: String,
    pub provider: String,
    pub status: String,
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// One user's pass through a journey funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRun {
    pub id: String,
    pub funnel: String,
    pub steps_completed: u32,
    pub steps_total: u32,
    pub started_at: DateTime<Utc>,
}

impl JourneyRun {
    pub fn completed(&self) -> bool {
        self.steps_total > 0 && self.steps_completed >= self.steps_total
    }
}

macro_rules! impl_list_item {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ListItem for $ty {
                type Id = String;

                fn id(&self) -> String {
                    self.id.clone()
                }
            }
        )+
    };
}

impl_list_item!(TrackedEvent, ErrorGroup, AlertRule, ProviderHealth, JourneyRun);
