//! Shared fixtures: a scripted page source and small helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use vigil_core::{
    DateRange, FilterCriteria, ListItem, ListView, Page, PageSource, Result, VigilError,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: u32,
    pub label: String,
}

impl ListItem for Row {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

pub fn row(id: u32) -> Row {
    Row {
        id,
        label: format!("row-{}", id),
    }
}

pub fn rows(ids: &[u32]) -> Vec<Row> {
    ids.iter().copied().map(row).collect()
}

pub fn ids(view: &ListView<Row>) -> Vec<u32> {
    view.items.iter().map(|r| r.id).collect()
}

pub fn window() -> DateRange {
    let to = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    DateRange::ending_at(to, 7)
}

pub fn criteria() -> FilterCriteria {
    FilterCriteria::new(window())
}

/// One recorded `fetch_page` call
#[derive(Debug, Clone)]
pub struct Call {
    pub criteria: FilterCriteria,
    pub page: usize,
    pub page_size: usize,
}

impl Call {
    pub fn search(&self) -> Option<&str> {
        self.criteria.search.as_deref()
    }
}

type Responder = Box<dyn Fn(&FilterCriteria, usize) -> Result<Page<Row>> + Send + Sync>;
type Latency = Box<dyn Fn(&FilterCriteria, usize) -> Duration + Send + Sync>;

/// Page source answering from a closure, recording every call
pub struct ScriptedSource {
    calls: Mutex<Vec<Call>>,
    responder: Responder,
    latency: Latency,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&FilterCriteria, usize) -> Result<Page<Row>> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            latency: Box::new(|_, _| Duration::ZERO),
            gate: None,
        }
    }

    /// Serve `pages` by index; past the end an empty last page
    pub fn pages(pages: Vec<Page<Row>>) -> Self {
        Self::new(move |_, index| Ok(pages.get(index).cloned().unwrap_or(Page::last(vec![]))))
    }

    /// Every response waits for a permit on the returned semaphore
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&FilterCriteria, usize) -> Duration + Send + Sync + 'static,
    {
        self.latency = Box::new(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    type Item = Row;

    async fn fetch_page(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<Row>> {
        self.calls.lock().unwrap().push(Call {
            criteria: criteria.clone(),
            page: page_index,
            page_size,
        });

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| VigilError::Fetch(e.to_string()))?
                .forget();
        }

        let delay = (self.latency)(criteria, page_index);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        (self.responder)(criteria, page_index)
    }
}

/// Wait until nothing is in flight for generation `generation` or later
pub async fn settle(rx: &mut watch::Receiver<ListView<Row>>, generation: u64) -> ListView<Row> {
    let view = rx
        .wait_for(|v| v.generation >= generation && !v.is_fetching() && v.state != vigil_core::FetchState::Idle)
        .await
        .expect("coordinator dropped");
    view.clone()
}

/// Let spawned tasks run without advancing the clock meaningfully
pub async fn drain() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
