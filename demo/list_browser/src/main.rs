mod config;
mod simulated;

use config::ListBrowserConfig;
use simulated::SimulatedEvents;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use vigil_core::api::RestPageSource;
use vigil_core::records::TrackedEvent;
use vigil_core::telemetry::init_logging;
use vigil_core::{
    CriteriaPatch, DateRange, FetchState, FilterCriteria, FilteredList, JsonFileStore, ListKind,
    ListView, PageSource, PersistedStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info,vigil_core=info,list_browser=info");

    info!(target: "list_browser", "Starting list browser demo");

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = ListBrowserConfig::load();

    let store = match JsonFileStore::new(&cfg.data_dir) {
        Ok(backend) => Arc::new(PersistedStore::new(Arc::new(backend))),
        Err(e) => {
            warn!(target: "list_browser", error = %e, dir = %cfg.data_dir.display(), "Saved filters will not persist");
            Arc::new(PersistedStore::in_memory())
        }
    };

    info!(
        target: "list_browser",
        facets = ?ListKind::Events.facets(),
        toggles = ?ListKind::Events.toggles(),
        page_size = cfg.list.page_size,
        "Events list profile"
    );

    let defaults = FilterCriteria::new(DateRange::last_days(cfg.list.default_window_days));

    if cfg.use_api {
        let source = RestPageSource::<TrackedEvent>::for_kind(&cfg.api, ListKind::Events)?;
        info!(target: "list_browser", url = %source.url(), "Browsing events from API");
        let list = FilteredList::new(
            ListKind::Events.as_str(),
            Arc::new(source),
            cfg.list.clone(),
            defaults,
            store,
        )?;
        browse(list).await;
    } else {
        let source = SimulatedEvents::new(&cfg.simulation, chrono::Utc::now());
        info!(target: "list_browser", events = cfg.simulation.total_events, "Browsing simulated events");
        let list = FilteredList::new(
            ListKind::Events.as_str(),
            Arc::new(source),
            cfg.list.clone(),
            defaults,
            store,
        )?;
        browse(list).await;
    }

    info!(target: "list_browser", "Done");
    Ok(())
}

/// Walk through a typical session on the events list
async fn browse<P>(list: FilteredList<P>)
where
    P: PageSource<Item = TrackedEvent>,
{
    let mut views = list.subscribe();
    let view = settle(&mut views, 1).await;
    report("initial", &view);

    // 1) Scroll to the bottom: the sentinel pulls the next pages in
    let (sentinel, visibility) = watch::channel(false);
    let loader = list.attach_sentinel(visibility);
    sentinel.send_replace(true);
    let _ = tokio::time::timeout(
        Duration::from_secs(5),
        views.wait_for(|v| (v.pages >= 3 || !v.has_next) && !v.is_fetching()),
    )
    .await;
    sentinel.send_replace(false);
    report("after scrolling", &list.view());

    // 2) Type a search; only the settled text is fetched
    let next = list.view().generation + 1;
    for text in ["che", "check", "checkout"] {
        if let Err(e) = list.update(&CriteriaPatch::new().search(text)).await {
            warn!(target: "list_browser", error = %e, "Search rejected");
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
    let view = settle(&mut views, next).await;
    report("search 'checkout'", &view);

    // 3) Narrow by facet and toggle; applied at once
    let next = list.view().generation + 1;
    let narrowed = CriteriaPatch::new()
        .facet("platforms", ["ios"])
        .toggle("hasErrors", true);
    if let Err(e) = list.update(&narrowed).await {
        warn!(target: "list_browser", error = %e, "Filter rejected");
    }
    let view = settle(&mut views, next).await;
    info!(target: "list_browser", active = list.active_count().await, "Active filters");
    report("ios checkout errors", &view);

    // 4) Save the preset, reset, then bring it back
    let saved = list.save("iOS checkout errors").await;
    for preset in list.saved().await {
        info!(target: "list_browser", id = %preset.id, name = %preset.name, created = %preset.created_at, "Saved filter");
    }

    let next = list.view().generation + 1;
    list.reset().await;
    let view = settle(&mut views, next).await;
    report("reset", &view);

    if let Some(saved) = saved {
        let next = list.view().generation + 1;
        list.load(&saved).await;
        let view = settle(&mut views, next).await;
        report("loaded preset", &view);
        list.delete(&saved.id).await;
    }

    // Retry once if the last request failed
    if list.view().error().is_some() && list.refetch().await {
        let view = settle(&mut views, list.view().generation).await;
        report("after retry", &view);
    }

    drop(loader);
    let stats = list.stats().await;
    info!(
        target: "list_browser",
        requests = stats.requests_issued,
        pages = stats.pages_fetched,
        errors = stats.fetch_errors,
        stale_discarded = stats.stale_discarded,
        duplicates = stats.duplicates_dropped,
        cache_hits = stats.cache_hits,
        "Session stats"
    );
}

async fn settle(
    views: &mut watch::Receiver<ListView<TrackedEvent>>,
    generation: u64,
) -> ListView<TrackedEvent> {
    let settled = matches!(
        tokio::time::timeout(
            Duration::from_secs(10),
            views.wait_for(|v| {
                v.generation >= generation && !v.is_fetching() && v.state != FetchState::Idle
            }),
        )
        .await,
        Ok(Ok(_))
    );
    if !settled {
        warn!(target: "list_browser", generation, "Gave up waiting for the list to settle");
    }
    views.borrow().clone()
}

fn report(step: &str, view: &ListView<TrackedEvent>) {
    match view.error() {
        Some(failure) => warn!(target: "list_browser", step, %failure, items = view.items.len(), "List in error"),
        None => info!(
            target: "list_browser",
            step,
            items = view.items.len(),
            pages = view.pages,
            has_next = view.has_next,
            first = view.items.first().map(|e| e.name.as_str()).unwrap_or("-"),
            "List updated"
        ),
    }
}
