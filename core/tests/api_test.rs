//! REST Page Source Tests
//!
//! Runs the HTTP adapter against a local mock server.

use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::api::{ApiConfig, RestPageSource};
use vigil_core::records::{JourneyRun, TrackedEvent};
use vigil_core::{
    DateRange, FetchState, FilterCriteria, FilteredList, ListConfig, ListKind, ListView,
    PageSource, PaginatedCoordinator, PersistedStore, VigilError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: server.uri(),
        request_timeout_ms: 2_000,
    }
}

fn criteria() -> FilterCriteria {
    let to = chrono::DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    FilterCriteria::new(DateRange::ending_at(to, 7))
}

fn event(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "checkout_completed",
        "category": "checkout",
        "platform": "ios",
        "timestamp": "2024-05-30T12:00:00Z",
        "properties": { "amount": 42 }
    })
}

async fn settled(
    rx: &mut tokio::sync::watch::Receiver<ListView<TrackedEvent>>,
) -> ListView<TrackedEvent> {
    let view = rx
        .wait_for(|v| v.state != FetchState::Idle && !v.is_fetching())
        .await
        .unwrap();
    view.clone()
}

// =============================================================================
// Config
// =============================================================================

#[test]
#[serial]
fn api_config_reads_env() {
    std::env::remove_var("VIGIL_API_URL");
    std::env::remove_var("VIGIL_API_TIMEOUT_MS");
    let cfg = ApiConfig::default();
    assert_eq!(cfg.base_url, "http://localhost:8080");
    assert_eq!(cfg.request_timeout_ms, 15_000);

    std::env::set_var("VIGIL_API_URL", "https://dash.internal");
    std::env::set_var("VIGIL_API_TIMEOUT_MS", "500");
    let cfg = ApiConfig::default();
    assert_eq!(cfg.base_url, "https://dash.internal");
    assert_eq!(cfg.request_timeout_ms, 500);

    std::env::remove_var("VIGIL_API_URL");
    std::env::remove_var("VIGIL_API_TIMEOUT_MS");
}

#[test]
#[serial]
fn list_config_env_overrides() {
    std::env::set_var("VIGIL_ERRORS_PAGE_SIZE", "10");
    std::env::set_var("VIGIL_ERRORS_DEBOUNCE_MS", "150");

    let cfg = ListConfig::from_env(ListKind::Errors);
    assert_eq!(cfg.page_size, 10);
    assert_eq!(cfg.search_debounce, Duration::from_millis(150));
    assert_eq!(cfg.stale_time, ListKind::Errors.config().stale_time);

    std::env::remove_var("VIGIL_ERRORS_PAGE_SIZE");
    std::env::remove_var("VIGIL_ERRORS_DEBOUNCE_MS");
}

#[tokio::test]
#[serial]
async fn oversized_window_from_env_is_a_config_error() {
    std::env::set_var("VIGIL_JOURNEYS_WINDOW_DAYS", "1000000000");

    let source = Arc::new(
        RestPageSource::<JourneyRun>::for_kind(&ApiConfig::default(), ListKind::Journeys).unwrap(),
    );
    let result = FilteredList::for_kind(
        ListKind::Journeys,
        source,
        Arc::new(PersistedStore::in_memory()),
    );
    std::env::remove_var("VIGIL_JOURNEYS_WINDOW_DAYS");

    assert!(matches!(result, Err(VigilError::Config(_))));
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn fetches_page_with_criteria_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("categories", "checkout,payment"))
        .and(query_param("search", "card declined"))
        .and(query_param("hasErrors", "true"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [event("e3"), event("e4")],
            "hasMore": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = RestPageSource::<TrackedEvent>::for_kind(&api(&server), ListKind::Events).unwrap();
    assert!(source.url().ends_with("/api/events"));

    let criteria = criteria()
        .with_facet("categories", ["payment", "checkout"])
        .with_search("card declined")
        .with_toggle("hasErrors", true);
    let page = source.fetch_page(&criteria, 1, 2).await.unwrap();

    assert!(page.has_more);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "e3");
    assert!(!page.items[0].has_error);
}

#[tokio::test]
async fn missing_has_more_means_last_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [event("e1")] })))
        .mount(&server)
        .await;

    let source = RestPageSource::<TrackedEvent>::for_kind(&api(&server), ListKind::Events).unwrap();
    let page = source.fetch_page(&criteria(), 0, 50).await.unwrap();
    assert!(!page.has_more);
}

#[tokio::test]
async fn server_error_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = RestPageSource::<TrackedEvent>::for_kind(&api(&server), ListKind::Events).unwrap();
    let err = source.fetch_page(&criteria(), 0, 50).await.unwrap_err();

    match err {
        VigilError::Fetch(reason) => assert!(reason.contains("503")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let source = RestPageSource::<TrackedEvent>::for_kind(&api(&server), ListKind::Events).unwrap();
    assert!(matches!(
        source.fetch_page(&criteria(), 0, 50).await,
        Err(VigilError::Fetch(_))
    ));
}

#[tokio::test]
async fn coordinator_surfaces_http_failure_and_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [event("e1"), event("e2")],
            "hasMore": false
        })))
        .mount(&server)
        .await;

    let source =
        Arc::new(RestPageSource::<TrackedEvent>::for_kind(&api(&server), ListKind::Events).unwrap());
    let coordinator = PaginatedCoordinator::new(source, ListKind::Events.config());
    let mut rx = coordinator.subscribe();

    coordinator.set_criteria(criteria()).await;
    let view = settled(&mut rx).await;
    assert_eq!(view.error().map(|f| f.page_index), Some(0));

    assert!(coordinator.refetch().await);
    let view = settled(&mut rx).await;
    assert_eq!(view.state, FetchState::Success);
    assert_eq!(view.items.len(), 2);
    assert!(!view.has_next);
}
