//! Fetcher integration tests against a mock upstream.
//!
//! Covers the pagination contract: continue until an empty page (a short
//! page is not a termination signal), hard page cap reported as possible
//! truncation, shape validation of untrusted responses, and retry
//! behavior for transient failures.

use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

mod test_utils;
use test_utils::test_marketplace_api;

use vigia::marketplace::types::OrderWindow;
use vigia::marketplace::{FetchError, OrderFetcher};

fn orders_page(start_id: u64, count: usize) -> Value {
    let records: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": start_id + i as u64,
                "status": "processing",
                "channel": "mlb",
                "date_created": "2026-01-10T12:00:00Z",
            })
        })
        .collect();
    Value::Array(records)
}

fn wide_window() -> OrderWindow {
    OrderWindow::new(
        "2026-01-01T00:00:00Z".parse().unwrap(),
        "2026-01-31T23:59:59Z".parse().unwrap(),
    )
}

#[tokio::test]
async fn test_pagination_completeness_short_page_is_not_termination() {
    let mock_server = MockServer::start().await;

    // Pages of sizes [500, 500, 137, 0]: the 137-record page must not stop
    // the fetch; only the empty page does.
    for (skip, start_id, count) in [(0, 1, 500), (500, 501, 500), (1000, 1001, 137), (1500, 0, 0)]
    {
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("skip", skip.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(orders_page(start_id, count)))
            .mount(&mock_server)
            .await;
    }

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let report = OrderFetcher::new(api)
        .fetch_all(&wide_window(), None)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1137);
    assert_eq!(report.pages_fetched, 4);
    assert!(!report.truncated);
}

#[tokio::test]
async fn test_pagination_safety_cap_reports_truncation() {
    let mock_server = MockServer::start().await;

    // Upstream never returns an empty page.
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orders_page(1, 10)))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 10, 5);
    let report = OrderFetcher::new(api)
        .fetch_all(&wide_window(), None)
        .await
        .unwrap();

    assert!(report.truncated);
    assert_eq!(report.pages_fetched, 5);
}

#[tokio::test]
async fn test_object_body_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error": "maintenance mode"})),
        )
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let result = OrderFetcher::new(api).fetch_all(&wide_window(), None).await;

    assert!(matches!(result, Err(FetchError::Malformed { page: 0, .. })));
}

#[tokio::test]
async fn test_non_object_element_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, 42])))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let result = OrderFetcher::new(api).fetch_all(&wide_window(), None).await;

    assert!(matches!(result, Err(FetchError::Malformed { .. })));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;

    // First attempt fails with a 500, subsequent attempts succeed.
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orders_page(1, 3)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("skip", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orders_page(0, 0)))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 3, 200);
    let report = OrderFetcher::new(api)
        .fetch_all(&wide_window(), None)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 3);
    // Two requests for page 0 (failed + retried) plus the empty page.
    assert_eq!(report.api_calls, 3);
}

#[tokio::test]
async fn test_exhausted_retries_surface_as_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let result = OrderFetcher::new(api).fetch_all(&wide_window(), None).await;

    match result {
        Err(FetchError::Transient { page, attempts, .. }) => {
            assert_eq!(page, 0);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected Transient, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let result = OrderFetcher::new(api).fetch_all(&wide_window(), None).await;

    assert!(matches!(
        result,
        Err(FetchError::Http { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_credentials_are_sent_on_every_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-api-secret", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let report = OrderFetcher::new(api)
        .fetch_all(&wide_window(), None)
        .await
        .unwrap();

    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_window_filter_applies_after_fetch() {
    let mock_server = MockServer::start().await;

    let body = json!([
        {"id": 1, "status": "processing", "date_created": "2026-01-10T12:00:00Z"},
        {"id": 2, "status": "processing", "date_created": "2025-06-01T12:00:00Z"},
        {"id": 3, "status": "processing", "channel": "shopee", "date_created": "2026-01-11T12:00:00Z"},
    ]);

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("skip", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("skip", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let api = test_marketplace_api(&mock_server.uri(), 500, 200);
    let report = OrderFetcher::new(api)
        .fetch_all(&wide_window(), Some("mlb"))
        .await
        .unwrap();

    // Record 2 is outside the window; record 3 belongs to another channel;
    // record 1 has no channel field and passes through the scope filter.
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0]["id"], 1);
}
