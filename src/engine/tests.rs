//! Tests for engine module

use super::*;
use crate::auth::ApiToken;
use crate::error::Error;
use crate::limit::LimitCalculator;
use crate::state::StateScope;
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn event_time() -> NaiveDateTime {
    at(5, 7, 30)
}

fn run() -> RunContext {
    RunContext::new("demo", ApiToken::new("user:key"), event_time())
}

fn engine(server: &MockServer) -> PaginationEngine {
    PaginationEngine::new(HttpClient::new().unwrap(), BlobStore::in_memory())
        .with_api_base(ApiBase::single(server.uri()))
}

async fn seed_last_success(engine: &PaginationEngine, data_type: &str, ts: NaiveDateTime) {
    engine
        .state()
        .save_last_successful_job_time(&StateScope::new("demo", data_type, false), &ts)
        .await
        .unwrap();
}

async fn stored_keys(engine: &PaginationEngine, prefix: &str) -> Vec<String> {
    engine
        .store()
        .list(prefix)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key)
        .collect()
}

// ============================================================================
// RunContext Tests
// ============================================================================

#[test]
fn test_request_budget() {
    let mut run = run().with_request_budget(2);
    run.record_request().unwrap();
    run.record_request().unwrap();
    let err = run.record_request().unwrap_err();
    assert!(matches!(
        err,
        Error::RequestBudgetExhausted { ref domain, budget: 2 } if domain == "demo"
    ));
    assert_eq!(run.requests_made(), 2);
}

#[test]
fn test_error_budget() {
    let mut budget = ErrorBudget::new(3);
    assert!(!budget.record_failure());
    assert!(!budget.record_failure());
    assert!(budget.record_failure());

    budget.reset();
    assert_eq!(budget.failures(), 0);
    assert_eq!(budget.max(), 3);
}

#[test]
fn test_lag_shifts_event_time() {
    let run = run().with_lag(5);
    assert_eq!(run.event_time, at(5, 7, 25));
}

#[test]
fn test_output_dir() {
    assert_eq!(
        run().output_dir("case"),
        "demo/snowflake-copy/case/2024/01/05/07"
    );
    assert_eq!(
        run().with_test_mode(true).output_dir("case"),
        "demo/snowflake-copy/case-test/2024/01/05/07"
    );

    let custom = run().with_date_range(DateRangeOverride {
        range: DateRange::new(at(1, 0, 0), at(2, 0, 0)),
        folder: Some("backfill".to_string()),
    });
    assert_eq!(custom.output_dir("case"), "demo/snowflake-copy/backfill");

    let dated = run().with_date_range(DateRangeOverride {
        range: DateRange::new(at(1, 0, 0), at(2, 0, 0)),
        folder: None,
    });
    assert_eq!(dated.output_dir("case"), "demo/snowflake-copy/case/2024/01/05/07");
}

#[test]
fn test_api_url() {
    let api = ApiBase::default();
    let spec = DataTypeSpec::indexed("case", "v0.5", 10);

    assert_eq!(
        api.url_for(&spec, &run()),
        "https://www.commcarehq.org/a/demo/api/v0.5/case/"
    );

    let staging = RunContext::new("staging-demo", ApiToken::new("k"), event_time())
        .with_staging(true);
    assert_eq!(
        api.url_for(&spec, &staging),
        "https://staging.commcarehq.org/a/demo/api/v0.5/case/"
    );
}

// ============================================================================
// Date Range Tests
// ============================================================================

#[tokio::test]
async fn test_missing_state_is_reported_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine(&server);
    let mut run = run();
    let err = engine
        .pull(&mut run, &DataTypeSpec::indexed("case", "v0.5", 2))
        .await
        .unwrap_err();

    assert!(err.is_missing_state());
    assert_eq!(run.requests_made(), 0);
}

#[tokio::test]
async fn test_resolve_date_range_from_state() {
    let server = MockServer::start().await;
    let engine = engine(&server);
    seed_last_success(&engine, "form", at(4, 0, 0)).await;

    let range = engine
        .resolve_date_range(&DataTypeSpec::indexed("form", "v0.5", 2), &run())
        .await
        .unwrap();
    assert_eq!(range, DateRange::new(at(4, 0, 0), event_time()));
}

// ============================================================================
// Indexed Pull Tests
// ============================================================================

#[tokio::test]
async fn test_indexed_pull_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/demo/api/v0.5/case/"))
        .and(header("Authorization", "ApiKey user:key"))
        .and(query_param("indexed_on_start", "2024-01-04T00:00:00"))
        .and(query_param("indexed_on_end", "2024-01-05T07:30:00"))
        .and(query_param("order_by", "indexed_on"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": "?cursor=page2", "limit": 2},
            "objects": [
                {"id": "a", "indexed_on": "2024-01-04T01:00:00.000000Z"},
                {"id": "b", "indexed_on": "2024-01-04T02:00:00.000000Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a/demo/api/v0.5/case/"))
        .and(query_param("indexed_on_start", "2024-01-04T02:00:00"))
        .and(query_param("indexed_on_end", "2024-01-05T07:30:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null, "limit": 2},
            "objects": [{"id": "c", "indexed_on": "2024-01-04T03:00:00.000000Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let spec = DataTypeSpec::from_value(
        "case",
        &json!({"name": "case", "version": "v0.5", "limit": 2, "uses_cursor_index": true}),
    )
    .unwrap();
    let mut run = run();
    let stats = engine.pull(&mut run, &spec).await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.pages_stored, 2);
    assert_eq!(stats.records, 3);
    assert_eq!(run.requests_made(), 2);

    let dir = "demo/snowflake-copy/case/2024/01/05/07";
    assert_eq!(
        stored_keys(&engine, dir).await,
        vec![
            format!("{dir}/case_2024-01-04T00:00:00_2024-01-04T02:00:00.json"),
            format!("{dir}/case_2024-01-04T02:00:00_2024-01-05T07:30:00.json"),
        ]
    );

    let first = engine
        .store()
        .get_text(&format!(
            "{dir}/case_2024-01-04T00:00:00_2024-01-04T02:00:00.json"
        ))
        .await
        .unwrap();
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["objects"][1]["id"], "b");

    let saved = engine
        .state()
        .last_successful_job_time(&run.scope("case"))
        .await
        .unwrap();
    assert_eq!(saved, Some(event_time()));
}

#[tokio::test]
async fn test_empty_page_is_not_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null, "limit": 1000},
            "objects": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "form", at(5, 7, 0)).await;

    let mut run = run();
    let stats = engine
        .pull(&mut run, &DataTypeSpec::indexed("form", "v0.5", 1000))
        .await
        .unwrap();

    assert_eq!(stats.pages_stored, 0);
    assert!(stored_keys(&engine, "demo/snowflake-copy/form/2024").await.is_empty());
    assert_eq!(
        engine
            .state()
            .last_successful_job_time(&run.scope("form"))
            .await
            .unwrap(),
        Some(event_time())
    );
}

#[tokio::test]
async fn test_override_range_leaves_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("indexed_on_start", "2023-12-01T00:00:00"))
        .and(query_param("indexed_on_end", "2023-12-02T00:00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null},
            "objects": [{"indexed_on": "2023-12-01T05:00:00"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let start = NaiveDate::from_ymd_opt(2023, 12, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut run = run().with_date_range(DateRangeOverride {
        range: DateRange::new(start, end),
        folder: Some("backfill-dec".to_string()),
    });

    engine
        .pull(&mut run, &DataTypeSpec::indexed("case", "v0.5", 100))
        .await
        .unwrap();

    assert_eq!(
        stored_keys(&engine, "demo/snowflake-copy/backfill-dec").await,
        vec!["demo/snowflake-copy/backfill-dec/case_2023-12-01T00:00:00_2023-12-02T00:00:00.json"]
    );
    assert_eq!(
        engine
            .state()
            .last_successful_job_time(&run.scope("case"))
            .await
            .unwrap(),
        Some(at(4, 0, 0))
    );
}

#[tokio::test]
async fn test_api_failure_propagates_without_saving_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let mut run = run();
    let err = engine
        .pull(&mut run, &DataTypeSpec::indexed("case", "v0.5", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, .. }));
    assert!(err.is_recoverable());
    assert_eq!(
        engine
            .state()
            .last_successful_job_time(&run.scope("case"))
            .await
            .unwrap(),
        Some(at(4, 0, 0))
    );
}

#[tokio::test]
async fn test_request_budget_exhausted_mid_pull() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": "?more"},
            "objects": [{"id": 1}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "location", at(4, 0, 0)).await;

    let mut run = run().with_request_budget(2);
    let err = engine
        .pull(&mut run, &DataTypeSpec::cursor("location", "v0.5", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RequestBudgetExhausted { budget: 2, .. }));
    assert!(!err.is_recoverable());
    assert_eq!(
        stored_keys(&engine, "demo/snowflake-copy/location/2024/01/05/07")
            .await
            .len(),
        2
    );
    assert_eq!(
        engine
            .state()
            .last_successful_job_time(&run.scope("location"))
            .await
            .unwrap(),
        Some(at(4, 0, 0))
    );
}

#[tokio::test]
async fn test_stalled_index_stops_after_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": "?more", "limit": 2},
            "objects": [
                {"id": 1, "indexed_on": "2024-01-04T00:00:00.000000Z"},
                {"id": 2, "indexed_on": "2024-01-04T00:00:00.000000Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let mut run = run().with_request_budget(50);
    let err = engine
        .pull(&mut run, &DataTypeSpec::indexed("case", "v0.5", 2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Pagination { ref data_type, .. } if data_type == "case"));
    assert_eq!(run.requests_made(), 1);
    assert!(stored_keys(&engine, "demo/snowflake-copy/case/2024").await.is_empty());
    assert_eq!(
        engine
            .state()
            .last_successful_job_time(&run.scope("case"))
            .await
            .unwrap(),
        Some(at(4, 0, 0))
    );
}

// ============================================================================
// Limit Bounds Tests
// ============================================================================

#[tokio::test]
async fn test_static_limit_is_capped_at_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null},
            "objects": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "location", at(4, 0, 0)).await;

    let spec = DataTypeSpec::from_value("location", &json!({"version": "v0.5", "limit": 50_000}))
        .unwrap();
    let mut run = run();
    let stats = engine.pull(&mut run, &spec).await.unwrap();
    assert_eq!(stats.limit, 10_000);
}

#[tokio::test]
async fn test_stored_limit_is_capped_before_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null},
            "objects": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let engine = engine(&server).with_calculator(LimitCalculator::new(16.0, 40, 0.5));
    seed_last_success(&engine, "case", at(4, 0, 0)).await;
    engine
        .state()
        .save_api_limit(&StateScope::new("demo", "case", false), 50_000)
        .await
        .unwrap();

    let spec = DataTypeSpec::indexed("case", "v0.5", 20).with_auto_limit();
    let mut run = run();
    let stats = engine.pull(&mut run, &spec).await.unwrap();
    assert_eq!(stats.limit, 40);
    assert_eq!(run.requests_made(), 2);
}

#[tokio::test]
async fn test_pull_without_limit_is_rejected() {
    let server = MockServer::start().await;
    let engine = engine(&server);
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let mut spec = DataTypeSpec::indexed("case", "v0.5", 10);
    spec.limit = None;
    let mut run = run();
    let err = engine.pull(&mut run, &spec).await.unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { ref field } if field == "api_info.case.limit"));
    assert_eq!(run.requests_made(), 0);
}

// ============================================================================
// Cursor Pull Tests
// ============================================================================

#[tokio::test]
async fn test_cursor_pull_follows_next() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a/demo/api/v0.5/location/"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": "?cursor=abc", "limit": 2},
            "objects": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a/demo/api/v0.5/location/"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": "", "limit": 2},
            "objects": [{"id": 3}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    seed_last_success(&engine, "location", at(4, 0, 0)).await;

    let mut run = run();
    engine
        .pull(&mut run, &DataTypeSpec::cursor("location", "v0.5", 2))
        .await
        .unwrap();

    let dir = "demo/snowflake-copy/location/2024/01/05/07";
    assert_eq!(
        stored_keys(&engine, dir).await,
        vec![
            format!("{dir}/location_2024-01-04T00:00:00_2024-01-05T07:30:00_1.json"),
            format!("{dir}/location_2024-01-04T00:00:00_2024-01-05T07:30:00_2.json"),
        ]
    );
}

// ============================================================================
// Adaptive Limit Tests
// ============================================================================

#[tokio::test]
async fn test_adaptive_limit_probe_then_pull() {
    let server = MockServer::start().await;
    let body = json!({
        "meta": {"next": null, "limit": 1000},
        "objects": [{"id": 1, "indexed_on": "2024-01-04T01:00:00"}]
    });
    let size = serde_json::to_vec(&body).unwrap().len();
    let observed_mb = size as f64 / (1024.0 * 1024.0);

    Mock::given(method("GET"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    // Allowed size is exactly twice the probe, so 1000 * 2 * 0.25 = 500
    let engine = engine(&server).with_calculator(LimitCalculator::new(observed_mb * 2.0, 10_000, 0.25));
    seed_last_success(&engine, "case", at(4, 0, 0)).await;

    let spec = DataTypeSpec::indexed("case", "v0.5", 1000).with_auto_limit();
    let mut run = run();
    let stats = engine.pull(&mut run, &spec).await.unwrap();

    assert_eq!(stats.limit, 500);
    assert_eq!(run.requests_made(), 2);
    assert_eq!(
        engine.state().api_limit(&run.scope("case")).await.unwrap(),
        Some(500)
    );
}

#[tokio::test]
async fn test_adaptive_limit_starts_from_stored_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("limit", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"next": null},
            "objects": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    // A ceiling of 40 keeps the limit where it is
    let engine = engine(&server).with_calculator(LimitCalculator::new(16.0, 40, 0.5));
    seed_last_success(&engine, "case", at(4, 0, 0)).await;
    engine
        .state()
        .save_api_limit(&StateScope::new("demo", "case", false), 40)
        .await
        .unwrap();

    let spec = DataTypeSpec::indexed("case", "v0.5", 5000).with_auto_limit();
    let mut run = run();
    let stats = engine.pull(&mut run, &spec).await.unwrap();
    assert_eq!(stats.limit, 40);
}
