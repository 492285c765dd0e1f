//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → HTTP pages → guards → filter → dataset → output

use inventory_ingest::decode::decode_parquet;
use inventory_ingest::http::RecordingSleeper;
use inventory_ingest::output::write_dataset;
use inventory_ingest::{
    load_config_str, ApiIngestor, DiagnosticKind, FetchConfig, Ingest, IngestReport, Limits,
    Severity, Termination,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(uri: &str) -> inventory_ingest::config::FetchConfigBuilder {
    FetchConfig::builder()
        .base_url(uri)
        .endpoint("/v1/stock")
        .token("test-token")
        .page_size(2)
        .allow_insecure_loopback()
}

fn ingestor(config: inventory_ingest::config::FetchConfigBuilder) -> (ApiIngestor, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let ingestor = ApiIngestor::new(config.build().unwrap())
        .unwrap()
        .with_sleeper(Arc::new(sleeper.clone()));
    (ingestor, sleeper)
}

fn rows(report: &IngestReport) -> Vec<Value> {
    report
        .dataset
        .rows()
        .iter()
        .cloned()
        .map(Value::Object)
        .collect()
}

async fn mount_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/stock"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ============================================================================
// End-to-end API runs
// ============================================================================

#[tokio::test]
async fn test_incomplete_record_dropped_and_run_completes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/stock"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "2"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"sku": "A", "quantity": 3}, {"sku": "B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, json!({"data": []})).await;

    let (ingestor, sleeper) = ingestor(config(&server.uri()));
    let report = ingestor.ingest().await;

    assert_eq!(rows(&report), vec![json!({"sku": "A", "quantity": 3})]);
    assert_eq!(report.termination, Termination::CompletedData);
    assert_eq!(report.stats.pages_fetched, 2);
    assert_eq!(report.stats.records_dropped, 1);
    assert!(sleeper.delays().is_empty());

    let dropped: Vec<_> = report
        .diagnostics
        .of_kind(DiagnosticKind::SchemaViolation)
        .collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].page, Some(1));
    assert_eq!(dropped[0].record_index, Some(1));
    assert_eq!(dropped[0].missing_fields, vec!["quantity".to_string()]);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (ingestor, sleeper) = ingestor(config(&server.uri()));
    let report = ingestor.ingest().await;

    assert!(report.dataset.is_empty());
    assert!(report.is_fatal());
    assert!(matches!(
        report.termination,
        Termination::AbortedTransport(inventory_ingest::http::Halt::Unauthorized)
    ));
    assert!(sleeper.delays().is_empty());

    let last = report.diagnostics.last().unwrap();
    assert_eq!(last.kind, DiagnosticKind::Unauthorized);
    assert_eq!(last.status, Some(401));
    assert_eq!(last.page, Some(1));
}

#[tokio::test]
async fn test_rate_limited_page_waits_for_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, json!({"data": [{"sku": "C", "quantity": 7}]})).await;
    mount_page(&server, 2, json!({"data": []})).await;

    let (ingestor, sleeper) = ingestor(config(&server.uri()).max_retries(1));
    let report = ingestor.ingest().await;

    assert_eq!(rows(&report), vec![json!({"sku": "C", "quantity": 7})]);
    assert_eq!(report.termination, Termination::CompletedData);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn test_server_errors_exhaust_budget_and_keep_earlier_pages() {
    let server = MockServer::start().await;

    mount_page(&server, 1, json!({"data": [{"sku": "A", "quantity": 1}]})).await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (ingestor, sleeper) = ingestor(config(&server.uri()).max_retries(3));
    let report = ingestor.ingest().await;

    assert_eq!(rows(&report), vec![json!({"sku": "A", "quantity": 1})]);
    assert!(report.termination.is_aborted());
    assert!(!report.is_fatal());
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(
        report.diagnostics.last().unwrap().kind,
        DiagnosticKind::RetriesExhausted
    );
}

#[tokio::test]
async fn test_oversized_page_aborts_before_extraction() {
    let server = MockServer::start().await;

    let big: Vec<Value> = (0..200)
        .map(|i| json!({"sku": format!("SKU-{i:05}"), "quantity": i}))
        .collect();
    mount_page(&server, 1, json!({ "data": big })).await;

    let limits = Limits {
        max_payload_bytes: 1024,
        ..Limits::default()
    };
    let (ingestor, _) = ingestor(config(&server.uri()).limits(limits));
    let report = ingestor.ingest().await;

    assert!(report.dataset.is_empty());
    assert_eq!(report.termination, Termination::AbortedSizeLimit);
    assert_eq!(report.stats.pages_extracted, 0);
    assert_eq!(
        report.diagnostics.last().unwrap().kind,
        DiagnosticKind::PayloadTooLarge
    );
}

#[tokio::test]
async fn test_malformed_page_aborts_and_keeps_earlier_pages() {
    let server = MockServer::start().await;

    mount_page(&server, 1, json!({"data": [{"sku": "A", "quantity": 1}]})).await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\": [oops"))
        .mount(&server)
        .await;

    let (ingestor, _) = ingestor(config(&server.uri()));
    let report = ingestor.ingest().await;

    assert_eq!(report.dataset.len(), 1);
    assert_eq!(report.termination, Termination::AbortedMalformed);
    let last = report.diagnostics.last().unwrap();
    assert_eq!(last.kind, DiagnosticKind::MalformedBody);
    assert_eq!(last.severity, Severity::Error);
    assert_eq!(last.page, Some(2));
}

#[tokio::test]
async fn test_too_deep_page_aborts() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        json!({"data": [{"sku": "A", "quantity": 1, "meta": {"a": {"b": {"c": 1}}}}]}),
    )
    .await;

    let (ingestor, _) = ingestor(config(&server.uri()));
    let report = ingestor.ingest().await;

    assert!(report.dataset.is_empty());
    assert_eq!(report.termination, Termination::AbortedDepthLimit);
}

#[tokio::test]
async fn test_columns_follow_first_seen_order_and_export() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        json!({"data": [
            {"sku": "A", "quantity": 1},
            {"sku": "B", "quantity": 2, "warehouse": "north"}
        ]}),
    )
    .await;
    mount_page(&server, 2, json!({"data": [{"quantity": 5, "sku": "C", "bin": 4}]})).await;
    mount_page(&server, 3, json!({"data": []})).await;

    let (ingestor, _) = ingestor(config(&server.uri()));
    let report = ingestor.ingest().await;

    assert_eq!(
        report.dataset.columns(),
        &["sku", "quantity", "warehouse", "bin"]
    );
    assert_eq!(report.dataset.value(0, "warehouse"), Some(&Value::Null));
    assert_eq!(report.dataset.value(2, "bin"), Some(&json!(4)));

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("stock.parquet");
    assert_eq!(write_dataset(&report.dataset, &target).unwrap(), 3);

    let bytes = std::fs::read(&target).unwrap();
    let back = decode_parquet(bytes.into(), "stock.parquet").unwrap();
    assert_eq!(back.len(), 3);
    assert_eq!(back[2]["sku"], json!("C"));
    assert_eq!(back[0]["warehouse"], Value::Null);
}

// ============================================================================
// Config driven runs
// ============================================================================

#[tokio::test]
async fn test_custom_data_field_and_required_fields() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        json!({"items": [{"sku": "A", "quantity": 1, "price": 9.5}, {"sku": "B", "quantity": 2}]}),
    )
    .await;
    mount_page(&server, 2, json!({"items": []})).await;

    let (ingestor, _) = ingestor(
        config(&server.uri())
            .data_field("items")
            .required_fields(["sku", "price"]),
    );
    let report = ingestor.ingest().await;

    assert_eq!(
        rows(&report),
        vec![json!({"sku": "A", "quantity": 1, "price": 9.5})]
    );
    assert_eq!(report.termination, Termination::CompletedData);
}

#[tokio::test]
async fn test_config_driven_local_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("stock.jsonl"),
        "{\"sku\": \"A\", \"quantity\": 1}\n{\"sku\": \"B\", \"quantity\": 2}\n",
    )
    .unwrap();

    let yaml = format!(
        "source: local\nlocal:\n  path: {}\n  file_type: jsonl\n",
        dir.path().display()
    );
    let config = load_config_str(&yaml).unwrap();
    let report = inventory_ingest::from_config(&config, config.source)
        .unwrap()
        .ingest()
        .await;

    assert_eq!(report.source, "local");
    assert_eq!(report.dataset.len(), 2);
    assert_eq!(
        report
            .diagnostics
            .of_kind(DiagnosticKind::Completed)
            .count(),
        1
    );
}
