//! Tests for the HTTP transport module

use super::client::parse_retry_after;
use super::*;
use crate::config::{FetchConfig, FetchConfigBuilder, Limits};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(uri: &str) -> FetchConfigBuilder {
    FetchConfig::builder()
        .base_url(uri)
        .endpoint("/v1/inventory")
        .token("test-token")
        .page_size(50)
        .allow_insecure_loopback()
}

fn transport(config: FetchConfigBuilder) -> (HttpTransport, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let transport = HttpTransport::new(config.build().unwrap())
        .unwrap()
        .with_sleeper(Arc::new(sleeper.clone()));
    (transport, sleeper)
}

#[test_case(200, StatusClass::Success ; "ok")]
#[test_case(204, StatusClass::Success ; "no content")]
#[test_case(400, StatusClass::ClientError ; "bad request")]
#[test_case(401, StatusClass::Unauthorized ; "unauthorized")]
#[test_case(403, StatusClass::ClientError ; "forbidden")]
#[test_case(404, StatusClass::ClientError ; "not found")]
#[test_case(429, StatusClass::RateLimited ; "too many requests")]
#[test_case(500, StatusClass::ServerError ; "internal error")]
#[test_case(503, StatusClass::ServerError ; "unavailable")]
fn test_classify_status(status: u16, expected: StatusClass) {
    assert_eq!(classify_status(status), expected);
}

#[test]
fn test_page_request_next() {
    let first = PageRequest::first(25);
    assert_eq!(first, PageRequest::new(1, 25));
    assert_eq!(first.next(), PageRequest::new(2, 25));
}

#[test]
fn test_halt_status_and_kind() {
    assert_eq!(Halt::Unauthorized.status(), Some(401));
    assert!(Halt::Unauthorized.is_fatal());
    assert_eq!(Halt::ClientError { status: 404 }.status(), Some(404));
    assert!(!Halt::ClientError { status: 404 }.is_fatal());

    let exhausted = Halt::RetriesExhausted {
        attempts: 3,
        last: FailureCause::Network {
            message: "timed out".to_string(),
        },
    };
    assert_eq!(exhausted.status(), None);
    assert_eq!(
        exhausted.to_string(),
        "retries exhausted after 3 attempts, last failure: network error: timed out"
    );
}

#[test]
fn test_calculate_backoff_doubles_and_caps() {
    let (transport, _) = transport(mock_config("http://127.0.0.1:9"));

    assert_eq!(transport.calculate_backoff(0), Duration::from_secs(1));
    assert_eq!(transport.calculate_backoff(1), Duration::from_secs(2));
    assert_eq!(transport.calculate_backoff(2), Duration::from_secs(4));
    assert_eq!(transport.calculate_backoff(4), Duration::from_secs(16));
    assert_eq!(transport.calculate_backoff(5), Duration::from_secs(30));
    assert_eq!(transport.calculate_backoff(40), Duration::from_secs(30));
}

#[test]
fn test_calculate_backoff_custom_unit() {
    let (transport, _) = transport(
        mock_config("http://127.0.0.1:9").backoff(Duration::from_millis(10), 5),
    );

    assert_eq!(transport.calculate_backoff(0), Duration::from_millis(10));
    assert_eq!(transport.calculate_backoff(2), Duration::from_millis(40));
    assert_eq!(transport.calculate_backoff(3), Duration::from_millis(50));
}

#[test]
fn test_parse_retry_after() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let mut headers = HeaderMap::new();
    assert_eq!(parse_retry_after(&headers, now), None);

    headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
    assert_eq!(parse_retry_after(&headers, now), Some(Duration::from_secs(2)));

    headers.insert(
        RETRY_AFTER,
        HeaderValue::from_static("Fri, 01 Mar 2024 12:00:05 GMT"),
    );
    assert_eq!(parse_retry_after(&headers, now), Some(Duration::from_secs(5)));

    // A date in the past means retry now
    headers.insert(
        RETRY_AFTER,
        HeaderValue::from_static("Fri, 01 Mar 2024 11:00:00 GMT"),
    );
    assert_eq!(parse_retry_after(&headers, now), Some(Duration::ZERO));

    headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
    assert_eq!(parse_retry_after(&headers, now), None);
}

#[tokio::test]
async fn test_fetch_page_sends_auth_headers_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/inventory"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Accept", "application/json"))
        .and(query_param("page", "3"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()));
    let raw = transport
        .fetch_page(PageRequest::new(3, 50))
        .await
        .unwrap();

    assert_eq!(raw.status, 200);
    assert_eq!(raw.body.as_ref(), br#"{"data":[]}"#);
    assert_eq!(raw.byte_len, 11);
    assert!(!raw.truncated);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_fetch_page_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("User-Agent", "stock-sync/2.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (transport, _) = transport(mock_config(&mock_server.uri()).user_agent("stock-sync/2.0"));
    assert!(transport.fetch_page(PageRequest::first(50)).await.is_ok());
}

#[tokio::test]
async fn test_fetch_page_unauthorized_halts_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()).max_retries(5));
    let result = transport.fetch_page(PageRequest::first(50)).await;

    assert_eq!(result.unwrap_err(), Halt::Unauthorized);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_fetch_page_client_error_halts_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()));
    let result = transport.fetch_page(PageRequest::first(50)).await;

    assert_eq!(result.unwrap_err(), Halt::ClientError { status: 404 });
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_fetch_page_retries_server_errors_with_backoff() {
    let mock_server = MockServer::start().await;

    // First two calls return 500, third succeeds
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()).max_retries(3));
    let raw = transport.fetch_page(PageRequest::first(50)).await.unwrap();

    assert_eq!(raw.status, 200);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_fetch_page_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Server error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()).max_retries(3));
    let result = transport.fetch_page(PageRequest::first(50)).await;

    assert_eq!(
        result.unwrap_err(),
        Halt::RetriesExhausted {
            attempts: 3,
            last: FailureCause::ServerError { status: 503 },
        }
    );
    // No wait after the final attempt
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_fetch_page_rate_limit_does_not_consume_budget() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(4)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    // A single attempt is allowed, yet four 429s are absorbed
    let (transport, sleeper) = transport(mock_config(&mock_server.uri()).max_retries(1));
    let raw = transport.fetch_page(PageRequest::first(50)).await.unwrap();

    assert_eq!(raw.status, 200);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(1); 4]);
}

#[tokio::test]
async fn test_fetch_page_rate_limit_wait_is_clamped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("retry-after", "18446744073709551615"),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(
        mock_config(&mock_server.uri()).max_retry_after(Duration::from_secs(10)),
    );
    assert!(transport.fetch_page(PageRequest::first(50)).await.is_ok());
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(10)]);
}

#[tokio::test]
async fn test_fetch_page_rate_limit_without_header_uses_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(mock_config(&mock_server.uri()));
    assert!(transport.fetch_page(PageRequest::first(50)).await.is_ok());
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_fetch_page_timeout_is_retried_then_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let (transport, sleeper) = transport(
        mock_config(&mock_server.uri())
            .timeout(Duration::from_millis(50))
            .max_retries(2),
    );
    let result = transport.fetch_page(PageRequest::first(50)).await;

    assert!(matches!(
        result,
        Err(Halt::RetriesExhausted {
            attempts: 2,
            last: FailureCause::Network { .. }
        })
    ));
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_fetch_page_connection_refused_is_network_failure() {
    // Port 9 (discard) is not listening on test machines
    let (transport, sleeper) = transport(mock_config("http://127.0.0.1:9").max_retries(3));
    let result = transport.fetch_page(PageRequest::first(50)).await;

    assert!(matches!(
        result,
        Err(Halt::RetriesExhausted {
            attempts: 3,
            last: FailureCause::Network { .. }
        })
    ));
    assert_eq!(sleeper.delays().len(), 2);
}

#[tokio::test]
async fn test_fetch_page_stops_reading_oversized_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&mock_server)
        .await;

    let (transport, _) = transport(mock_config(&mock_server.uri()).limits(Limits {
        max_payload_bytes: 16,
        ..Limits::default()
    }));
    let raw = transport.fetch_page(PageRequest::first(50)).await.unwrap();

    assert!(raw.truncated);
    assert!(raw.byte_len > 16);
    assert!(raw.byte_len <= 4096);
}

#[tokio::test]
async fn test_fetch_page_with_pacing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (transport, _) = transport(mock_config(&mock_server.uri()).requests_per_second(1000));
    for page in 1..=3 {
        assert!(transport.fetch_page(PageRequest::new(page, 50)).await.is_ok());
    }
}

#[test]
fn test_transport_debug_hides_token() {
    let (transport, _) = transport(mock_config("http://127.0.0.1:9").token("hunter2"));
    let debug = format!("{transport:?}");
    assert!(debug.contains("HttpTransport"));
    assert!(!debug.contains("hunter2"));
}
