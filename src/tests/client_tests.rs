//! Dispatcher tests against the mock transport.

use crate::client::TelegramClient;
use crate::config::TelegramConfig;
use crate::encoding::{RequestConfig, RequestOptions};
use crate::errors::{ApiErrorKind, TelegramError};
use crate::mocks::{MockHttpTransport, MockResponse};
use crate::observability::{MetricsCollector, RequestObserver};
use crate::resilience::RetryConfig;
use crate::types::{ApiResponse, InputFile, Payload};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn on_request(&self, method: &str, config: &RequestConfig) {
        self.events.lock().push(format!(
            "request {} multipart={}",
            method,
            config.body.is_multipart()
        ));
    }

    fn on_response(&self, method: &str, envelope: &ApiResponse, _elapsed: Duration) {
        self.events
            .lock()
            .push(format!("response {} ok={}", method, envelope.ok));
    }

    fn on_rate_limited(
        &self,
        method: &str,
        retry_after: Duration,
        migrate_to_chat_id: Option<i64>,
    ) {
        self.events.lock().push(format!(
            "rate_limited {} {}s {:?}",
            method,
            retry_after.as_secs(),
            migrate_to_chat_id
        ));
    }
}

fn config(rate_limit: bool) -> TelegramConfig {
    TelegramConfig::builder()
        .token("123456:test-token")
        .unwrap()
        .rate_limit(rate_limit)
        .default_header("x-client", "tests")
        .build()
        .unwrap()
}

fn client_with(
    config: TelegramConfig,
    transport: Arc<MockHttpTransport>,
    observer: Arc<RecordingObserver>,
) -> TelegramClient {
    TelegramClient::builder(config)
        .transport(transport)
        .observer(observer)
        .tracing(false)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_cooldown_delays_same_method_only() {
    let transport = Arc::new(MockHttpTransport::new());
    let observer = Arc::new(RecordingObserver::default());
    let client = client_with(config(true), transport.clone(), observer.clone());

    transport.push_response(MockResponse::rate_limited(5));
    let err = client
        .request("sendMessage", Payload::new().field("chat_id", 1).field("text", "a"))
        .await
        .unwrap_err();

    let api = err.api_error().unwrap();
    assert_eq!(api.error_code, 429);
    assert_eq!(api.kind(), ApiErrorKind::TooManyRequests);
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert_eq!(client.cooldown_remaining("sendMessage"), Some(Duration::from_secs(5)));

    // A different method goes out immediately.
    tokio::time::advance(Duration::from_secs(1)).await;
    transport.push_response(MockResponse::ok(json!({"id": 1})));
    let start = Instant::now();
    client.request("getMe", Payload::new()).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);

    // The same method waits out the remaining four seconds.
    transport.push_response(MockResponse::ok(json!({"message_id": 2})));
    let start = Instant::now();
    client
        .request("sendMessage", Payload::new().field("chat_id", 1).field("text", "b"))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert_eq!(client.cooldown_remaining("sendMessage"), None);

    assert_eq!(transport.requests().len(), 3);
    assert_eq!(
        observer.events(),
        vec![
            "request sendMessage multipart=false",
            "response sendMessage ok=false",
            "rate_limited sendMessage 5s None",
            "request getMe multipart=false",
            "response getMe ok=true",
            "request sendMessage multipart=false",
            "response sendMessage ok=true",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_notified_even_when_cooldowns_disabled() {
    let transport = Arc::new(MockHttpTransport::new());
    let observer = Arc::new(RecordingObserver::default());
    let client = client_with(config(false), transport.clone(), observer.clone());

    transport.push_response(MockResponse::rate_limited(30));
    transport.push_response(MockResponse::ok(json!(true)));

    assert!(client.request("sendChatAction", Payload::new()).await.is_err());
    assert_eq!(client.cooldown_remaining("sendChatAction"), None);

    let start = Instant::now();
    client.request("sendChatAction", Payload::new()).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(observer
        .events()
        .contains(&"rate_limited sendChatAction 30s None".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_retry_after_is_reported_not_fatal() {
    let transport = Arc::new(MockHttpTransport::new());
    let observer = Arc::new(RecordingObserver::default());
    let client = client_with(config(true), transport.clone(), observer.clone());

    transport.push_response(MockResponse::rate_limited(u64::MAX));
    let err = client
        .request("sendMessage", Payload::new().field("chat_id", 1))
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(u64::MAX)));
    let left = client.cooldown_remaining("sendMessage").unwrap();
    assert!(left > Duration::from_secs(86_400 * 365));

    transport.push_response(MockResponse::ok(json!(true)));
    let start = Instant::now();
    client.request("getMe", Payload::new()).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_migrate_to_chat_id_is_exposed() {
    let transport = Arc::new(MockHttpTransport::new());
    let observer = Arc::new(RecordingObserver::default());
    let client = client_with(config(true), transport.clone(), observer.clone());

    transport.push_response(MockResponse::migrated(-1001234567890));
    let err = client
        .request("sendMessage", Payload::new().field("chat_id", -42))
        .await
        .unwrap_err();

    assert_eq!(err.migrate_to_chat_id(), Some(-1001234567890));
    assert_eq!(err.retry_after(), None);
    assert!(matches!(err, TelegramError::Api(_)));
    // No retry_after means no rate-limit notification.
    assert!(!observer.events().iter().any(|e| e.starts_with("rate_limited")));
}

#[tokio::test]
async fn test_multipart_request_reaches_transport() {
    let transport = Arc::new(MockHttpTransport::new());
    let observer = Arc::new(RecordingObserver::default());
    let client = client_with(config(false), transport.clone(), observer.clone());

    transport.push_response(MockResponse::ok(json!({"message_id": 9})));
    let payload = Payload::new()
        .field("chat_id", 1)
        .field("photo", InputFile::bytes(&b"png-bytes"[..]));
    let result = client.request("sendPhoto", payload).await.unwrap();
    assert_eq!(result["message_id"], 9);

    let recorded = transport.last_request().unwrap();
    assert!(recorded.multipart);
    assert_eq!(recorded.url, "https://api.telegram.org/bot123456:test-token/sendPhoto");
    assert_eq!(recorded.header("x-client"), Some("tests"));
    assert_eq!(recorded.header("connection"), Some("keep-alive"));

    let boundary = recorded.boundary().unwrap().to_string();
    let parts = super::parse_multipart(&recorded.body, &boundary);
    assert_eq!(super::part(&parts, "photo").body, b"png-bytes".to_vec());
    assert_eq!(observer.events()[0], "request sendPhoto multipart=true");
}

#[tokio::test]
async fn test_request_options_override_defaults() {
    let transport = Arc::new(MockHttpTransport::new());
    let client = client_with(
        config(false),
        transport.clone(),
        Arc::new(RecordingObserver::default()),
    );

    transport.push_response(MockResponse::ok(json!([])));
    let options = RequestOptions::new()
        .method(http::Method::GET)
        .header("x-client", "override")
        .unwrap()
        .timeout(Duration::from_secs(2));
    client
        .request_with_options("getUpdates", Payload::new().field("offset", 10), options)
        .await
        .unwrap();

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.header("x-client"), Some("override"));
    assert_eq!(recorded.json(), Some(json!({"offset": 10})));
}

#[tokio::test(start_paused = true)]
async fn test_json_requests_retry_when_enabled() {
    let transport = Arc::new(MockHttpTransport::new());
    let client = TelegramClient::builder(config(false))
        .transport(transport.clone())
        .tracing(false)
        .retry_config(RetryConfig::new().max_retries(2).with_jitter(false))
        .build()
        .unwrap();

    transport.push_response(MockResponse::error(502, "Bad Gateway"));
    transport.push_response(MockResponse::rate_limited(3));
    transport.push_response(MockResponse::ok(json!(true)));

    let start = Instant::now();
    let result = client.request("deleteMessage", Payload::new()).await.unwrap();

    assert_eq!(result, json!(true));
    assert_eq!(transport.requests().len(), 3);
    // 500ms backoff, then the server-mandated 3s.
    assert_eq!(start.elapsed(), Duration::from_millis(3500));
}

#[tokio::test]
async fn test_multipart_requests_are_sent_once() {
    let transport = Arc::new(MockHttpTransport::new());
    let client = TelegramClient::builder(config(false))
        .transport(transport.clone())
        .tracing(false)
        .retry_config(RetryConfig::new().max_retries(3))
        .build()
        .unwrap();

    transport.push_response(MockResponse::error(502, "Bad Gateway"));
    let payload = Payload::new().field("document", InputFile::bytes(&b"data"[..]));
    let err = client.request("sendDocument", payload).await.unwrap_err();

    assert_eq!(err.api_error().unwrap().kind(), ApiErrorKind::Server);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_metrics_collector_as_observer() {
    let transport = Arc::new(MockHttpTransport::new());
    let metrics = Arc::new(MetricsCollector::new());
    let client = TelegramClient::builder(config(false))
        .transport(transport.clone())
        .observer(metrics.clone())
        .build()
        .unwrap();

    transport.push_response(MockResponse::ok(json!(true)));
    transport.push_response(MockResponse::rate_limited(1));
    client.request("sendMessage", Payload::new()).await.unwrap();
    client.request("sendMessage", Payload::new()).await.unwrap_err();

    assert_eq!(metrics.request_count("sendMessage"), 2);
    assert_eq!(metrics.error_count("sendMessage"), 1);
    assert_eq!(metrics.rate_limit_hits(), 1);
}

#[tokio::test]
async fn test_download_file_uses_file_endpoint() {
    let transport = Arc::new(MockHttpTransport::new());
    let client = client_with(
        config(false),
        transport.clone(),
        Arc::new(RecordingObserver::default()),
    );

    transport.push_download(&b"voice-data"[..]);
    let bytes = client.download_file("voice/file_3.oga").await.unwrap();

    assert_eq!(&bytes[..], b"voice-data");
    assert_eq!(
        transport.download_urls(),
        vec!["https://api.telegram.org/file/bot123456:test-token/voice/file_3.oga"]
    );
}
