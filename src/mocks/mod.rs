//! Mock implementations for testing.
//!
//! [`MockHttpTransport`] replays queued [`MockResponse`]s and records every
//! request it sees, draining multipart bodies so tests can inspect them.

use crate::encoding::RequestBody;
use crate::errors::{NetworkError, TelegramError, TelegramResult};
use crate::observability::redact_url;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Transport-level failure to simulate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// The request timed out
    Timeout,
    /// The connection could not be established
    ConnectionFailed(String),
}

impl MockFailure {
    fn into_error(self) -> TelegramError {
        match self {
            Self::Timeout => NetworkError::Timeout.into(),
            Self::ConnectionFailed(message) => NetworkError::ConnectionFailed { message }.into(),
        }
    }
}

/// Mock response configuration
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Delay before responding
    pub delay: Option<Duration>,
    /// Failure to return instead of a response
    pub failure: Option<MockFailure>,
}

impl MockResponse {
    /// Response with an arbitrary status and body
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            delay: None,
            failure: None,
        }
    }

    /// Response with an arbitrary JSON body
    pub fn json(status: u16, body: &Value) -> Self {
        Self::text(status, body.to_string())
    }

    /// Successful envelope wrapping `result`
    pub fn ok(result: Value) -> Self {
        Self::json(200, &json!({ "ok": true, "result": result }))
    }

    /// Failed envelope; the HTTP status mirrors `error_code`
    pub fn error(error_code: u16, description: &str) -> Self {
        Self::json(
            error_code,
            &json!({ "ok": false, "error_code": error_code, "description": description }),
        )
    }

    /// 429 envelope carrying `retry_after`
    pub fn rate_limited(retry_after: u64) -> Self {
        Self::json(
            429,
            &json!({
                "ok": false,
                "error_code": 429,
                "description": format!("Too Many Requests: retry after {}", retry_after),
                "parameters": { "retry_after": retry_after }
            }),
        )
    }

    /// 400 envelope reporting a group upgraded to a supergroup
    pub fn migrated(migrate_to_chat_id: i64) -> Self {
        Self::json(
            400,
            &json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: group chat was upgraded to a supergroup chat",
                "parameters": { "migrate_to_chat_id": migrate_to_chat_id }
            }),
        )
    }

    /// Simulated timeout
    pub fn timeout() -> Self {
        Self::text(0, "").with_failure(MockFailure::Timeout)
    }

    /// Simulated connection failure
    pub fn connection_failed(message: &str) -> Self {
        Self::text(0, "").with_failure(MockFailure::ConnectionFailed(message.to_string()))
    }

    /// Add delay to response
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// Add a response header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }
        headers
    }
}

/// Recorded request for verification
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Whether the body was multipart
    pub multipart: bool,
    /// Full body, multipart bodies drained from their stream
    pub body: Bytes,
}

impl RecordedRequest {
    /// Body as lossy UTF-8
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, for JSON requests
    pub fn json(&self) -> Option<Value> {
        if self.multipart {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// First header with the given (lowercase) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Multipart boundary from the content-type header
    pub fn boundary(&self) -> Option<&str> {
        self.header("content-type")?
            .split_once("boundary=")
            .map(|(_, boundary)| boundary)
    }
}

/// Canned result of a download
#[derive(Debug, Clone)]
enum MockDownload {
    Body(Bytes),
    Status(u16),
}

/// Mock HTTP transport for testing
#[derive(Debug, Default)]
pub struct MockHttpTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    downloads: Arc<Mutex<VecDeque<MockDownload>>>,
    download_urls: Arc<Mutex<Vec<String>>>,
    default_response: Option<MockResponse>,
}

impl MockHttpTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to the queue
    pub fn with_response(self, response: MockResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Add a response to the queue through a shared handle
    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Set default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Queue the body of the next download
    pub fn push_download(&self, body: impl Into<Bytes>) {
        self.downloads.lock().push_back(MockDownload::Body(body.into()));
    }

    /// Queue a failed download
    pub fn push_download_status(&self, status: u16) {
        self.downloads.lock().push_back(MockDownload::Status(status));
    }

    /// Get recorded requests
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Get the last recorded request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// URLs passed to `download`, in call order
    pub fn download_urls(&self) -> Vec<String> {
        self.download_urls.lock().clone()
    }

    /// Get remaining response count
    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().len()
    }

    /// Clear recorded requests
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn next_response(&self) -> Option<MockResponse> {
        let mut queue = self.responses.lock();
        queue.pop_front().or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> TelegramResult<HttpResponse> {
        let HttpRequest { url, config } = request;
        let headers = config
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let (multipart, body) = match config.body {
            RequestBody::Json(json) => (false, Bytes::from(json)),
            RequestBody::Multipart(form) => (true, form.into_bytes().await?),
        };

        self.requests.lock().push(RecordedRequest {
            url,
            method: config.method.to_string(),
            headers,
            multipart,
            body,
        });

        let response = self.next_response().ok_or_else(|| {
            TelegramError::from(NetworkError::ConnectionFailed {
                message: "no mock response queued".to_string(),
            })
        })?;

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = response.failure.clone() {
            return Err(failure.into_error());
        }

        Ok(HttpResponse {
            status: response.status,
            headers: response.header_map(),
            body: Bytes::from(response.body),
        })
    }

    async fn download(&self, url: &str) -> TelegramResult<Bytes> {
        self.download_urls.lock().push(url.to_string());

        let next = self.downloads.lock().pop_front();
        match next {
            Some(MockDownload::Body(body)) => Ok(body),
            Some(MockDownload::Status(status)) => Err(NetworkError::Status {
                status,
                url: redact_url(url),
            }
            .into()),
            None => Err(NetworkError::ConnectionFailed {
                message: format!("no mock download queued for {}", redact_url(url)),
            }
            .into()),
        }
    }
}
