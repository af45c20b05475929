//! HTTP transport layer for the Telegram client.
//!
//! The dispatcher talks to the network only through [`HttpTransport`], so
//! tests can swap in [`crate::mocks::MockHttpTransport`].

use crate::encoding::{RequestBody, RequestConfig};
use crate::errors::{NetworkError, TelegramError, TelegramResult};
use crate::observability::redact_url;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::ACCEPT_ENCODING;
use http::{HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// HTTP transport trait
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a Bot API call and return the raw response
    async fn send(&self, request: HttpRequest) -> TelegramResult<HttpResponse>;

    /// GET a URL and return its body, failing on non-2xx statuses
    async fn download(&self, url: &str) -> TelegramResult<Bytes>;
}

/// Outgoing request: target URL plus the encoded configuration
#[derive(Debug)]
pub struct HttpRequest {
    /// Full URL including the token
    pub url: String,
    /// Method, headers and body
    pub config: RequestConfig,
}

impl HttpRequest {
    /// Create a new request
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }
}

/// Raw HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Returns true if the status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as lossy UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Default HTTP transport implementation using reqwest
pub struct ReqwestTransport {
    client: Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a new transport with the given timeout
    pub fn new(timeout: Duration) -> TelegramResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .gzip(true)
            .build()
            .map_err(|e| TelegramError::Network(NetworkError::Http(e.to_string())))?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Create a new transport with a pre-built client
    pub fn with_client(client: Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(
        skip(self, request),
        fields(url = %redact_url(&request.url), multipart = request.config.body.is_multipart())
    )]
    async fn send(&self, request: HttpRequest) -> TelegramResult<HttpResponse> {
        let RequestConfig {
            method,
            mut headers,
            compress,
            timeout,
            body,
        } = request.config;

        if !compress {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        }

        let builder = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .timeout(timeout.unwrap_or(self.default_timeout));

        let builder = match body {
            RequestBody::Json(json) => builder.body(json),
            RequestBody::Multipart(form) => builder.body(reqwest::Body::wrap_stream(form)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TelegramError::Network(NetworkError::from(e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TelegramError::Network(NetworkError::from(e)))?;

        debug!(status, body_len = body.len(), "Received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    #[instrument(skip(self), fields(url = %redact_url(url)))]
    async fn download(&self, url: &str) -> TelegramResult<Bytes> {
        let response = self
            .client
            .get(url)
            .timeout(self.default_timeout)
            .send()
            .await
            .map_err(|e| TelegramError::Network(NetworkError::from(e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Download failed with non-success status");
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: redact_url(url),
            }
            .into());
        }

        response
            .bytes()
            .await
            .map_err(|e| TelegramError::Network(NetworkError::from(e)))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_success_range() {
        let response = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{\"ok\":true}"),
        };
        assert!(response.is_success());
        assert_eq!(response.text(), "{\"ok\":true}");

        let response = HttpResponse {
            status: 429,
            ..response
        };
        assert!(!response.is_success());
    }

    #[test]
    fn test_transport_debug_hides_client() {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        assert_eq!(
            format!("{:?}", transport),
            "ReqwestTransport { default_timeout: 5s }"
        );
    }
}
