//! Encoded request configuration handed to the transport.

use crate::errors::{RequestError, TelegramResult};
use crate::multipart::MultipartStream;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use std::time::Duration;

/// Encoded request body
#[derive(Debug)]
pub enum RequestBody {
    /// `application/json` body
    Json(String),
    /// `multipart/form-data` body, streamed once
    Multipart(MultipartStream),
}

impl RequestBody {
    /// Whether this is a multipart body
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    /// The JSON text, if this is a JSON body
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Self::Json(json) => Some(json),
            Self::Multipart(_) => None,
        }
    }
}

/// Everything the transport needs besides the URL
#[derive(Debug)]
pub struct RequestConfig {
    /// HTTP method, POST unless overridden
    pub method: Method,
    /// Request headers
    pub headers: HeaderMap,
    /// Accept compressed responses
    pub compress: bool,
    /// Per-request timeout override
    pub timeout: Option<Duration>,
    /// Encoded body
    pub body: RequestBody,
}

impl RequestConfig {
    /// Copy the config if its body can be sent again
    pub fn try_clone(&self) -> Option<Self> {
        match &self.body {
            RequestBody::Json(json) => Some(Self {
                method: self.method.clone(),
                headers: self.headers.clone(),
                compress: self.compress,
                timeout: self.timeout,
                body: RequestBody::Json(json.clone()),
            }),
            RequestBody::Multipart(_) => None,
        }
    }

    /// Whether a retry can resend this request
    pub fn is_replayable(&self) -> bool {
        !self.body.is_multipart()
    }
}

/// Caller overrides applied on top of the encoder defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method override
    pub method: Option<Method>,
    /// Extra or replacement headers
    pub headers: HeaderMap,
    /// Compression override
    pub compress: Option<bool>,
    /// Timeout override
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Create empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set a header, replacing the encoder default of the same name
    pub fn header(mut self, name: &str, value: &str) -> TelegramResult<Self> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| RequestError::InvalidHeader {
                message: e.to_string(),
            })?;
        let value = HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
            message: e.to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Enable or disable compressed responses
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Bound the whole round trip
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge these options over a set of default headers into a config
    pub(crate) fn apply(&self, mut headers: HeaderMap, body: RequestBody) -> RequestConfig {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        RequestConfig {
            method: self.method.clone().unwrap_or(Method::POST),
            headers,
            compress: self.compress.unwrap_or(true),
            timeout: self.timeout,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn test_defaults_and_overrides() {
        let mut defaults = HeaderMap::new();
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let config = RequestOptions::new().apply(defaults.clone(), RequestBody::Json("{}".into()));
        assert_eq!(config.method, Method::POST);
        assert!(config.compress);
        assert_eq!(config.headers[CONTENT_TYPE], "application/json");

        let config = RequestOptions::new()
            .method(Method::GET)
            .compress(false)
            .header("content-type", "application/json; charset=utf-8")
            .unwrap()
            .apply(defaults, RequestBody::Json("{}".into()));
        assert_eq!(config.method, Method::GET);
        assert!(!config.compress);
        assert_eq!(config.headers[CONTENT_TYPE], "application/json; charset=utf-8");
    }

    #[test]
    fn test_only_json_is_replayable() {
        let json = RequestOptions::new().apply(HeaderMap::new(), RequestBody::Json("{}".into()));
        assert!(json.is_replayable());
        assert_eq!(json.try_clone().unwrap().body.as_json(), Some("{}"));

        let form = RequestOptions::new().apply(
            HeaderMap::new(),
            RequestBody::Multipart(MultipartStream::new("b")),
        );
        assert!(!form.is_replayable());
        assert!(form.try_clone().is_none());
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        assert!(RequestOptions::new().header("bad header", "x").is_err());
    }
}
