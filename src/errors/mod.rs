//! Error types for the Telegram client.
//!
//! Separates transport failures from API-level failures so callers can
//! always tell a dropped connection apart from an `ok: false` envelope.

use crate::types::ResponseParameters;
use http::HeaderMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for Telegram operations
pub type TelegramResult<T> = Result<T, TelegramError>;

/// Root error type for the Telegram client
#[derive(Error, Debug)]
pub enum TelegramError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Request could not be encoded
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response envelope could not be interpreted
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// The Bot API answered with `ok: false`
    #[error("API error: {0}")]
    Api(#[from] Box<ApiError>),

    /// Local media could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "TELEGRAM_CONFIG",
            Self::Request(_) => "TELEGRAM_REQUEST",
            Self::Network(_) => "TELEGRAM_NETWORK",
            Self::Response(_) => "TELEGRAM_RESPONSE",
            Self::Api(_) => "TELEGRAM_API",
            Self::Io(_) => "TELEGRAM_IO",
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(NetworkError::Timeout)
            | Self::Network(NetworkError::ConnectionFailed { .. }) => true,
            Self::Api(api) => matches!(
                api.kind(),
                ApiErrorKind::TooManyRequests | ApiErrorKind::Server
            ),
            _ => false,
        }
    }

    /// Get retry-after duration if the server sent one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api(api) => api.retry_after(),
            _ => None,
        }
    }

    /// Get the supergroup id a group chat migrated to, if reported
    pub fn migrate_to_chat_id(&self) -> Option<i64> {
        match self {
            Self::Api(api) => api.migrate_to_chat_id(),
            _ => None,
        }
    }

    /// Borrow the API error if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }
}

impl From<ApiError> for TelegramError {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Missing token
    #[error("Bot token is missing")]
    MissingToken,

    /// Invalid token format
    #[error("Invalid token format: {0}")]
    InvalidToken(String),

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

/// Errors raised while turning a payload into an HTTP request
#[derive(Error, Debug)]
pub enum RequestError {
    /// Field name is not in wire format
    #[error("Field name '{name}' is not a snake_case wire name")]
    InvalidFieldName {
        /// Offending field name
        name: String,
    },

    /// Payload could not be serialized
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Payload root must be an object
    #[error("Payload must be a JSON object")]
    NotAnObject,

    /// Explicit media value could not be turned into bytes
    #[error("Media for field '{field}' could not be resolved: {reason}")]
    UnresolvableMedia {
        /// Field or attachment id
        field: String,
        /// Why it failed
        reason: String,
    },

    /// Body was consumed by a previous attempt
    #[error("Request body is single-use and cannot be replayed")]
    NotReplayable,

    /// Invalid header name or value in request options
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Connection failed
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message
        message: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Non-success status on a plain download
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// HTTP status
        status: u16,
        /// Requested URL (redacted)
        url: String,
    },

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_connect() {
            NetworkError::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            NetworkError::Http(err.to_string())
        }
    }
}

/// Response parsing errors
#[derive(Error, Debug)]
pub enum ResponseError {
    /// Body was not a Bot API envelope
    #[error("Invalid envelope (HTTP {status}): {message}")]
    InvalidEnvelope {
        /// HTTP status
        status: u16,
        /// Parser message
        message: String,
    },

    /// `ok: true` without a `result`
    #[error("Envelope reported success but carried no result")]
    MissingResult,

    /// `result` did not match the requested type
    #[error("Deserialization error: {message}")]
    DeserializationError {
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for ResponseError {
    fn from(err: serde_json::Error) -> Self {
        ResponseError::DeserializationError {
            message: err.to_string(),
        }
    }
}

/// Category of an API failure, derived from `error_code`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409, e.g. a competing getUpdates consumer
    Conflict,
    /// 429
    TooManyRequests,
    /// 5xx
    Server,
    /// Anything else
    Other,
}

impl ApiErrorKind {
    /// Classify a numeric Bot API error code
    pub fn from_code(code: i64) -> Self {
        match code {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::TooManyRequests,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

/// What was sent, kept for diagnostics
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    /// HTTP method
    pub http_method: http::Method,
    /// Target URL with the token masked
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Whether the body was multipart
    pub multipart: bool,
}

/// What came back, kept for diagnostics
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: String,
}

/// Structured `ok: false` envelope
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Bot API method that failed
    pub method: String,
    /// `error_code` from the envelope
    pub error_code: i64,
    /// `description` from the envelope
    pub description: String,
    /// `parameters` from the envelope
    pub parameters: Option<ResponseParameters>,
    /// The outgoing request
    pub request: RequestSnapshot,
    /// The raw response
    pub response: ResponseSnapshot,
}

impl ApiError {
    /// Category of this failure
    pub fn kind(&self) -> ApiErrorKind {
        ApiErrorKind::from_code(self.error_code)
    }

    /// Server-requested wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        self.parameters
            .as_ref()
            .and_then(|p| p.retry_after)
            .map(Duration::from_secs)
    }

    /// New chat id after a group was upgraded to a supergroup
    pub fn migrate_to_chat_id(&self) -> Option<i64> {
        self.parameters.as_ref().and_then(|p| p.migrate_to_chat_id)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed with {}: {}",
            self.method, self.error_code, self.description
        )?;
        if let Some(retry_after) = self.parameters.as_ref().and_then(|p| p.retry_after) {
            write!(f, " (retry after {}s)", retry_after)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
