//! Telegram client implementation.
//!
//! [`TelegramClient`] owns the bot token and the per-method cooldown state,
//! delegates payload encoding to [`MediaData`] and turns the Bot API
//! envelope into either the `result` value or an [`ApiError`].

use crate::config::TelegramConfig;
use crate::encoding::{MediaData, RequestConfig, RequestOptions};
use crate::errors::{
    ApiError, RequestError, RequestSnapshot, ResponseError, ResponseSnapshot, TelegramResult,
};
use crate::observability::{redact_url, Observers, RequestObserver, TracingObserver};
use crate::resilience::{CooldownTracker, RetryConfig};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{ApiResponse, Payload};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Bot API client bound to one token
pub struct TelegramClient {
    config: Arc<TelegramConfig>,
    transport: Arc<dyn HttpTransport>,
    encoder: MediaData,
    cooldowns: CooldownTracker,
    observers: Observers,
    retry: RetryConfig,
}

impl TelegramClient {
    /// Create a client over the default reqwest transport
    pub fn new(config: TelegramConfig) -> TelegramResult<Self> {
        Self::builder(config).build()
    }

    /// Create a client builder
    pub fn builder(config: TelegramConfig) -> TelegramClientBuilder {
        TelegramClientBuilder::new(config)
    }

    /// Get the configuration
    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Call a Bot API method and return its `result`
    pub async fn request(&self, method: &str, payload: Payload) -> TelegramResult<Value> {
        self.request_with_options(method, payload, RequestOptions::default())
            .await
    }

    /// Call a Bot API method and deserialize its `result`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Payload,
    ) -> TelegramResult<T> {
        let value = self.request(method, payload).await?;
        serde_json::from_value(value).map_err(|e| ResponseError::from(e).into())
    }

    /// Call a Bot API method with per-request HTTP overrides
    #[instrument(skip_all, fields(method = %method))]
    pub async fn request_with_options(
        &self,
        method: &str,
        payload: Payload,
        options: RequestOptions,
    ) -> TelegramResult<Value> {
        payload.validate_field_names()?;

        if self.config.rate_limit {
            self.cooldowns.wait(method).await;
        }

        let options = self.effective_options(options);
        let config = self.encoder.build_config(payload, &options).await?;

        if !self.retry.enabled() || !config.is_replayable() {
            return self.dispatch(method, config).await;
        }
        self.dispatch_replaying(method, &config).await
    }

    /// Fetch a file previously located with `getFile`
    pub async fn download_file(&self, file_path: &str) -> TelegramResult<Bytes> {
        self.transport
            .download(&self.config.file_url(file_path))
            .await
    }

    /// Time left before `method` may be sent again
    pub fn cooldown_remaining(&self, method: &str) -> Option<Duration> {
        self.cooldowns.remaining(method)
    }

    fn effective_options(&self, mut options: RequestOptions) -> RequestOptions {
        for (name, value) in &self.config.default_headers {
            if !options.headers.contains_key(name) {
                options.headers.insert(name.clone(), value.clone());
            }
        }
        options.compress.get_or_insert(self.config.compress);
        options
    }

    /// Resend clones of `template` until it succeeds or the backoff gives up
    async fn dispatch_replaying(
        &self,
        method: &str,
        template: &RequestConfig,
    ) -> TelegramResult<Value> {
        let mut attempt = 0;
        loop {
            let config = template.try_clone().ok_or(RequestError::NotReplayable)?;
            let error = match self.dispatch(method, config).await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            attempt += 1;
            let Some(delay) = self.retry.next_delay(&error, attempt) else {
                return Err(error);
            };
            debug!(
                method,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Replaying request"
            );
            tokio::time::sleep(delay).await;
            if self.config.rate_limit {
                self.cooldowns.wait(method).await;
            }
        }
    }

    async fn dispatch(&self, method: &str, config: RequestConfig) -> TelegramResult<Value> {
        self.observers.request(method, &config);

        let url = self.config.method_url(method);
        let snapshot = RequestSnapshot {
            http_method: config.method.clone(),
            url: redact_url(&url),
            headers: config.headers.clone(),
            multipart: config.body.is_multipart(),
        };

        let started = Instant::now();
        let response = self.transport.send(HttpRequest::new(url, config)).await?;

        let envelope: ApiResponse = serde_json::from_slice(&response.body).map_err(|e| {
            ResponseError::InvalidEnvelope {
                status: response.status,
                message: e.to_string(),
            }
        })?;
        self.observers.response(method, &envelope, started.elapsed());

        if envelope.ok {
            return envelope.result.ok_or_else(|| ResponseError::MissingResult.into());
        }

        if let Some(secs) = envelope.retry_after() {
            let retry_after = Duration::from_secs(secs);
            if self.config.rate_limit {
                self.cooldowns.record(method, retry_after);
            }
            let migrate_to_chat_id = envelope
                .parameters
                .as_ref()
                .and_then(|p| p.migrate_to_chat_id);
            self.observers
                .rate_limited(method, retry_after, migrate_to_chat_id);
        }

        Err(api_error(method, envelope, snapshot, response).into())
    }
}

fn api_error(
    method: &str,
    envelope: ApiResponse,
    request: RequestSnapshot,
    response: HttpResponse,
) -> ApiError {
    ApiError {
        method: method.to_string(),
        error_code: envelope
            .error_code
            .unwrap_or_else(|| i64::from(response.status)),
        description: envelope.description.unwrap_or_default(),
        parameters: envelope.parameters,
        request,
        response: ResponseSnapshot {
            status: response.status,
            body: response.text(),
            headers: response.headers,
        },
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("config", &self.config)
            .field("observers", &self.observers)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Builder for TelegramClient
pub struct TelegramClientBuilder {
    config: TelegramConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    observers: Vec<Arc<dyn RequestObserver>>,
    tracing: bool,
    retry: Option<RetryConfig>,
}

impl TelegramClientBuilder {
    /// Create a new builder
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            transport: None,
            observers: Vec::new(),
            tracing: true,
            retry: None,
        }
    }

    /// Use a custom transport
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register an observer; observers run in registration order
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Enable or disable the built-in [`TracingObserver`]
    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    /// Override the retry configuration
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the client
    pub fn build(self) -> TelegramResult<TelegramClient> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.timeout)?),
        };

        let mut observers = Observers::default();
        if self.tracing {
            observers.push(Arc::new(TracingObserver));
        }
        for observer in self.observers {
            observers.push(observer);
        }

        let retry = self
            .retry
            .unwrap_or_else(|| RetryConfig::default().max_retries(self.config.max_retries));

        Ok(TelegramClient {
            config: Arc::new(self.config),
            encoder: MediaData::new(transport.clone()),
            transport,
            cooldowns: CooldownTracker::new(),
            observers,
            retry,
        })
    }
}
