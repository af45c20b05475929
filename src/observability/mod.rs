//! Observability for the dispatcher.
//!
//! The dispatcher does not log on its own; it reports to the
//! [`RequestObserver`]s it was built with. [`TracingObserver`] turns the
//! hooks into `tracing` events and [`MetricsCollector`] counts them.

mod logging;
mod metrics;

pub use logging::{redact_token, redact_url};
pub use metrics::{
    LatencyHistogram, LatencyStats, MethodMetrics, MetricsCollector, MetricsSnapshot,
};

use crate::encoding::RequestConfig;
use crate::types::ApiResponse;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hooks invoked around every Bot API call.
///
/// Implementations run inline on the request path and must return quickly.
pub trait RequestObserver: Send + Sync {
    /// The request is encoded and about to be sent
    fn on_request(&self, _method: &str, _config: &RequestConfig) {}

    /// An envelope was received and parsed
    fn on_response(&self, _method: &str, _envelope: &ApiResponse, _elapsed: Duration) {}

    /// The server answered with `retry_after`
    fn on_rate_limited(
        &self,
        _method: &str,
        _retry_after: Duration,
        _migrate_to_chat_id: Option<i64>,
    ) {
    }
}

/// Emits `tracing` events for each hook
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, method: &str, config: &RequestConfig) {
        debug!(
            method,
            http_method = %config.method,
            multipart = config.body.is_multipart(),
            "Sending Bot API request"
        );
    }

    fn on_response(&self, method: &str, envelope: &ApiResponse, elapsed: Duration) {
        if envelope.ok {
            debug!(method, elapsed_ms = elapsed.as_millis() as u64, "Bot API call succeeded");
        } else {
            warn!(
                method,
                error_code = envelope.error_code,
                description = envelope.description.as_deref().unwrap_or_default(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Bot API call failed"
            );
        }
    }

    fn on_rate_limited(
        &self,
        method: &str,
        retry_after: Duration,
        migrate_to_chat_id: Option<i64>,
    ) {
        warn!(
            method,
            retry_after_secs = retry_after.as_secs(),
            migrate_to_chat_id,
            "Bot API rate limit hit"
        );
    }
}

/// Ordered set of observers
#[derive(Clone, Default)]
pub(crate) struct Observers(Vec<Arc<dyn RequestObserver>>);

impl Observers {
    pub(crate) fn push(&mut self, observer: Arc<dyn RequestObserver>) {
        self.0.push(observer);
    }

    pub(crate) fn request(&self, method: &str, config: &RequestConfig) {
        for observer in &self.0 {
            observer.on_request(method, config);
        }
    }

    pub(crate) fn response(&self, method: &str, envelope: &ApiResponse, elapsed: Duration) {
        for observer in &self.0 {
            observer.on_response(method, envelope, elapsed);
        }
    }

    pub(crate) fn rate_limited(
        &self,
        method: &str,
        retry_after: Duration,
        migrate_to_chat_id: Option<i64>,
    ) {
        for observer in &self.0 {
            observer.on_rate_limited(method, retry_after, migrate_to_chat_id);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Observers({})", self.0.len())
    }
}
