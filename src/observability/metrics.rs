//! Per-method counters fed by the dispatcher hooks.

use super::RequestObserver;
use crate::encoding::RequestConfig;
use crate::types::ApiResponse;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector for Bot API calls
#[derive(Debug, Default)]
pub struct MetricsCollector {
    methods: RwLock<HashMap<String, Arc<MethodCounters>>>,
    rate_limit_hits: AtomicU64,
    multipart_requests: AtomicU64,
}

#[derive(Debug, Default)]
struct MethodCounters {
    requests: AtomicU64,
    errors: AtomicU64,
    rate_limited: AtomicU64,
    latency: LatencyHistogram,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, method: &str) -> Arc<MethodCounters> {
        if let Some(counters) = self.methods.read().get(method) {
            return counters.clone();
        }
        self.methods
            .write()
            .entry(method.to_string())
            .or_default()
            .clone()
    }

    /// Count an outgoing request
    pub fn record_request(&self, method: &str, multipart: bool) {
        self.counters(method).requests.fetch_add(1, Ordering::Relaxed);
        if multipart {
            self.multipart_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a parsed envelope
    pub fn record_response(&self, method: &str, ok: bool, elapsed: Duration) {
        let counters = self.counters(method);
        counters.latency.record(elapsed.as_millis() as u64);
        if !ok {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a `retry_after` answer
    pub fn record_rate_limit(&self, method: &str) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        self.counters(method)
            .rate_limited
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Requests sent for a method
    pub fn request_count(&self, method: &str) -> u64 {
        self.methods
            .read()
            .get(method)
            .map_or(0, |c| c.requests.load(Ordering::Relaxed))
    }

    /// `ok: false` envelopes received for a method
    pub fn error_count(&self, method: &str) -> u64 {
        self.methods
            .read()
            .get(method)
            .map_or(0, |c| c.errors.load(Ordering::Relaxed))
    }

    /// Error rate for a method
    pub fn error_rate(&self, method: &str) -> f64 {
        let requests = self.request_count(method);
        if requests == 0 {
            0.0
        } else {
            self.error_count(method) as f64 / requests as f64
        }
    }

    /// Total `retry_after` answers
    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits.load(Ordering::Relaxed)
    }

    /// Latency stats for a method
    pub fn latency_stats(&self, method: &str) -> Option<LatencyStats> {
        self.methods.read().get(method).map(|c| c.latency.stats())
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let methods = self
            .methods
            .read()
            .iter()
            .map(|(name, c)| {
                (
                    name.clone(),
                    MethodMetrics {
                        request_count: c.requests.load(Ordering::Relaxed),
                        error_count: c.errors.load(Ordering::Relaxed),
                        rate_limited: c.rate_limited.load(Ordering::Relaxed),
                        latency_stats: c.latency.stats(),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            methods,
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            multipart_requests: self.multipart_requests.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.methods.write().clear();
        self.rate_limit_hits.store(0, Ordering::Relaxed);
        self.multipart_requests.store(0, Ordering::Relaxed);
    }
}

impl RequestObserver for MetricsCollector {
    fn on_request(&self, method: &str, config: &RequestConfig) {
        self.record_request(method, config.body.is_multipart());
    }

    fn on_response(&self, method: &str, envelope: &ApiResponse, elapsed: Duration) {
        self.record_response(method, envelope.ok, elapsed);
    }

    fn on_rate_limited(
        &self,
        method: &str,
        _retry_after: Duration,
        _migrate_to_chat_id: Option<i64>,
    ) {
        self.record_rate_limit(method);
    }
}

/// Latency histogram using buckets sized for uploads
#[derive(Debug)]
pub struct LatencyHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
    /// 0-50ms, 50-250ms, 250ms-1s, 1-5s, 5s+
    buckets: [AtomicU64; 5],
}

impl LatencyHistogram {
    /// Create a new histogram
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
            buckets: Default::default(),
        }
    }

    /// Record a latency value
    pub fn record(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.min.fetch_min(ms, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let bucket = match ms {
            0..=50 => 0,
            51..=250 => 1,
            251..=1000 => 2,
            1001..=5000 => 3,
            _ => 4,
        };
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Get statistics
    pub fn stats(&self) -> LatencyStats {
        let count = self.count.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        let min = self.min.load(Ordering::Relaxed);

        LatencyStats {
            count,
            min_ms: if min == u64::MAX { 0 } else { min },
            max_ms: self.max.load(Ordering::Relaxed),
            avg_ms: if count > 0 { sum / count } else { 0 },
            buckets: std::array::from_fn(|i| self.buckets[i].load(Ordering::Relaxed)),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyStats {
    /// Sample count
    pub count: u64,
    /// Minimum latency
    pub min_ms: u64,
    /// Maximum latency
    pub max_ms: u64,
    /// Average latency
    pub avg_ms: u64,
    /// Bucket counts [0-50ms, 50-250ms, 250ms-1s, 1-5s, 5s+]
    pub buckets: [u64; 5],
}

/// Per-method metrics
#[derive(Debug, Clone)]
pub struct MethodMetrics {
    /// Requests sent
    pub request_count: u64,
    /// `ok: false` answers
    pub error_count: u64,
    /// `retry_after` answers
    pub rate_limited: u64,
    /// Latency stats
    pub latency_stats: LatencyStats,
}

/// Complete metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Per-method metrics
    pub methods: HashMap<String, MethodMetrics>,
    /// Total `retry_after` answers
    pub rate_limit_hits: u64,
    /// Requests sent as multipart
    pub multipart_requests: u64,
}
