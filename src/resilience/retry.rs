//! Backoff schedule for replaying failed JSON requests.
//!
//! The dispatcher owns the replay loop; this module only answers how long
//! to wait before the next attempt, or that there should be none.

use crate::errors::TelegramError;
use rand::Rng;
use std::time::Duration;

/// How often and how patiently replayable requests are resent
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first; zero sends every request exactly once
    pub max_retries: u32,
    /// Wait before the first replay, doubled for each further one
    pub base_delay: Duration,
    /// Ceiling for a computed wait
    pub max_delay: Duration,
    /// Spread computed waits over 50% to 150% of their value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retries disabled, 500ms base, 30s ceiling, jittered
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of replays
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether any replay can happen at all
    pub fn enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Wait before replay number `attempt` (1-based), `None` to give up.
    ///
    /// Only timeouts, connection failures, 429 and 5xx are replayed. A
    /// server `retry_after` replaces the computed backoff and is not capped.
    pub fn next_delay(&self, error: &TelegramError, attempt: u32) -> Option<Duration> {
        if attempt > self.max_retries || !error.is_retryable() {
            return None;
        }
        Some(error.retry_after().unwrap_or_else(|| self.backoff(attempt)))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..1.5))
        } else {
            delay
        }
    }
}
