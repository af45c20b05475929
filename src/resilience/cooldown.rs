//! Per-method cooldowns derived from `retry_after` answers.
//!
//! Each method is either clear to send or cooling down until an instant.
//! Entries are never evicted; an expired one simply stops blocking.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Stand-in deadline for hints too large to add to the clock
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Earliest permitted send time per Bot API method
#[derive(Debug, Default)]
pub struct CooldownTracker {
    until: Mutex<HashMap<String, Instant>>,
}

impl CooldownTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `method` for `retry_after` from now.
    ///
    /// A shorter hint never shortens an existing cooldown.
    pub fn record(&self, method: &str, retry_after: Duration) {
        let now = Instant::now();
        let deadline = now
            .checked_add(retry_after)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut until = self.until.lock();
        let entry = until.entry(method.to_string()).or_insert(deadline);
        if *entry < deadline {
            *entry = deadline;
        }
        debug!(
            method,
            retry_after_secs = retry_after.as_secs(),
            "Recorded cooldown"
        );
    }

    /// Time left before `method` may be sent again
    pub fn remaining(&self, method: &str) -> Option<Duration> {
        let deadline = *self.until.lock().get(method)?;
        let left = deadline.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }

    /// Suspend until `method` is clear; returns how long it waited
    pub async fn wait(&self, method: &str) -> Duration {
        let start = Instant::now();
        // Re-check after sleeping: another caller may have extended the cooldown.
        while let Some(left) = self.remaining(method) {
            debug!(method, wait_ms = left.as_millis() as u64, "Waiting for cooldown");
            tokio::time::sleep(left).await;
        }
        start.elapsed()
    }

    /// Forget all cooldowns
    pub fn clear(&self) {
        self.until.lock().clear();
    }
}
