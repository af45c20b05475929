//! Resilience patterns for the Telegram client.
//!
//! Provides the per-method cooldown state and the replay backoff schedule.

pub mod cooldown;
pub mod retry;

pub use cooldown::CooldownTracker;
pub use retry::RetryConfig;
