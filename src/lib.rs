//! Telegram Bot API Client
//!
//! Low-level Bot API client with:
//! - JSON or streamed `multipart/form-data` encoding chosen per payload
//! - Local files, in-memory buffers, byte streams and remote thumbnails as media
//! - `attach://` rewriting for media nested in media groups
//! - Per-method cooldowns driven by `retry_after`
//! - Observer hooks for tracing and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use telegram_bot_client::{InputFile, Payload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create client from environment
//!     let client = telegram_bot_client::create_client_from_env()?;
//!
//!     let payload = Payload::new()
//!         .field("chat_id", 123456789)
//!         .field("photo", InputFile::path("cat.jpg"))
//!         .field("caption", "Hello, Telegram!");
//!
//!     let message = client.request("sendPhoto", payload).await?;
//!     println!("Sent message: {}", message["message_id"]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Core modules
pub mod client;
pub mod config;
pub mod errors;
pub mod transport;
pub mod types;

// Encoding
pub mod encoding;
pub mod multipart;

// Resilience
pub mod resilience;

// Observability
pub mod observability;

// Testing utilities
pub mod mocks;

// Tests
#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use client::{TelegramClient, TelegramClientBuilder};
pub use config::{BotToken, TelegramConfig, TelegramConfigBuilder};
pub use encoding::{MediaData, RequestOptions};
pub use errors::{ApiError, TelegramError, TelegramResult};
pub use observability::{MetricsCollector, RequestObserver, TracingObserver};
pub use types::{ApiResponse, ByteSource, InputFile, Payload, PayloadValue, ResponseParameters};

/// Default base URL for the Bot API
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Create a Telegram client with the given configuration
pub fn create_client(config: TelegramConfig) -> TelegramResult<TelegramClient> {
    TelegramClient::new(config)
}

/// Create a Telegram client from environment variables
///
/// Reads:
/// - `TELEGRAM_BOT_TOKEN` - Bot token (required)
/// - `TELEGRAM_API_URL` - Base URL, e.g. a local Bot API server
/// - `TELEGRAM_TIMEOUT` - Request timeout in seconds
/// - `TELEGRAM_RATE_LIMIT` - `1`/`true`/`yes` to honor `retry_after` cooldowns
/// - `TELEGRAM_MAX_RETRIES` - Retries for JSON requests
pub fn create_client_from_env() -> TelegramResult<TelegramClient> {
    let config = TelegramConfig::from_env()?;
    create_client(config)
}
