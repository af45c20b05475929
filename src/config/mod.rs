//! Configuration management for the Telegram client.
//!
//! Supports configuration via:
//! - Explicit values
//! - Environment variables
//! - Builder pattern

use crate::errors::{ConfigurationError, TelegramResult};
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

/// Secure wrapper for a Bot API token (`<bot id>:<secret>`)
#[derive(Clone)]
pub struct BotToken {
    token: SecretString,
    bot_id: u64,
}

impl BotToken {
    /// Create a new token
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigurationError> {
        let token_str = token.into();
        let (id, secret) = token_str.split_once(':').ok_or_else(|| {
            ConfigurationError::InvalidToken("Token must look like <bot id>:<secret>".to_string())
        })?;

        if secret.is_empty() || secret.chars().any(char::is_whitespace) {
            return Err(ConfigurationError::InvalidToken(
                "Token secret must be non-empty and contain no whitespace".to_string(),
            ));
        }

        let bot_id = id
            .parse::<u64>()
            .ok()
            .filter(|_| id.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| {
                ConfigurationError::InvalidToken("Bot id must be numeric".to_string())
            })?;

        Ok(Self {
            token: SecretString::new(token_str),
            bot_id,
        })
    }

    /// The public numeric bot id
    pub fn bot_id(&self) -> u64 {
        self.bot_id
    }

    /// Expose the token for use in request URLs
    pub(crate) fn expose(&self) -> &str {
        self.token.expose_secret()
    }
}

impl std::fmt::Debug for BotToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BotToken({}:[REDACTED])", self.bot_id)
    }
}

/// Configuration for the Telegram client
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token embedded in every method URL
    pub(crate) token: BotToken,
    /// Base URL for API requests
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
    /// Honor `retry_after` with per-method cooldowns
    pub rate_limit: bool,
    /// Accept compressed responses
    pub compress: bool,
    /// Maximum retries for replayable requests
    pub max_retries: u32,
    /// Default headers
    pub default_headers: HeaderMap,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.token)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("rate_limit", &self.rate_limit)
            .field("compress", &self.compress)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl TelegramConfig {
    /// Create a new configuration builder
    pub fn builder() -> TelegramConfigBuilder {
        TelegramConfigBuilder::new()
    }

    /// Create configuration from environment variables
    pub fn from_env() -> TelegramResult<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigurationError::MissingToken)?;
        let mut builder = TelegramConfigBuilder::new().token(&token)?;

        if let Ok(url) = std::env::var("TELEGRAM_API_URL") {
            builder = builder.base_url(&url)?;
        }

        if let Ok(timeout) = std::env::var("TELEGRAM_TIMEOUT") {
            let secs = timeout.parse::<u64>().map_err(|_| {
                ConfigurationError::EnvVar(format!("TELEGRAM_TIMEOUT is not a number: {}", timeout))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Ok(flag) = std::env::var("TELEGRAM_RATE_LIMIT") {
            builder = builder.rate_limit(parse_flag(&flag));
        }

        if let Ok(retries) = std::env::var("TELEGRAM_MAX_RETRIES") {
            let n = retries.parse::<u32>().map_err(|_| {
                ConfigurationError::EnvVar(format!(
                    "TELEGRAM_MAX_RETRIES is not a number: {}",
                    retries
                ))
            })?;
            builder = builder.max_retries(n);
        }

        builder.build()
    }

    /// Get the bot token
    pub fn token(&self) -> &BotToken {
        &self.token
    }

    /// URL of a Bot API method: `<base>/bot<token>/<method>`
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base(),
            self.token.expose(),
            method.trim_start_matches('/')
        )
    }

    /// URL of a file returned by `getFile`: `<base>/file/bot<token>/<path>`
    pub fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base(),
            self.token.expose(),
            file_path.trim_start_matches('/')
        )
    }

    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Validate the configuration
    pub fn validate(&self) -> TelegramResult<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidConfiguration {
                message: format!("Unsupported base URL scheme: {}", self.base_url.scheme()),
            }
            .into());
        }

        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "Timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Builder for TelegramConfig
#[derive(Debug, Default)]
pub struct TelegramConfigBuilder {
    token: Option<BotToken>,
    base_url: Option<Url>,
    timeout: Option<Duration>,
    rate_limit: bool,
    compress: Option<bool>,
    max_retries: u32,
    default_headers: HeaderMap,
}

impl TelegramConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bot token
    pub fn token(mut self, token: &str) -> Result<Self, ConfigurationError> {
        self.token = Some(BotToken::new(token)?);
        Ok(self)
    }

    /// Set the base URL
    pub fn base_url(mut self, url: &str) -> Result<Self, ConfigurationError> {
        self.base_url = Some(parse_url(url)?);
        Ok(self)
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable per-method cooldowns
    pub fn rate_limit(mut self, enabled: bool) -> Self {
        self.rate_limit = enabled;
        self
    }

    /// Enable or disable compressed responses
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Set the maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Add a default header
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(header_name) = name.parse::<http::header::HeaderName>() {
            if let Ok(header_value) = value.parse::<http::header::HeaderValue>() {
                self.default_headers.insert(header_name, header_value);
            }
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> TelegramResult<TelegramConfig> {
        let token = self.token.ok_or(ConfigurationError::MissingToken)?;
        let base_url = match self.base_url {
            Some(url) => url,
            None => parse_url(crate::DEFAULT_BASE_URL)?,
        };

        let config = TelegramConfig {
            token,
            base_url,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS)),
            rate_limit: self.rate_limit,
            compress: self.compress.unwrap_or(true),
            max_retries: self.max_retries,
            default_headers: self.default_headers,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_url(url: &str) -> Result<Url, ConfigurationError> {
    Url::parse(url).map_err(|e| ConfigurationError::InvalidConfiguration {
        message: format!("Invalid URL: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validation() {
        assert_eq!(BotToken::new("123456:ABC-def_1").unwrap().bot_id(), 123456);
        assert!(BotToken::new("no-colon").is_err());
        assert!(BotToken::new("123456:").is_err());
        assert!(BotToken::new("abc:secret").is_err());
        assert!(BotToken::new("+12:secret").is_err());
        assert!(BotToken::new("12:sec ret").is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BotToken::new("42:super-secret").unwrap();
        let debug = format!("{:?}", token);
        assert_eq!(debug, "BotToken(42:[REDACTED])");

        let config = TelegramConfig::builder().token("42:super-secret").unwrap().build().unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = TelegramConfig::builder().token("1:x").unwrap().build().unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.telegram.org/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.rate_limit);
        assert!(config.compress);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_method_and_file_urls() {
        let config = TelegramConfig::builder()
            .token("123:abc")
            .unwrap()
            .base_url("http://localhost:8081/")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            config.method_url("sendMessage"),
            "http://localhost:8081/bot123:abc/sendMessage"
        );
        assert_eq!(
            config.file_url("/photos/file_0.jpg"),
            "http://localhost:8081/file/bot123:abc/photos/file_0.jpg"
        );
    }

    #[test]
    fn test_validation() {
        assert!(TelegramConfig::builder().build().is_err());
        assert!(TelegramConfig::builder()
            .token("1:x")
            .unwrap()
            .timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(TelegramConfig::builder()
            .token("1:x")
            .unwrap()
            .base_url("ftp://example.com")
            .unwrap()
            .build()
            .is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
