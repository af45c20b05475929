//! Photo Upload Example
//!
//! This example demonstrates how to:
//! - Build a client from `TELEGRAM_*` environment variables
//! - Upload a local photo with a caption
//! - Send a document group mixing a file on disk and an in-memory buffer
//! - Read rate-limit hints from API errors
//!
//! Run with:
//! `TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=... cargo run --example send_photo -- cat.jpg`

use std::sync::Arc;
use telegram_bot_client::{
    InputFile, MetricsCollector, Payload, TelegramClient, TelegramConfig, TelegramError,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), TelegramError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("telegram_bot_client=debug")),
        )
        .init();

    let chat_id: i64 = std::env::var("TELEGRAM_CHAT_ID")
        .ok()
        .and_then(|id| id.parse().ok())
        .unwrap_or_default();
    let photo = std::env::args().nth(1).unwrap_or_else(|| "cat.jpg".to_string());

    // Metrics are collected alongside the default tracing observer
    let metrics = Arc::new(MetricsCollector::new());
    let client = TelegramClient::builder(TelegramConfig::from_env()?)
        .observer(metrics.clone())
        .build()?;

    let me = client.request("getMe", Payload::new()).await?;
    println!("Running as @{}", me["username"].as_str().unwrap_or("?"));

    // A plain path string is uploaded when it names an existing file
    let payload = Payload::new()
        .field("chat_id", chat_id)
        .field("photo", photo.as_str())
        .field("caption", "Uploaded from disk");

    match client.request("sendPhoto", payload).await {
        Ok(message) => println!("Sent photo as message {}", message["message_id"]),
        Err(err) => {
            if let Some(retry_after) = err.retry_after() {
                println!("Rate limited, retry in {}s", retry_after.as_secs());
            }
            if let Some(chat) = err.migrate_to_chat_id() {
                println!("Chat moved to {}", chat);
            }
            return Err(err);
        }
    }

    let group = Payload::new().field("chat_id", chat_id).field(
        "media",
        vec![
            Payload::new()
                .field("type", "document")
                .field("media", InputFile::path(&photo))
                .field("caption", "From disk again"),
            Payload::new()
                .field("type", "document")
                .field("media", InputFile::bytes(b"hello from memory\n".to_vec())),
        ],
    );
    client.request("sendMediaGroup", group).await?;

    let snapshot = metrics.snapshot();
    println!(
        "{} multipart requests, {} rate limit hits",
        snapshot.multipart_requests, snapshot.rate_limit_hits
    );

    Ok(())
}
