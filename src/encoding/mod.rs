//! Payload encoding.
//!
//! [`MediaData`] decides whether a payload can travel as JSON or has to be
//! sent as `multipart/form-data`, and in the latter case resolves every
//! field into one or more [`Part`]s. Media nested inside structured fields
//! is moved out into its own part under a random id and replaced by an
//! `attach://<id>` reference, so the surrounding JSON still describes it.

mod request_config;

pub use request_config::{RequestBody, RequestConfig, RequestOptions};

use crate::errors::{RequestError, TelegramResult};
use crate::multipart::{random_hex, MultipartStream, Part, PartBody};
use crate::transport::HttpTransport;
use crate::types::{InputFile, Payload, PayloadValue};
use futures::future::try_join_all;
use http::header::{HeaderValue, CONNECTION, CONTENT_TYPE};
use http::HeaderMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fields whose presence forces multipart encoding
pub const MEDIA_FIELDS: [&str; 9] = [
    "sticker",
    "media",
    "photo",
    "audio",
    "document",
    "video",
    "animation",
    "voice",
    "video_note",
];

/// Structured fields the Bot API expects as JSON text inside a multipart body
pub const JSON_ENCODED_FIELDS: [&str; 6] = [
    "results",
    "reply_markup",
    "mask_position",
    "shipping_options",
    "errors",
    "commands",
];

/// Field that may point at separately uploaded bytes
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// Prefix of an attachment reference
pub const ATTACH_SCHEME: &str = "attach://";

const MEDIA_SUBFIELD: &str = "media";

/// Extension used for the synthetic filename of a binary part
pub fn file_extension(kind: &str) -> &'static str {
    match kind {
        "photo" | "thumbnail" => "jpg",
        "audio" => "mp3",
        "voice" => "ogg",
        "video" | "video_note" => "mp4",
        "animation" => "gif",
        "sticker" => "webp",
        _ => "txt",
    }
}

/// Payload encoder
#[derive(Clone)]
pub struct MediaData {
    transport: Arc<dyn HttpTransport>,
}

impl MediaData {
    /// Create an encoder that fetches remote thumbnails through `transport`
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Whether the payload must be sent as multipart.
    ///
    /// True when a media-bearing field holds a non-empty value, when an
    /// array field holds an object that itself has media, or when binary
    /// media appears anywhere at all.
    pub fn has_media(payload: &Payload) -> bool {
        payload.iter().any(|(name, value)| {
            (MEDIA_FIELDS.contains(&name) && !value.is_falsy())
                || matches!(value, PayloadValue::Array(items) if items.iter().any(
                    |item| matches!(item, PayloadValue::Object(inner) if Self::has_media(inner))
                ))
                || contains_binary(value)
        })
    }

    /// Encode as JSON, or as multipart when the payload has media
    pub async fn build_config(
        &self,
        payload: Payload,
        options: &RequestOptions,
    ) -> TelegramResult<RequestConfig> {
        if Self::has_media(&payload) {
            self.build_form_data_config(payload, options).await
        } else {
            Self::build_json_config(&payload, options)
        }
    }

    /// Plain JSON request
    pub fn build_json_config(
        payload: &Payload,
        options: &RequestOptions,
    ) -> TelegramResult<RequestConfig> {
        let body = serde_json::to_string(payload).map_err(RequestError::from)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        Ok(options.apply(headers, RequestBody::Json(body)))
    }

    /// Multipart request with every field resolved into parts
    pub async fn build_form_data_config(
        &self,
        mut payload: Payload,
        options: &RequestOptions,
    ) -> TelegramResult<RequestConfig> {
        for name in JSON_ENCODED_FIELDS {
            if let Some(value) = payload.get_mut(name) {
                if value.is_falsy() || value.as_str().is_some() {
                    continue;
                }
                let json = serde_json::to_string(&*value).map_err(RequestError::from)?;
                *value = PayloadValue::String(json);
            }
        }

        let mut form = MultipartStream::with_random_boundary();

        // Resolution may overlap; parts are appended afterwards in field order.
        let resolved = try_join_all(
            payload
                .into_iter()
                .map(|(name, value)| self.attach_form_value(name, value)),
        )
        .await?;
        for part in resolved.into_iter().flatten() {
            form.append_part(part);
        }

        debug!(
            boundary = form.boundary(),
            parts = form.pending_parts(),
            "Built multipart body"
        );

        let mut headers = HeaderMap::new();
        let content_type = HeaderValue::from_str(&form.content_type()).map_err(|e| {
            RequestError::InvalidHeader {
                message: e.to_string(),
            }
        })?;
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        Ok(options.apply(headers, RequestBody::Multipart(form)))
    }

    /// Resolve one payload field into the parts it contributes
    pub async fn attach_form_value(
        &self,
        name: String,
        value: PayloadValue,
    ) -> TelegramResult<Vec<Part>> {
        if value.is_falsy() {
            return Ok(Vec::new());
        }

        match value {
            PayloadValue::String(text) => {
                if is_local_file(&text).await {
                    let part = self
                        .attach_form_media(&name, &name, InputFile::path(text))
                        .await?;
                    return Ok(vec![part]);
                }
                if name == THUMBNAIL_FIELD && is_http_url(&text) {
                    let bytes = self.transport.download(&text).await?;
                    return self.attach_indirect(&name, InputFile::Memory(bytes)).await;
                }
                if MEDIA_FIELDS.contains(&name.as_str()) {
                    debug!(field = %name, "Sending media field as file_id or URL");
                }
                Ok(vec![Part::text(&name, text)])
            }
            PayloadValue::Bool(flag) => Ok(vec![Part::text(&name, flag.to_string())]),
            PayloadValue::Number(number) => Ok(vec![Part::text(&name, number.to_string())]),
            PayloadValue::Media(file) if name == THUMBNAIL_FIELD => {
                self.attach_indirect(&name, file).await
            }
            PayloadValue::Media(file) => {
                Ok(vec![self.attach_form_media(&name, &name, file).await?])
            }
            PayloadValue::Array(mut items) => {
                let mut detached = Vec::new();
                for item in &mut items {
                    detach_value(&name, None, item, &mut detached);
                }
                let mut parts = self.upload_detached(detached).await?;
                let json = serde_json::to_string(&items).map_err(RequestError::from)?;
                parts.push(Part::text(&name, json));
                Ok(parts)
            }
            PayloadValue::Object(mut object) => {
                let mut detached = Vec::new();
                detach_media(&mut object, &mut detached);
                let mut parts = self.upload_detached(detached).await?;
                let json = serde_json::to_string(&object).map_err(RequestError::from)?;
                parts.push(Part::text(&name, json));
                Ok(parts)
            }
            PayloadValue::Null => Ok(Vec::new()),
        }
    }

    /// Turn a media value into a binary part named `id`.
    ///
    /// `kind` picks the filename extension. A path that is not a regular
    /// file is rejected rather than dropped.
    pub async fn attach_form_media(
        &self,
        id: &str,
        kind: &str,
        file: InputFile,
    ) -> TelegramResult<Part> {
        let filename = format!("{}.{}", id, file_extension(kind));
        let body = match file {
            InputFile::Memory(bytes) => PartBody::Bytes(bytes),
            InputFile::Stream(stream) => PartBody::Stream(stream),
            InputFile::Path(path) => {
                if !is_regular_file(&path).await {
                    warn!(field = id, path = %path.display(), "Media path is not a readable file");
                    return Err(RequestError::UnresolvableMedia {
                        field: id.to_string(),
                        reason: format!("{} is not a regular file", path.display()),
                    }
                    .into());
                }
                let handle = tokio::fs::File::open(&path).await?;
                PartBody::from_source(handle)
            }
        };
        Ok(Part::binary(id, &filename, body))
    }

    /// Upload under a fresh id and point `name` at it
    async fn attach_indirect(&self, name: &str, file: InputFile) -> TelegramResult<Vec<Part>> {
        let id = attachment_id();
        let binary = self.attach_form_media(&id, name, file).await?;
        Ok(vec![binary, Part::text(name, format!("{ATTACH_SCHEME}{id}"))])
    }

    /// Binary parts for members swapped out by [`detach_media`]
    async fn upload_detached(&self, detached: Vec<Detached>) -> TelegramResult<Vec<Part>> {
        let mut parts = Vec::with_capacity(detached.len());
        for Detached { id, kind, file } in detached {
            parts.push(self.attach_form_media(&id, &kind, file).await?);
        }
        Ok(parts)
    }
}

/// Binary member replaced by an `attach://` reference, pending upload
struct Detached {
    id: String,
    kind: String,
    file: InputFile,
}

/// Swap binary members for references, depth first in field order.
///
/// A `media` member takes its extension from the sibling `type`; any other
/// member from its own name.
fn detach_media(object: &mut Payload, detached: &mut Vec<Detached>) {
    let media_type = object
        .get("type")
        .and_then(PayloadValue::as_str)
        .map(str::to_string);

    for (name, value) in object.iter_mut() {
        detach_value(name, media_type.as_deref(), value, detached);
    }
}

fn detach_value(
    name: &str,
    media_type: Option<&str>,
    value: &mut PayloadValue,
    detached: &mut Vec<Detached>,
) {
    match value {
        PayloadValue::Media(_) => {
            let kind = match media_type {
                Some(media_type) if name == MEDIA_SUBFIELD => media_type,
                _ => name,
            };
            let id = attachment_id();
            let reference = PayloadValue::String(format!("{ATTACH_SCHEME}{id}"));
            if let PayloadValue::Media(file) = std::mem::replace(value, reference) {
                detached.push(Detached {
                    id,
                    kind: kind.to_string(),
                    file,
                });
            }
        }
        PayloadValue::Object(inner) => detach_media(inner, detached),
        PayloadValue::Array(items) => {
            for item in items {
                detach_value(name, media_type, item, detached);
            }
        }
        _ => {}
    }
}

impl std::fmt::Debug for MediaData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaData").finish_non_exhaustive()
    }
}

fn contains_binary(value: &PayloadValue) -> bool {
    match value {
        PayloadValue::Media(_) => true,
        PayloadValue::Array(items) => items.iter().any(contains_binary),
        PayloadValue::Object(object) => object.iter().any(|(_, v)| contains_binary(v)),
        _ => false,
    }
}

fn attachment_id() -> String {
    random_hex(8)
}

fn is_http_url(text: &str) -> bool {
    url::Url::parse(text).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Existence probe that never fails: anything unreadable is "not a file"
async fn is_local_file(text: &str) -> bool {
    if text.is_empty() || text.contains('\0') || is_http_url(text) {
        return false;
    }
    is_regular_file(Path::new(text)).await
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("photo", "jpg")]
    #[test_case("voice", "ogg")]
    #[test_case("video_note", "mp4")]
    #[test_case("sticker", "webp")]
    #[test_case("3fa1c0de", "txt")]
    fn test_file_extension(kind: &str, ext: &str) {
        assert_eq!(file_extension(kind), ext);
    }

    #[test]
    fn test_plain_payload_has_no_media() {
        let payload = Payload::new()
            .field("chat_id", 1)
            .field("text", "hello")
            .field(
                "reply_markup",
                json!({"inline_keyboard": [[{"text": "a", "callback_data": "b"}]]}),
            );
        assert!(!MediaData::has_media(&payload));
    }

    #[test]
    fn test_media_field_triggers_multipart() {
        let payload = Payload::new().field("chat_id", 1).field("photo", "AgACAgIAAxkBAAI");
        assert!(MediaData::has_media(&payload));

        let empty = Payload::new().field("chat_id", 1).field("photo", "");
        assert!(!MediaData::has_media(&empty));
    }

    #[test]
    fn test_nested_array_media_triggers_multipart() {
        let payload = Payload::new().field("chat_id", 1).field(
            "results",
            vec![Payload::new().field("type", "photo").field("photo", "AgAC")],
        );
        assert!(MediaData::has_media(&payload));
    }

    #[test]
    fn test_binary_outside_media_fields_triggers_multipart() {
        let payload = Payload::new()
            .field("url", "https://example.com/hook")
            .field("certificate", InputFile::bytes(b"-----BEGIN".to_vec()));
        assert!(MediaData::has_media(&payload));
    }

    #[test]
    fn test_json_config_body_and_headers() {
        let payload = Payload::new().field("chat_id", 7).field("text", "hi");
        let config = MediaData::build_json_config(&payload, &RequestOptions::default()).unwrap();

        assert_eq!(config.method, http::Method::POST);
        assert!(config.compress);
        assert_eq!(config.headers[CONTENT_TYPE], "application/json");
        assert_eq!(config.headers[CONNECTION], "keep-alive");
        assert_eq!(config.body.as_json(), Some(r#"{"chat_id":7,"text":"hi"}"#));
    }

    #[test]
    fn test_url_detection() {
        assert!(is_http_url("https://example.com/x.jpg"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("ftp://example.com/x"));
        assert!(!is_http_url("AgACAgIAAxkBAAI"));
        assert!(!is_http_url("/tmp/photo.jpg"));
    }

    #[tokio::test]
    async fn test_missing_path_is_not_a_file() {
        assert!(!is_local_file("/definitely/not/here.jpg").await);
        assert!(!is_local_file("").await);
        assert!(!is_local_file("nul\0byte").await);
    }
}
