//! Streaming `multipart/form-data` body composer.
//!
//! Parts are queued with [`MultipartStream::append`] and written strictly
//! in order when the composer is polled as a [`Stream`]. A streamed part
//! body is drained to completion before the next separator is emitted,
//! so bodies never interleave and the full request is never buffered.

use crate::types::{ByteSource, ByteStream};
use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use rand::RngCore;
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Body of a single part
pub enum PartBody {
    /// Written as one chunk
    Bytes(Bytes),
    /// Piped through chunk by chunk
    Stream(ByteStream),
}

impl PartBody {
    /// Whether the body is a live stream
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Wrap any byte source as a streamed body
    pub fn from_source(source: impl ByteSource) -> Self {
        Self::Stream(source.into_byte_stream())
    }
}

impl fmt::Debug for PartBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for PartBody {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<String> for PartBody {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&str> for PartBody {
    fn from(value: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<ByteStream> for PartBody {
    fn from(value: ByteStream) -> Self {
        Self::Stream(value)
    }
}

/// One named section of the body
#[derive(Debug)]
pub struct Part {
    headers: Vec<(String, String)>,
    body: PartBody,
}

impl Part {
    /// Part with arbitrary headers
    pub fn new(headers: Vec<(String, String)>, body: impl Into<PartBody>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Plain text field
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self::new(
            vec![(
                "content-disposition".to_string(),
                format!("form-data; name=\"{}\"", escape_quoted(name)),
            )],
            PartBody::from(value.into()),
        )
    }

    /// Binary field carrying a filename
    pub fn binary(name: &str, filename: &str, body: PartBody) -> Self {
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        Self::new(
            vec![
                (
                    "content-disposition".to_string(),
                    format!(
                        "form-data; name=\"{}\"; filename=\"{}\"",
                        escape_quoted(name),
                        escape_quoted(filename)
                    ),
                ),
                ("content-type".to_string(), content_type),
            ],
            body,
        )
    }

    /// Look up a header value
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Borrow the body
    pub fn body(&self) -> &PartBody {
        &self.body
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

/// Generate a random hex token of `len` bytes
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

enum State {
    /// Between parts
    Idle,
    /// Piping a streamed part body
    Body(ByteStream),
    /// Trailer written or a body failed
    Done,
}

/// Sequential multipart body
pub struct MultipartStream {
    boundary: String,
    pending: VecDeque<Part>,
    written: usize,
    state: State,
}

impl MultipartStream {
    /// Create a composer with a caller-chosen boundary
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            pending: VecDeque::new(),
            written: 0,
            state: State::Idle,
        }
    }

    /// Create a composer with a fresh random boundary
    pub fn with_random_boundary() -> Self {
        Self::new(random_hex(24))
    }

    /// The boundary token
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `content-type` request header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Queue a part built from headers and a body
    pub fn append<I, K, V>(&mut self, headers: I, body: impl Into<PartBody>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.append_part(Part::new(headers, body));
    }

    /// Queue a prepared part
    pub fn append_part(&mut self, part: Part) {
        self.pending.push_back(part);
    }

    /// Number of queued parts not yet written
    pub fn pending_parts(&self) -> usize {
        self.pending.len()
    }

    /// Borrow the queued parts
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.pending.iter()
    }

    /// Whether a body is a live stream
    pub fn is_stream(body: &PartBody) -> bool {
        body.is_stream()
    }

    /// Drain the whole body into memory
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        use futures::TryStreamExt;

        let chunks: Vec<Bytes> = self.try_collect().await?;
        let mut out = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            out.put(chunk);
        }
        Ok(out.freeze())
    }

    fn part_head(&self, headers: &[(String, String)]) -> BytesMut {
        let mut head = BytesMut::new();
        if self.written > 0 {
            head.put_slice(b"\r\n");
        }
        head.put_slice(b"--");
        head.put_slice(self.boundary.as_bytes());
        head.put_slice(b"\r\n");
        for (key, value) in headers {
            head.put_slice(key.as_bytes());
            head.put_slice(b": ");
            head.put_slice(value.as_bytes());
            head.put_slice(b"\r\n");
        }
        head.put_slice(b"\r\n");
        head
    }

    fn trailer(&self) -> Bytes {
        let mut tail = BytesMut::new();
        if self.written > 0 {
            tail.put_slice(b"\r\n");
        }
        tail.put_slice(b"--");
        tail.put_slice(self.boundary.as_bytes());
        tail.put_slice(b"--");
        tail.freeze()
    }
}

impl Stream for MultipartStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                State::Done => return Poll::Ready(None),
                State::Body(body) => match body.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => continue,
                    Poll::Ready(Some(Ok(chunk))) => return Poll::Ready(Some(Ok(chunk))),
                    Poll::Ready(Some(Err(err))) => {
                        this.state = State::Done;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => this.state = State::Idle,
                    Poll::Pending => return Poll::Pending,
                },
                State::Idle => {
                    let Some(part) = this.pending.pop_front() else {
                        let trailer = this.trailer();
                        this.state = State::Done;
                        return Poll::Ready(Some(Ok(trailer)));
                    };
                    let mut head = this.part_head(&part.headers);
                    this.written += 1;
                    match part.body {
                        PartBody::Bytes(bytes) => {
                            head.put(bytes);
                            return Poll::Ready(Some(Ok(head.freeze())));
                        }
                        PartBody::Stream(body) => {
                            this.state = State::Body(body);
                            return Poll::Ready(Some(Ok(head.freeze())));
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for MultipartStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartStream")
            .field("boundary", &self.boundary)
            .field("pending", &self.pending.len())
            .field("written", &self.written)
            .finish()
    }
}
