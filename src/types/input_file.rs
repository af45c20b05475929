//! Binary media sources.
//!
//! Anything that can be drained as a sequence of byte chunks implements
//! [`ByteSource`]; [`InputFile`] is what payloads actually hold.

use bytes::Bytes;
use futures::stream::{self, Stream};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Owned, sendable stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A value that can be turned into a live byte stream
pub trait ByteSource: Send + 'static {
    /// Consume the source into a stream
    fn into_byte_stream(self) -> ByteStream;
}

impl ByteSource for Bytes {
    fn into_byte_stream(self) -> ByteStream {
        Box::pin(stream::once(async move { Ok(self) }))
    }
}

impl ByteSource for Vec<u8> {
    fn into_byte_stream(self) -> ByteStream {
        Bytes::from(self).into_byte_stream()
    }
}

impl ByteSource for &'static [u8] {
    fn into_byte_stream(self) -> ByteStream {
        Bytes::from_static(self).into_byte_stream()
    }
}

impl ByteSource for tokio::fs::File {
    fn into_byte_stream(self) -> ByteStream {
        Box::pin(ReaderStream::new(self))
    }
}

impl ByteSource for ByteStream {
    fn into_byte_stream(self) -> ByteStream {
        self
    }
}

/// Media handed to the encoder
pub enum InputFile {
    /// File on local disk, opened when the request is encoded
    Path(PathBuf),
    /// Fully buffered bytes
    Memory(Bytes),
    /// Live stream, read once
    Stream(ByteStream),
}

impl InputFile {
    /// Media read from a local path
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Media already in memory
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Memory(data.into())
    }

    /// Media produced by a stream of chunks
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Media pulled from an async reader
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::Stream(Box::pin(ReaderStream::new(reader)))
    }

    /// Media from any [`ByteSource`]
    pub fn from_source(source: impl ByteSource) -> Self {
        Self::Stream(source.into_byte_stream())
    }

    /// Whether the bytes arrive incrementally rather than all at once
    pub fn is_stream(&self) -> bool {
        !matches!(self, Self::Memory(_))
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory(data) => write!(f, "Memory({} bytes)", data.len()),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for InputFile {
    fn from(data: Bytes) -> Self {
        Self::Memory(data)
    }
}

impl From<Vec<u8>> for InputFile {
    fn from(data: Vec<u8>) -> Self {
        Self::Memory(data.into())
    }
}

impl From<PathBuf> for InputFile {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_bytes_source_yields_single_chunk() {
        let chunks: Vec<Bytes> = Bytes::from_static(b"abc")
            .into_byte_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"abc")]);
    }

    #[tokio::test]
    async fn test_reader_source() {
        let file = InputFile::reader(std::io::Cursor::new(b"hello".to_vec()));
        assert!(file.is_stream());
        let InputFile::Stream(stream) = file else {
            panic!("expected stream");
        };
        let body: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(body.concat(), b"hello");
    }

    #[test]
    fn test_debug_does_not_dump_bytes() {
        let file = InputFile::bytes(vec![0u8; 1024]);
        assert_eq!(format!("{:?}", file), "Memory(1024 bytes)");
        assert!(!file.is_stream());
    }
}
