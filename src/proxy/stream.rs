//! Streaming helpers shared by the passthrough engine and the binary proxy.
//!
//! # Responsibilities
//! - Relay upstream bodies chunk by chunk, never buffering the whole body
//! - Cap every relayed chunk at the configured chunk size
//! - Tap passthrough responses for the analysis hook

use std::error::Error as StdError;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{stream, Stream, TryStreamExt};

/// Boxed body stream handed to `axum::body::Body::from_stream`.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Split `bytes` into pieces of at most `chunk_size` bytes.
///
/// Slicing `Bytes` is zero-copy.
pub fn split_chunks(mut bytes: Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    let mut out = Vec::with_capacity(bytes.len().div_ceil(chunk_size));
    while bytes.len() > chunk_size {
        out.push(bytes.split_to(chunk_size));
    }
    if !bytes.is_empty() {
        out.push(bytes);
    }
    out
}

/// Re-chunk an upstream body stream without accumulating it.
pub fn rechunk<S, E>(upstream: S, chunk_size: usize) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync>> + 'static,
{
    let chunks = upstream
        .map_err(io::Error::other)
        .map_ok(move |bytes| {
            stream::iter(
                split_chunks(bytes, chunk_size)
                    .into_iter()
                    .map(Ok::<Bytes, io::Error>),
            )
        })
        .try_flatten();
    Box::pin(chunks)
}

/// Receives the complete body of every successful passthrough response.
///
/// Nothing inspects passthrough traffic yet; this is where it will plug in.
pub trait PassthroughAnalyzer: Send + Sync {
    fn analyze(&self, chunks: Vec<Bytes>);
}

/// Analyzer that drops what it is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyzer;

impl PassthroughAnalyzer for NoopAnalyzer {
    fn analyze(&self, chunks: Vec<Bytes>) {
        tracing::trace!(
            chunks = chunks.len(),
            bytes = chunks.iter().map(Bytes::len).sum::<usize>(),
            "Passthrough response captured"
        );
    }
}

/// Stream adapter recording each chunk as it is relayed.
///
/// The analyzer runs once, when the upstream body ends cleanly. A caller
/// disconnect drops the stream (and the upstream connection) first, so
/// incomplete bodies are never analyzed.
pub struct CapturedStream {
    inner: ByteStream,
    captured: Vec<Bytes>,
    analyzer: Arc<dyn PassthroughAnalyzer>,
    finished: bool,
}

impl CapturedStream {
    pub fn new(inner: ByteStream, analyzer: Arc<dyn PassthroughAnalyzer>) -> Self {
        Self {
            inner,
            captured: Vec::new(),
            analyzer,
            finished: false,
        }
    }
}

impl Stream for CapturedStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.captured.push(chunk.clone());
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    this.analyzer.analyze(std::mem::take(&mut this.captured));
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Vec<Bytes>>>);

    impl PassthroughAnalyzer for Recorder {
        fn analyze(&self, chunks: Vec<Bytes>) {
            self.0.lock().unwrap().push(chunks);
        }
    }

    #[test]
    fn test_split_chunks() {
        let pieces = split_chunks(Bytes::from(vec![7u8; 20]), 8);
        let sizes: Vec<usize> = pieces.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![8, 8, 4]);

        assert_eq!(split_chunks(Bytes::from_static(b"abc"), 8).len(), 1);
        assert!(split_chunks(Bytes::new(), 8).is_empty());
    }

    #[tokio::test]
    async fn test_rechunk_caps_chunk_size() {
        let upstream = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from(vec![1u8; 10])),
            Ok(Bytes::from(vec![2u8; 3])),
        ]);
        let chunks: Vec<Bytes> = rechunk(upstream, 4).try_collect().await.unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![4, 4, 2, 3]);
    }

    #[tokio::test]
    async fn test_rechunk_propagates_errors() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from_static(b"ok")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let result: Result<Vec<Bytes>, io::Error> = rechunk(upstream, 4).try_collect().await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_captured_stream_analyzes_once_at_end() {
        let recorder = Arc::new(Recorder::default());
        let upstream = stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"hello world"))]);
        let captured = CapturedStream::new(rechunk(upstream, 5), recorder.clone());

        let relayed: Vec<Bytes> = captured.try_collect().await.unwrap();
        assert_eq!(relayed.concat(), b"hello world");

        let calls = recorder.0.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], relayed);
    }
}
