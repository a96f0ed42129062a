//! Line-oriented streaming responses (`/v1/agent/monitor`).
//!
//! The agent keeps the response open and writes one log line at a time.
//! [`LineStream`] reads it lazily: nothing is buffered beyond the current
//! line, and the sequence can be walked once only.
//!
//! The connection is released exactly once, on whichever comes first of
//! [`LineStream::close`], cancellation, end of body, a read error, or drop.

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::io::{AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ClientError;

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A forward-only sequence of text lines read from an open response body.
pub struct LineStream {
    lines: Option<Lines<StreamReader<ByteStream, Bytes>>>,
    cancel: CancellationToken,
    path: String,
}

impl LineStream {
    pub(crate) fn from_response(
        response: reqwest::Response,
        cancel: CancellationToken,
        path: String,
    ) -> Self {
        let body = response.bytes_stream().map_err(io::Error::other);
        Self::from_byte_stream(body, cancel, path)
    }

    pub(crate) fn from_byte_stream<S>(body: S, cancel: CancellationToken, path: String) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let body: ByteStream = Box::pin(body);
        Self {
            lines: Some(StreamReader::new(body).lines()),
            cancel,
            path,
        }
    }

    /// Wait for the next complete line, without its line terminator.
    ///
    /// Returns `None` once the body ends or the cancellation token fires.
    /// A read failure is returned once, after which the stream is closed.
    pub async fn next_line(&mut self) -> Option<Result<String, ClientError>> {
        let lines = self.lines.as_mut()?;
        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            line = lines.next_line() => Some(line),
        };

        match next {
            Some(Ok(Some(line))) => Some(Ok(line)),
            Some(Ok(None)) | None => {
                self.close();
                None
            }
            Some(Err(e)) => {
                self.close();
                Some(Err(ClientError::Stream(e)))
            }
        }
    }

    /// Release the connection. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.lines.take().is_some() {
            debug!(path = %self.path, "line stream released");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lines.is_none()
    }

    /// Adapt into a [`futures::Stream`] of lines.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, ClientError>> + Send {
        futures::stream::unfold(self, |mut lines| async move {
            lines.next_line().await.map(|line| (line, lines))
        })
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let parts: Vec<io::Result<Bytes>> = parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        futures::stream::iter(parts)
    }

    fn stream_of(parts: &[&'static str]) -> LineStream {
        LineStream::from_byte_stream(chunks(parts), CancellationToken::new(), "/v1/agent/monitor".into())
    }

    #[tokio::test]
    async fn reassembles_lines_across_chunks() {
        let mut s = stream_of(&["2024/01/01 [INFO] agent: st", "arted\n[DEBUG] x\r\n", "tail"]);
        assert_eq!(s.next_line().await.unwrap().unwrap(), "2024/01/01 [INFO] agent: started");
        assert_eq!(s.next_line().await.unwrap().unwrap(), "[DEBUG] x");
        assert_eq!(s.next_line().await.unwrap().unwrap(), "tail");
        assert!(s.next_line().await.is_none());
        assert!(s.is_closed());
        assert!(s.next_line().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_ends_an_idle_stream() {
        let body = chunks(&["first\n"]).chain(futures::stream::pending());
        let cancel = CancellationToken::new();
        let mut s = LineStream::from_byte_stream(body, cancel.clone(), "/v1/agent/monitor".into());

        assert_eq!(s.next_line().await.unwrap().unwrap(), "first");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let next = tokio::time::timeout(Duration::from_secs(2), s.next_line())
            .await
            .expect("cancellation should end the wait");
        assert!(next.is_none());
        assert!(s.is_closed());
    }

    #[tokio::test]
    async fn read_error_is_reported_once() {
        let body = chunks(&["ok\n"]).chain(futures::stream::iter(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ))]));
        let mut s = LineStream::from_byte_stream(body, CancellationToken::new(), "/x".into());
        assert_eq!(s.next_line().await.unwrap().unwrap(), "ok");
        assert!(matches!(s.next_line().await, Some(Err(ClientError::Stream(_)))));
        assert!(s.next_line().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut s = stream_of(&["a\nb\n"]);
        s.close();
        s.close();
        assert!(s.is_closed());
        assert!(s.next_line().await.is_none());
    }

    #[tokio::test]
    async fn adapts_into_a_futures_stream() {
        let lines: Vec<String> = stream_of(&["a\nb\n", "c\n"])
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(lines, ["a", "b", "c"]);
    }
}
