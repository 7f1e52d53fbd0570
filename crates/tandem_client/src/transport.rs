//! Frame transport abstraction.
//!
//! The multiplexer only needs to send and receive whole text frames. Any
//! message-oriented connection can be adapted by implementing [`FrameSink`]
//! and [`FrameStream`]; [`duplex`] provides an in-memory pair for tests and
//! loopback use.

use crate::error::{ClientError, ClientResult};
use std::future::Future;
use tokio::sync::mpsc;

/// The sending half of a frame transport.
pub trait FrameSink: Send + 'static {
    /// Sends one frame.
    fn send(&mut self, frame: String) -> impl Future<Output = ClientResult<()>> + Send;

    /// Closes the sending direction. Further sends fail.
    fn close(&mut self) -> impl Future<Output = ClientResult<()>> + Send;
}

/// The receiving half of a frame transport.
pub trait FrameStream: Send + 'static {
    /// Receives the next frame.
    ///
    /// Returns `None` once the peer has closed the connection. Must be
    /// cancel-safe: dropping the future before it completes loses no frame.
    fn recv(&mut self) -> impl Future<Output = Option<ClientResult<String>>> + Send;
}

type Item = Result<String, String>;

/// In-memory sending half created by [`duplex`].
#[derive(Debug)]
pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Item>>,
}

impl MemorySink {
    /// Sends a frame without awaiting.
    pub fn try_send(&self, frame: impl Into<String>) -> ClientResult<()> {
        self.push(Ok(frame.into()))
    }

    /// Makes the peer's stream report a transport failure.
    pub fn fail(&self, message: impl Into<String>) -> ClientResult<()> {
        self.push(Err(message.into()))
    }

    /// Returns true once closed locally or by the peer dropping its stream.
    pub fn is_closed(&self) -> bool {
        !matches!(&self.tx, Some(tx) if !tx.is_closed())
    }

    fn push(&self, item: Item) -> ClientResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ClientError::transport_fatal("sink closed"))?;
        tx.send(item)
            .map_err(|_| ClientError::transport_fatal("peer hung up"))
    }
}

impl FrameSink for MemorySink {
    async fn send(&mut self, frame: String) -> ClientResult<()> {
        self.try_send(frame)
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.tx = None;
        Ok(())
    }
}

/// In-memory receiving half created by [`duplex`].
#[derive(Debug)]
pub struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Item>,
}

impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<ClientResult<String>> {
        self.rx
            .recv()
            .await
            .map(|item| item.map_err(ClientError::transport_fatal))
    }
}

/// Creates two connected transport ends.
///
/// Frames sent on one end's sink arrive on the other end's stream, in order.
pub fn duplex() -> ((MemorySink, MemoryStream), (MemorySink, MemoryStream)) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        (MemorySink { tx: Some(a_tx) }, MemoryStream { rx: b_rx }),
        (MemorySink { tx: Some(b_tx) }, MemoryStream { rx: a_rx }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_order() {
        let ((mut left_sink, mut left_stream), (mut right_sink, mut right_stream)) = duplex();

        left_sink.send("one".into()).await.unwrap();
        left_sink.send("two".into()).await.unwrap();
        right_sink.send("back".into()).await.unwrap();

        assert_eq!(right_stream.recv().await.unwrap().unwrap(), "one");
        assert_eq!(right_stream.recv().await.unwrap().unwrap(), "two");
        assert_eq!(left_stream.recv().await.unwrap().unwrap(), "back");
    }

    #[tokio::test]
    async fn close_ends_peer_stream() {
        let ((mut sink, _stream), (_peer_sink, mut peer_stream)) = duplex();

        sink.send("last".into()).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(peer_stream.recv().await.unwrap().unwrap(), "last");
        assert!(peer_stream.recv().await.is_none());
        assert!(sink.is_closed());
        assert!(sink.send("late".into()).await.is_err());
    }

    #[tokio::test]
    async fn failure_surfaces_as_transport_error() {
        let ((sink, _stream), (_peer_sink, mut peer_stream)) = duplex();

        sink.fail("connection reset").unwrap();

        let err = peer_stream.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Transport { retryable: false, .. }));
        assert_eq!(err.to_string(), "transport error: connection reset");
    }

    #[tokio::test]
    async fn dropped_stream_fails_sends() {
        let ((sink, _stream), peer) = duplex();
        drop(peer);

        assert!(sink.is_closed());
        assert!(sink.try_send("nobody").is_err());
    }
}
