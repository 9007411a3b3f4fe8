//! In-process transport fed from a channel.
//!
//! Useful for replaying recorded streams and for driving sessions in tests:
//! whatever is pushed through the [`ChunkSender`] arrives as body chunks, a
//! pushed error is a connection failure, and dropping the sender is a
//! graceful end of stream.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use futures::channel::mpsc;

use super::{ChunkStream, StreamRequest, Transport};
use crate::error::{ChirpError, Result};

/// Producer side of a [`ChannelTransport`].
#[derive(Clone)]
pub struct ChunkSender {
    tx: mpsc::UnboundedSender<Result<Bytes>>,
}

impl ChunkSender {
    /// Deliver a body chunk; returns false once the connection is gone
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.unbounded_send(Ok(chunk.into())).is_ok()
    }

    /// Deliver a connection failure
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx
            .unbounded_send(Err(ChirpError::Transport(reason.into())))
            .is_ok()
    }

    /// Close the stream gracefully
    pub fn end(self) {
        self.tx.close_channel();
    }

    /// Whether the consuming side has dropped the connection
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Single-use transport whose body comes from a [`ChunkSender`].
pub struct ChannelTransport {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Result<Bytes>>>>,
    refuse: Option<String>,
    opened: Mutex<Vec<StreamRequest>>,
}

impl ChannelTransport {
    /// Create a transport and the sender that feeds it
    pub fn new() -> (Self, ChunkSender) {
        let (tx, rx) = mpsc::unbounded();
        let transport = Self {
            receiver: Mutex::new(Some(rx)),
            refuse: None,
            opened: Mutex::new(Vec::new()),
        };
        (transport, ChunkSender { tx })
    }

    /// Create a transport whose `open` always fails
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            receiver: Mutex::new(None),
            refuse: Some(reason.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Requests passed to `open`, in call order
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for ChannelTransport {
    fn open(
        &self,
        request: StreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkStream>> + Send + '_>> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let result = match &self.refuse {
            Some(reason) => Err(ChirpError::Transport(reason.clone())),
            None => self
                .receiver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .map(|rx| Box::pin(rx) as ChunkStream)
                .ok_or_else(|| ChirpError::Transport("Channel transport already opened".to_string())),
        };

        Box::pin(async move { result })
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_chunks_arrive_in_order_then_end() {
        let (transport, sender) = ChannelTransport::new();
        let mut body = transport.open(StreamRequest::post("mem://filter")).await.unwrap();

        assert!(sender.send(&b"one"[..]));
        assert!(sender.send(&b"two"[..]));
        sender.end();

        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"two"));
        assert!(body.next().await.is_none());

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.requests()[0].url, "mem://filter");
    }

    #[tokio::test]
    async fn test_second_open_fails() {
        let (transport, _sender) = ChannelTransport::new();
        assert!(transport.open(StreamRequest::post("mem://a")).await.is_ok());
        assert!(matches!(
            transport.open(StreamRequest::post("mem://a")).await,
            Err(ChirpError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_refusing_transport() {
        let transport = ChannelTransport::refusing("401 Unauthorized");
        let result = transport.open(StreamRequest::post("mem://a")).await;
        assert!(matches!(result, Err(ChirpError::Transport(reason)) if reason == "401 Unauthorized"));
    }

    #[tokio::test]
    async fn test_sender_sees_dropped_body() {
        let (transport, sender) = ChannelTransport::new();
        let body = transport.open(StreamRequest::post("mem://a")).await.unwrap();
        drop(body);

        assert!(!sender.send(&b"late"[..]));
        assert!(sender.is_closed());
    }
}
