//! Stream session lifecycle.
//!
//! A session binds one [`FrameDecoder`] to one open connection and turns
//! transport activity into an ordered sequence of [`StreamEvent`]s.
//!
//! # State Machine
//!
//! ```text
//!                 open ok                  end of body
//!  [Connecting] ─────────> [Active] ─────────────────────> [Closed]
//!       │                     │  │
//!       │ open failed         │  │ destroy()
//!       │                     │  v
//!       │   transport error   │ [Closing] ──────────────> [Closed]
//!       └─────────────────────┴───────────────────────────> [Failed]
//! ```
//!
//! `Closed` and `Failed` are terminal. Every session emits exactly one
//! terminal event: `End` when it reaches `Closed`, a fatal `Error` when it
//! reaches `Failed`. Nothing is emitted after it.
//!
//! `destroy()` takes effect immediately: events still queued for the reader
//! are discarded and the next event read is `End`.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::{ready, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::stats::{SessionStats, StatsSummary};
use crate::codec::{preview, Frame, FrameDecoder};
use crate::config::StreamConfig;
use crate::error::{ChirpError, ErrorClass};
use crate::transport::{StreamRequest, Transport};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection requested, not yet confirmed
    Connecting,
    /// Connection confirmed, messages flowing
    Active,
    /// Caller-initiated teardown in progress.
    ///
    /// Held only while `destroy()` owns the session lock, so it is never
    /// returned by [`StreamSession::state`].
    Closing,
    /// Ended normally or torn down by the caller
    Closed,
    /// Ended by a fatal error
    Failed,
}

impl SessionState {
    /// Whether no further transitions can happen
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Whether the session can still deliver events
    fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

/// Event delivered to the application
#[derive(Debug)]
pub enum StreamEvent {
    /// A decoded message
    Message(Value),
    /// An error; `Fatal` errors are followed by nothing
    Error {
        /// Effect on the session
        class: ErrorClass,
        /// What went wrong
        error: ChirpError,
    },
    /// The stream ended normally or was destroyed
    End,
}

impl StreamEvent {
    /// Get the message, if this is a message event
    pub fn message(&self) -> Option<&Value> {
        match self {
            Self::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this event terminates the session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::End
                | Self::Error {
                    class: ErrorClass::Fatal,
                    ..
                }
        )
    }
}

struct Inner {
    state: SessionState,
    /// Set by `destroy()`; the reader discards the queue and yields `End`
    destroyed: bool,
    events: Option<mpsc::UnboundedSender<StreamEvent>>,
    task: Option<JoinHandle<()>>,
}

/// State shared between the session task and every handle
struct Shared {
    id: String,
    inner: Mutex<Inner>,
    stats: SessionStats,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Connecting -> Active; false if the session was torn down meanwhile
    fn activate(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != SessionState::Connecting {
            return false;
        }
        inner.state = SessionState::Active;
        tracing::info!(session = %self.id, "Stream active");
        true
    }

    /// Deliver a non-terminal event; false if nobody can receive it
    fn deliver(&self, event: StreamEvent) -> bool {
        let inner = self.lock();
        if inner.state != SessionState::Active {
            return false;
        }
        match &inner.events {
            Some(events) => events.send(event).is_ok(),
            None => false,
        }
    }

    /// Enter `Failed` and emit the fatal error
    fn fail(&self, error: ChirpError) {
        let mut inner = self.lock();
        if !inner.state.is_live() {
            return;
        }
        tracing::warn!(session = %self.id, error = %error, "Stream failed");
        inner.state = SessionState::Failed;
        inner.task = None;
        if let Some(events) = inner.events.take() {
            let _ = events.send(StreamEvent::Error {
                class: ErrorClass::Fatal,
                error,
            });
        }
    }

    /// Enter `Closed` after the platform ended the stream
    fn finish(&self) {
        let mut inner = self.lock();
        if !inner.state.is_live() {
            return;
        }
        tracing::info!(session = %self.id, "Stream ended by remote");
        inner.state = SessionState::Closed;
        inner.task = None;
        if let Some(events) = inner.events.take() {
            let _ = events.send(StreamEvent::End);
        }
    }

    /// Caller teardown; false if the session had already terminated
    fn destroy(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.is_live() {
            return false;
        }

        inner.state = SessionState::Closing;
        tracing::debug!(session = %self.id, "Stream closing");
        if let Some(task) = inner.task.take() {
            task.abort();
        }

        inner.state = SessionState::Closed;
        inner.destroyed = true;
        // Closing the channel wakes a pending reader
        inner.events = None;
        tracing::info!(session = %self.id, "Stream destroyed");
        true
    }

    fn destroyed(&self) -> bool {
        self.lock().destroyed
    }
}

/// A live streaming connection and its event queue.
///
/// Events are read with [`next_event`](Self::next_event) or through the
/// [`Stream`] implementation. Dropping the session tears it down.
pub struct StreamSession {
    shared: Arc<Shared>,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    ended: bool,
}

impl StreamSession {
    /// Open `request` over `transport` and start delivering events.
    ///
    /// Returns immediately in `Connecting`; must be called inside a tokio
    /// runtime.
    pub fn start(
        transport: Arc<dyn Transport>,
        request: StreamRequest,
        config: &StreamConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            id: uuid::Uuid::new_v4().to_string(),
            inner: Mutex::new(Inner {
                state: SessionState::Connecting,
                destroyed: false,
                events: Some(tx),
                task: None,
            }),
            stats: SessionStats::new(),
        });

        tracing::info!(
            session = %shared.id,
            transport = transport.name(),
            url = %request.url,
            "Stream connecting"
        );

        let span = tracing::info_span!("stream", session = %shared.id);
        let task = tokio::spawn(
            run(
                Arc::clone(&shared),
                transport,
                request,
                config.frame_limit(),
            )
            .instrument(span),
        );

        {
            let mut inner = shared.lock();
            if inner.state.is_live() {
                inner.task = Some(task);
            }
        }

        Self {
            shared,
            events: rx,
            ended: false,
        }
    }

    /// Session ID
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Statistics so far
    pub fn stats(&self) -> StatsSummary {
        self.shared.stats.summary()
    }

    /// Cloneable handle for tearing the session down from elsewhere
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Abort the connection and close the session.
    ///
    /// Undelivered events are dropped and `End` is the next event read.
    /// Later calls, or calls after the session already terminated, do
    /// nothing.
    pub fn destroy(&self) {
        self.shared.destroy();
    }

    /// Wait for the next event; `None` after the terminal event was read
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.next().await
    }
}

impl Stream for StreamSession {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ended {
            return Poll::Ready(None);
        }

        // Checked again after receiving, in case destroy() raced the read
        if !this.shared.destroyed() {
            let event = ready!(this.events.poll_recv(cx));
            if !this.shared.destroyed() {
                if event.as_ref().map_or(true, StreamEvent::is_terminal) {
                    this.ended = true;
                }
                return Poll::Ready(event);
            }
        }

        this.ended = true;
        this.events.close();
        while this.events.try_recv().is_ok() {}
        Poll::Ready(Some(StreamEvent::End))
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.shared.destroy();
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Cloneable control handle for a [`StreamSession`]
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Session ID
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Statistics so far
    pub fn stats(&self) -> StatsSummary {
        self.shared.stats.summary()
    }

    /// Abort the connection and close the session; idempotent
    pub fn destroy(&self) {
        self.shared.destroy();
    }
}

/// Session task: open, decode, deliver, terminate
async fn run(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    request: StreamRequest,
    max_frame_bytes: Option<usize>,
) {
    let mut chunks = match transport.open(request).await {
        Ok(chunks) => chunks,
        Err(e) => {
            shared.fail(e);
            return;
        },
    };

    if !shared.activate() {
        return;
    }

    let mut decoder = FrameDecoder::with_limit(max_frame_bytes);

    while let Some(chunk) = chunks.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                shared.fail(e);
                return;
            },
        };

        shared.stats.record_chunk(bytes.len());

        for frame in decoder.feed(&bytes) {
            let delivered = match frame {
                Frame::Message(value) => {
                    shared.stats.record_message();
                    shared.deliver(StreamEvent::Message(value))
                },
                Frame::Invalid(error) if error.is_fatal() => {
                    shared.fail(error);
                    return;
                },
                Frame::Invalid(error) => {
                    tracing::warn!(error = %error, "Skipping undecodable frame");
                    shared.stats.record_decode_error();
                    shared.deliver(StreamEvent::Error {
                        class: ErrorClass::NonFatal,
                        error,
                    })
                },
            };

            if !delivered {
                tracing::debug!("Session no longer deliverable, stopping");
                return;
            }
        }
    }

    let trailing = decoder.buffered();
    if !trailing.iter().all(u8::is_ascii_whitespace) {
        let error = ChirpError::Decode {
            segment: preview(trailing),
            reason: "stream ended inside a frame".to_string(),
        };
        tracing::warn!(bytes = trailing.len(), "Stream ended with a partial frame");
        shared.stats.record_decode_error();
        shared.deliver(StreamEvent::Error {
            class: ErrorClass::NonFatal,
            error,
        });
    }

    shared.finish();
}
