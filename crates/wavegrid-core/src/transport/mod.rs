//! The screen's end of the duplex channel.
//!
//! A [`TransportSession`] owns one channel keyed by a session id. Its
//! lifecycle is `Connecting -> Open -> Closed`, published on a `watch`
//! channel. There is no reconnect: once closed, the session stays closed
//! and the owner decides what to do.
//!
//! Two tasks run per open session:
//!
//! - **writer** -- drains a capacity-1 outbound queue onto the channel.
//!   [`FrameSender::try_send`] never waits, so a frame that finds the
//!   queue occupied is dropped rather than buffered.
//! - **reader** -- decodes each inbound text message and forwards
//!   classifications. Malformed messages are logged and skipped.
//!
//! Channel implementations are picked through the [`Connector`] enum
//! (enum dispatch, since async methods are not dyn-compatible).

pub mod memory;
pub mod websocket;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wavegrid_types::{ClassificationEvent, ConnectionState, FrameMessage, Session, SessionId};

use crate::capture::EncodedFrame;
use crate::decoder;

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

/// Errors opening a channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        /// URL that was dialled.
        url: String,
        /// The underlying WebSocket error.
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    /// The other end is not there.
    #[error("channel refused: {reason}")]
    Refused {
        /// Why.
        reason: String,
    },
}

/// What happened to a frame offered for sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the writer.
    Sent,
    /// The writer was still busy with the previous frame.
    Dropped,
    /// The channel is not open.
    NotOpen,
}

/// Cloneable, non-blocking handle for offering frames to a session.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<FrameMessage>,
    state: watch::Receiver<ConnectionState>,
}

impl FrameSender {
    /// Whether the channel is currently open.
    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    /// Offer a frame without waiting.
    pub fn try_send(&self, frame: &EncodedFrame) -> SendOutcome {
        if !self.is_open() {
            return SendOutcome::NotOpen;
        }
        match self.tx.try_send(frame.to_message()) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::NotOpen,
        }
    }
}

/// The channel-side halves handed to a connector's writer and reader.
pub(crate) struct Link {
    pub(crate) outbound: mpsc::Receiver<FrameMessage>,
    pub(crate) events: mpsc::Sender<ClassificationEvent>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
}

/// Writer and reader tasks of an open link.
pub(crate) struct LinkTasks {
    pub(crate) writer: JoinHandle<()>,
    pub(crate) reader: JoinHandle<()>,
}

/// Opens channels.
#[derive(Debug)]
pub enum Connector {
    /// A WebSocket to the classifier gateway.
    WebSocket(WebSocketConnector),
    /// An in-process pair, for tests and demos.
    Memory(MemoryConnector),
}

impl Connector {
    /// Open the channel for `session`. Decoded classifications are sent
    /// to `events`.
    pub async fn open(
        self,
        session: &Session,
        events: mpsc::Sender<ClassificationEvent>,
    ) -> Result<TransportSession, TransportError> {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state_tx);
        let (tx, outbound) = mpsc::channel(1);
        let link = Link {
            outbound,
            events,
            state: Arc::clone(&state),
        };

        let opened = match self {
            Self::WebSocket(connector) => connector.connect(session, link).await,
            Self::Memory(connector) => connector.connect(link),
        };
        let tasks = match opened {
            Ok(tasks) => tasks,
            Err(e) => {
                state.send_replace(ConnectionState::Closed);
                return Err(e);
            }
        };

        info!(session_id = %session.id, "transport open");
        Ok(TransportSession {
            session_id: session.id.clone(),
            state,
            sender: FrameSender { tx, state: state_rx },
            writer: Some(tasks.writer),
            reader: Some(tasks.reader),
        })
    }
}

/// One open (or formerly open) duplex channel.
#[derive(Debug)]
pub struct TransportSession {
    session_id: SessionId,
    state: Arc<watch::Sender<ConnectionState>>,
    sender: FrameSender,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl TransportSession {
    /// The session this channel belongs to.
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// A handle for the frame throttle.
    pub fn sender(&self) -> FrameSender {
        self.sender.clone()
    }

    /// Offer a frame. A no-op unless the channel is open.
    pub fn send(&self, frame: &EncodedFrame) -> SendOutcome {
        self.sender.try_send(frame)
    }

    /// Close the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        let reader = self.reader.take();
        let writer = self.writer.take();
        if reader.is_none() && writer.is_none() {
            return;
        }
        mark_closed(&self.state);
        // The writer sees `Closed`, sends a close frame and exits by itself.
        drop(writer);
        if let Some(reader) = reader {
            reader.abort();
        }
        info!(session_id = %self.session_id, "transport closed");
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Move to `Closed`. Returns whether this call made the change.
pub(crate) fn mark_closed(state: &watch::Sender<ConnectionState>) -> bool {
    state.send_if_modified(|current| {
        if *current == ConnectionState::Closed {
            false
        } else {
            *current = ConnectionState::Closed;
            true
        }
    })
}

/// Serialize an outbound frame.
pub(crate) fn encode_outbound(frame: &FrameMessage) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("failed to serialize frame: {e}");
            None
        }
    }
}

/// Decode one inbound text message and forward any classification.
pub(crate) async fn deliver(text: &str, events: &mpsc::Sender<ClassificationEvent>) {
    match decoder::decode(text) {
        Ok(Some(event)) => {
            debug!(
                label = %event.label,
                confidence = event.confidence,
                latency_ms = event.latency_ms,
                "classification received"
            );
            if events.send(event).await.is_err() {
                debug!("classification dropped, loop has stopped");
            }
        }
        Ok(None) => debug!("reply carried no classification"),
        Err(e) => warn!(error = %e, "dropping malformed message"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use wavegrid_types::{GestureLabel, Label, SessionKind};

    use super::*;
    use crate::capture::{RawFrame, encode_jpeg};

    async fn open_memory() -> (TransportSession, MemoryPeer, mpsc::Receiver<ClassificationEvent>) {
        let (connector, peer) = memory::pair(8);
        let (events_tx, events) = mpsc::channel(8);
        let session = Session::new(SessionKind::Snake);
        let transport = Connector::Memory(connector)
            .open(&session, events_tx)
            .await
            .unwrap();
        (transport, peer, events)
    }

    fn frame() -> EncodedFrame {
        encode_jpeg(&RawFrame::solid(4, 4, [9, 9, 9]), 60).unwrap()
    }

    #[tokio::test]
    async fn open_session_is_open() {
        let (transport, _peer, _events) = open_memory().await;
        assert_eq!(transport.state(), ConnectionState::Open);
        assert!(transport.session_id().as_str().starts_with("snake_"));
    }

    #[tokio::test]
    async fn frames_reach_the_peer_as_wire_json() {
        let (transport, mut peer, _events) = open_memory().await;
        let sent = frame();
        assert_eq!(transport.send(&sent), SendOutcome::Sent);
        let raw = peer.frames.recv().await.unwrap();
        let msg: FrameMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(msg.image_base64, sent.image_base64);
    }

    #[tokio::test]
    async fn busy_writer_drops_instead_of_queueing() {
        let (transport, mut peer, _events) = open_memory().await;
        // Nothing has yielded yet, so the writer has not drained the queue.
        assert_eq!(transport.send(&frame()), SendOutcome::Sent);
        assert_eq!(transport.send(&frame()), SendOutcome::Dropped);
        assert!(peer.frames.recv().await.is_some());
    }

    #[tokio::test]
    async fn replies_become_events() {
        let (_transport, peer, mut events) = open_memory().await;
        peer.replies
            .send(r#"{"gesture_name":"peace","confidence":0.7,"latency_ms":3.0,"session_id":"x"}"#.to_owned())
            .await
            .unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.label, Label::Gesture(GestureLabel::Peace));
    }

    #[tokio::test]
    async fn no_event_reply_keeps_channel_open() {
        let (transport, peer, mut events) = open_memory().await;
        peer.replies
            .send(r#"{"error":"no_hand"}"#.to_owned())
            .await
            .unwrap();
        peer.replies.send("garbage".to_owned()).await.unwrap();
        let nothing = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
        assert!(nothing.is_err());
        assert_eq!(transport.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut transport, mut peer, _events) = open_memory().await;
        transport.close();
        transport.close();
        assert_eq!(transport.state(), ConnectionState::Closed);
        assert_eq!(transport.send(&frame()), SendOutcome::NotOpen);
        // The writer lets go of the peer once it sees the close.
        let end = tokio::time::timeout(Duration::from_secs(1), peer.frames.recv()).await;
        assert!(matches!(end, Ok(None)));
    }

    #[tokio::test]
    async fn session_opens_from_a_spawned_task_and_closes_its_writer() {
        let (connector, mut peer) = memory::pair(8);
        let (events_tx, _events) = mpsc::channel(8);
        let session = Session::new(SessionKind::Detect);
        let mut transport = tokio::spawn(async move {
            Connector::Memory(connector).open(&session, events_tx).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(transport.send(&frame()), SendOutcome::Sent);
        assert!(peer.frames.recv().await.is_some());
        transport.close();
        let end = tokio::time::timeout(Duration::from_secs(1), peer.frames.recv()).await;
        assert!(matches!(end, Ok(None)));
    }

    #[tokio::test]
    async fn peer_hangup_closes_session() {
        let (transport, peer, _events) = open_memory().await;
        let mut state = transport.subscribe();
        drop(peer);
        let closed = tokio::time::timeout(
            Duration::from_secs(1),
            state.wait_for(|s| *s == ConnectionState::Closed),
        )
        .await;
        assert!(matches!(closed, Ok(Ok(_))));
        drop(closed);
        assert!(!transport.sender().is_open());
    }

    #[tokio::test]
    async fn drop_closes_session() {
        let (transport, mut peer, _events) = open_memory().await;
        let sender = transport.sender();
        drop(transport);
        assert!(!sender.is_open());
        let end = tokio::time::timeout(Duration::from_secs(1), peer.frames.recv()).await;
        assert!(matches!(end, Ok(None)));
    }
}
