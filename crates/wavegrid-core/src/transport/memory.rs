//! In-process channel pair.
//!
//! The [`MemoryPeer`] plays the gateway: it receives outbound frames as
//! JSON text and pushes reply text back.

use tokio::sync::mpsc;
use tracing::{debug, warn};
use wavegrid_types::ConnectionState;

use super::{Link, LinkTasks, TransportError, deliver, encode_outbound, mark_closed};

/// Screen side of an in-process channel.
#[derive(Debug)]
pub struct MemoryConnector {
    to_peer: mpsc::Sender<String>,
    from_peer: mpsc::Receiver<String>,
}

/// Gateway side of an in-process channel.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Frames sent by the screen, as wire JSON.
    pub frames: mpsc::Receiver<String>,
    /// Replies to deliver to the screen, as wire JSON.
    pub replies: mpsc::Sender<String>,
}

/// Create a connected pair. `capacity` bounds each direction.
pub fn pair(capacity: usize) -> (MemoryConnector, MemoryPeer) {
    let (to_peer, frames) = mpsc::channel(capacity.max(1));
    let (replies, from_peer) = mpsc::channel(capacity.max(1));
    (
        MemoryConnector { to_peer, from_peer },
        MemoryPeer { frames, replies },
    )
}

impl MemoryConnector {
    pub(crate) fn connect(self, link: Link) -> Result<LinkTasks, TransportError> {
        if self.to_peer.is_closed() {
            return Err(TransportError::Refused {
                reason: "memory peer dropped".to_owned(),
            });
        }
        let Link {
            mut outbound,
            events,
            state,
        } = link;
        state.send_replace(ConnectionState::Open);

        let to_peer = self.to_peer;
        let mut closed = state.subscribe();
        let writer_state = std::sync::Arc::clone(&state);
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    // The borrow from `wait_for` must not outlive this arm.
                    _ = async { closed.wait_for(|s| *s == ConnectionState::Closed).await.is_ok() } => break,
                    frame = outbound.recv() => {
                        let Some(frame) = frame else { break };
                        let Some(text) = encode_outbound(&frame) else { continue };
                        if to_peer.send(text).await.is_err() {
                            warn!("memory peer gone, closing");
                            mark_closed(&writer_state);
                            break;
                        }
                    }
                }
            }
            debug!("memory writer finished");
        });

        let mut from_peer = self.from_peer;
        let reader = tokio::spawn(async move {
            while let Some(text) = from_peer.recv().await {
                deliver(&text, &events).await;
            }
            if mark_closed(&state) {
                debug!("memory peer hung up");
            }
        });

        Ok(LinkTasks { writer, reader })
    }
}
