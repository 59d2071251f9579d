//! WebSocket channel to the classifier gateway.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use wavegrid_types::{ConnectionState, Session};

use super::{Link, LinkTasks, TransportError, deliver, encode_outbound, mark_closed};

/// Dials `{base}/api/v1/ws/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConnector {
    base_url: String,
}

impl WebSocketConnector {
    /// Create a connector for a gateway base URL such as
    /// `ws://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// The channel URL for a session. Head-pose screens ask for the pose
    /// classifier with `?mode=pose`.
    pub fn url_for(&self, session: &Session) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut url = format!("{base}/api/v1/ws/{}", session.id);
        if session.kind.uses_pose() {
            url.push_str("?mode=pose");
        }
        url
    }

    pub(crate) async fn connect(
        self,
        session: &Session,
        link: Link,
    ) -> Result<LinkTasks, TransportError> {
        let url = self.url_for(session);
        debug!(%url, "dialling gateway");
        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|source| TransportError::Connect {
                    url: url.clone(),
                    source: Box::new(source),
                })?;
        info!(%url, "gateway channel open");

        let Link {
            mut outbound,
            events,
            state,
        } = link;
        state.send_replace(ConnectionState::Open);
        let (mut sink, mut stream) = stream.split();

        let mut closed = state.subscribe();
        let writer_state = Arc::clone(&state);
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    // The borrow from `wait_for` must not outlive this arm.
                    _ = async { closed.wait_for(|s| *s == ConnectionState::Closed).await.is_ok() } => break,
                    frame = outbound.recv() => {
                        let Some(frame) = frame else { break };
                        let Some(text) = encode_outbound(&frame) else { continue };
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!("frame send failed, closing: {e}");
                            mark_closed(&writer_state);
                            break;
                        }
                    }
                }
            }
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("close frame not sent: {e}");
            }
            debug!("websocket writer finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => deliver(text.as_str(), &events).await,
                    Ok(Message::Close(_)) => {
                        debug!("gateway closed the channel");
                        break;
                    }
                    Ok(_) => {
                        // Ping/pong are answered by tungstenite; binary is not used.
                    }
                    Err(e) => {
                        warn!("websocket read failed: {e}");
                        break;
                    }
                }
            }
            if mark_closed(&state) {
                info!("gateway channel closed");
            }
        });

        Ok(LinkTasks { writer, reader })
    }
}

#[cfg(test)]
mod tests {
    use wavegrid_types::{SessionId, SessionKind};

    use super::*;

    fn session(kind: SessionKind, id: &str) -> Session {
        Session {
            id: SessionId::from(id),
            kind,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn gesture_url() {
        let c = WebSocketConnector::new("ws://localhost:8000/");
        assert_eq!(
            c.url_for(&session(SessionKind::Snake, "snake_abc")),
            "ws://localhost:8000/api/v1/ws/snake_abc"
        );
    }

    #[test]
    fn pose_url_asks_for_pose_mode() {
        let c = WebSocketConnector::new("ws://gw:9000");
        assert_eq!(
            c.url_for(&session(SessionKind::Face, "face_1")),
            "ws://gw:9000/api/v1/ws/face_1?mode=pose"
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_is_connect_error() {
        let connector = super::super::Connector::WebSocket(WebSocketConnector::new(
            "ws://127.0.0.1:1",
        ));
        let (events, _rx) = tokio::sync::mpsc::channel(1);
        let result = connector.open(&session(SessionKind::Detect, "session_x"), events).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
