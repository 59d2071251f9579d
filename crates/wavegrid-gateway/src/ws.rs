//! The duplex channel endpoint.
//!
//! Screens connect to `GET /api/v1/ws/{session_id}` (head-pose screens
//! add `?mode=pose`) and send one [`FrameMessage`] per text frame. Each
//! frame is classified in turn and answered on the same socket with a
//! [`ClassificationReply`], a [`PoseReply`] or an [`ErrorReply`]. Errors
//! never close the channel.
//!
//! [`ErrorReply`]: wavegrid_types::ErrorReply

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{debug, info, warn};
use wavegrid_types::{ClassificationReply, FrameMessage, PoseReply, SessionId};

use crate::error::GatewayError;
use crate::state::AppState;

/// Query parameters accepted on the channel URL.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelQuery {
    /// `pose` selects the head-pose classifier.
    #[serde(default)]
    pub mode: Option<String>,
}

impl ChannelQuery {
    fn is_pose(&self) -> bool {
        self.mode.as_deref() == Some("pose")
    }
}

/// Upgrade to a duplex channel for one screen session.
///
/// # Route
///
/// `GET /api/v1/ws/{session_id}`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(query): Query<ChannelQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let id = SessionId::from(session_id);
    let pose = query.is_pose();
    ws.on_upgrade(move |socket| handle_channel(socket, state, id, pose))
}

async fn handle_channel(mut socket: WebSocket, state: Arc<AppState>, id: SessionId, pose: bool) {
    state.sessions.register(id.clone(), pose).await;
    info!(session_id = %id, pose, "channel attached");

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                state.sessions.record_frame(&id).await;
                let Some(reply) = relay(&state, &id, pose, text.as_str()).await else {
                    continue;
                };
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    debug!(session_id = %id, "reply send failed");
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(session_id = %id, "channel error: {e}");
                break;
            }
        }
    }

    state.sessions.unregister(&id).await;
    info!(session_id = %id, "channel detached");
}

/// Classify one inbound text frame and return the reply JSON.
///
/// Failures become an error reply. `None` only when even that could
/// not be serialized.
pub async fn relay(state: &AppState, id: &SessionId, pose: bool, text: &str) -> Option<String> {
    let result = match classify(state, id, pose, text).await {
        Ok(reply) => return Some(reply),
        Err(e) => {
            debug!(session_id = %id, error = %e, "frame not classified");
            serde_json::to_string(&e.to_reply())
        }
    };
    match result {
        Ok(reply) => Some(reply),
        Err(e) => {
            warn!("error reply serialization failed: {e}");
            None
        }
    }
}

async fn classify(
    state: &AppState,
    id: &SessionId,
    pose: bool,
    text: &str,
) -> Result<String, GatewayError> {
    let frame = parse_frame(text)?;
    let session_id = id.as_str().to_owned();
    if pose {
        let p = state.classifier.predict_face(&frame.image_base64).await?;
        Ok(serde_json::to_string(&PoseReply {
            direction: p.direction,
            mouth_open: p.mouth_open,
            confidence: p.confidence,
            latency_ms: p.latency_ms,
            face_detected: p.face_detected,
            session_id,
        })?)
    } else {
        let p = state.classifier.predict(&frame.image_base64).await?;
        Ok(serde_json::to_string(&ClassificationReply {
            gesture_name: p.gesture_name,
            confidence: p.confidence,
            latency_ms: p.latency_ms,
            session_id,
        })?)
    }
}

/// Pull the frame out of a text message. Malformed JSON and an empty
/// image are both treated as "no image".
pub(crate) fn parse_frame(text: &str) -> Result<FrameMessage, GatewayError> {
    match serde_json::from_str::<FrameMessage>(text) {
        Ok(frame) if !frame.image_base64.is_empty() => Ok(frame),
        Ok(_) | Err(_) => Err(GatewayError::MissingImage),
    }
}
