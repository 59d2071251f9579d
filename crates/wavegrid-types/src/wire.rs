//! JSON messages on the duplex channel and the classifier service API.
//!
//! # Duplex channel (`/api/v1/ws/{session_id}`)
//!
//! | Direction | Message |
//! |-----------|---------|
//! | screen -> gateway | [`FrameMessage`] |
//! | gateway -> screen | [`ClassificationReply`], [`PoseReply`] or [`ErrorReply`] |
//!
//! # Classifier service
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/predict` | [`GesturePrediction`] |
//! | `POST` | `/predict-face` | [`FacePrediction`] |
//!
//! Both take a [`FrameMessage`] body.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One encoded camera frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FrameMessage {
    /// Base64 of a JPEG image, without a data-URL prefix.
    pub image_base64: String,
}

/// Hand-gesture classification relayed to the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClassificationReply {
    /// Wire name of the recognised gesture.
    pub gesture_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Classifier inference latency.
    pub latency_ms: f64,
    /// Echo of the session the frame came from.
    pub session_id: String,
}

/// Head-pose classification relayed to the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PoseReply {
    /// Wire name of the head direction.
    pub direction: String,
    /// Whether the mouth is open.
    pub mouth_open: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Classifier inference latency.
    pub latency_ms: f64,
    /// Whether a face was found at all.
    pub face_detected: bool,
    /// Echo of the session the frame came from.
    pub session_id: String,
}

/// An explicit "no classification" reply. Never terminates the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorReply {
    /// Human-readable reason.
    pub error: String,
}

impl ErrorReply {
    /// Build an error reply.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response body of the classifier's `/predict` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GesturePrediction {
    /// Wire name of the recognised gesture (`no_hand` when none).
    pub gesture_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Inference latency.
    pub latency_ms: f64,
    /// Whether a hand was found.
    #[serde(default)]
    pub hand_detected: bool,
}

/// Response body of the classifier's `/predict-face` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacePrediction {
    /// Wire name of the head direction (`no_face` when none).
    pub direction: String,
    /// Whether the mouth is open.
    #[serde(default)]
    pub mouth_open: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Inference latency.
    pub latency_ms: f64,
    /// Whether a face was found.
    #[serde(default)]
    pub face_detected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_message_field_name() {
        let msg = FrameMessage {
            image_base64: String::from("abc"),
        };
        let json = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(json["image_base64"], "abc");
    }

    #[test]
    fn face_prediction_tolerates_missing_flags() {
        let raw = r#"{"direction":"left","confidence":0.8,"latency_ms":4.0}"#;
        let parsed: Result<FacePrediction, _> = serde_json::from_str(raw);
        assert!(parsed.is_ok());
        if let Ok(p) = parsed {
            assert!(!p.face_detected);
            assert!(!p.mouth_open);
        }
    }
}
