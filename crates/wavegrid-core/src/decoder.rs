//! Inbound message decoding.
//!
//! Every message arriving on the duplex channel passes through [`decode`].
//! The result has three shapes:
//!
//! - `Ok(Some(event))` -- a usable classification.
//! - `Ok(None)` -- a well-formed "nothing to act on" reply: an `error`
//!   object, a classifier-side `"error"` label, or a pose reply with no
//!   face. The channel stays up and the mapper is never invoked.
//! - `Err(DecodeError)` -- a malformed payload. The caller logs it and
//!   keeps the channel open.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use wavegrid_types::{ClassificationEvent, GestureLabel, Label, PoseDirection};

/// Why an inbound message could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not JSON.
    #[error("payload is not valid JSON: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// The payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// Neither `gesture_name` nor `direction` is present as a string.
    #[error("payload carries no label")]
    MissingLabel,

    /// `confidence` is absent or not a number.
    #[error("payload carries no numeric confidence")]
    MissingConfidence,

    /// `confidence` is non-finite or outside `[0, 1]`.
    #[error("confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange {
        /// The offending value.
        value: f64,
    },
}

/// Decode one inbound text message, stamping it with the current time.
pub fn decode(raw: &str) -> Result<Option<ClassificationEvent>, DecodeError> {
    decode_at(raw, Utc::now())
}

/// Decode one inbound text message with an explicit arrival time.
pub fn decode_at(
    raw: &str,
    received_at: DateTime<Utc>,
) -> Result<Option<ClassificationEvent>, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(obj) = value else {
        return Err(DecodeError::NotAnObject);
    };

    if obj.contains_key("error") {
        return Ok(None);
    }

    let label = if let Some(name) = obj.get("gesture_name").and_then(Value::as_str) {
        if name == "error" {
            return Ok(None);
        }
        Label::Gesture(GestureLabel::from_wire(name))
    } else if let Some(direction) = obj.get("direction").and_then(Value::as_str) {
        if obj.get("face_detected").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        Label::Pose(PoseDirection::from_wire(direction))
    } else {
        return Err(DecodeError::MissingLabel);
    };

    let confidence = confidence(&obj)?;
    let latency_ms = obj
        .get("latency_ms")
        .and_then(Value::as_f64)
        .filter(|ms| ms.is_finite() && *ms >= 0.0);
    let mouth_open = match label {
        Label::Pose(_) => obj.get("mouth_open").and_then(Value::as_bool),
        Label::Gesture(_) => None,
    };

    Ok(Some(ClassificationEvent {
        label,
        confidence,
        latency_ms,
        mouth_open,
        received_at,
    }))
}

fn confidence(obj: &Map<String, Value>) -> Result<f32, DecodeError> {
    let value = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or(DecodeError::MissingConfidence)?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(DecodeError::ConfidenceOutOfRange { value });
    }
    // In [0, 1], so narrowing only drops precision.
    #[allow(clippy::cast_possible_truncation)]
    let narrowed = value as f32;
    Ok(narrowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_reply_decodes() {
        let raw = r#"{"gesture_name":"pointing","confidence":0.93,"latency_ms":12.5,"session_id":"snake_1"}"#;
        let event = decode(raw);
        assert!(matches!(
            event,
            Ok(Some(ClassificationEvent {
                label: Label::Gesture(GestureLabel::Pointing),
                mouth_open: None,
                ..
            }))
        ));
        if let Ok(Some(ev)) = event {
            assert_eq!(ev.confidence_percent(), 93);
            assert!(ev.latency_ms.is_some());
        }
    }

    #[test]
    fn pose_reply_decodes_with_mouth() {
        let raw = r#"{"direction":"left","mouth_open":true,"confidence":0.8,"latency_ms":4.0,"face_detected":true}"#;
        let event = decode(raw);
        assert!(matches!(
            event,
            Ok(Some(ClassificationEvent {
                label: Label::Pose(PoseDirection::Left),
                mouth_open: Some(true),
                ..
            }))
        ));
    }

    #[test]
    fn error_object_is_no_event() {
        assert!(matches!(decode(r#"{"error":"no_hand"}"#), Ok(None)));
        assert!(matches!(
            decode(r#"{"error":"ML service unavailable"}"#),
            Ok(None)
        ));
    }

    #[test]
    fn classifier_error_label_is_no_event() {
        let raw = r#"{"gesture_name":"error","confidence":0.0,"latency_ms":0.0}"#;
        assert!(matches!(decode(raw), Ok(None)));
    }

    #[test]
    fn no_face_is_no_event() {
        let raw = r#"{"direction":"no_face","mouth_open":false,"confidence":0.0,"latency_ms":3.0,"face_detected":false}"#;
        assert!(matches!(decode(raw), Ok(None)));
    }

    #[test]
    fn unknown_label_decodes_to_unknown() {
        let raw = r#"{"gesture_name":"jazz_hands","confidence":0.4}"#;
        assert!(matches!(
            decode(raw),
            Ok(Some(ClassificationEvent {
                label: Label::Gesture(GestureLabel::Unknown),
                latency_ms: None,
                ..
            }))
        ));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json { .. })));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(
            decode(r#"{"confidence":0.5}"#),
            Err(DecodeError::MissingLabel)
        ));
        assert!(matches!(
            decode(r#"{"gesture_name":"fist"}"#),
            Err(DecodeError::MissingConfidence)
        ));
        assert!(matches!(
            decode(r#"{"gesture_name":"fist","confidence":"high"}"#),
            Err(DecodeError::MissingConfidence)
        ));
    }

    #[test]
    fn confidence_out_of_range_is_error() {
        assert!(matches!(
            decode(r#"{"gesture_name":"fist","confidence":1.5}"#),
            Err(DecodeError::ConfidenceOutOfRange { .. })
        ));
        assert!(matches!(
            decode(r#"{"gesture_name":"fist","confidence":-0.1}"#),
            Err(DecodeError::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn negative_latency_is_dropped() {
        let raw = r#"{"gesture_name":"fist","confidence":0.5,"latency_ms":-3.0}"#;
        assert!(matches!(
            decode(raw),
            Ok(Some(ClassificationEvent {
                latency_ms: None,
                ..
            }))
        ));
    }
}
