//! Classification events and the control commands derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{Direction, Point};
use crate::labels::Label;

/// One decoded classifier reply.
///
/// Produced by the decoder, consumed exactly once by the control mapper,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    /// The recognised gesture or head pose.
    pub label: Label,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
    /// Classifier-reported inference latency, when present.
    pub latency_ms: Option<f64>,
    /// Whether the mouth is open. Only head-pose replies carry this.
    pub mouth_open: Option<bool>,
    /// When the reply arrived at this process.
    pub received_at: DateTime<Utc>,
}

impl ClassificationEvent {
    /// Confidence as a whole percentage, for display.
    pub fn confidence_percent(&self) -> u8 {
        let scaled = (self.confidence.clamp(0.0, 1.0) * 100.0).round();
        // Clamped to [0, 100] above, so the conversion cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = scaled as u8;
        pct
    }
}

/// A discrete control action for the simulation.
///
/// Ephemeral: produced by the mapper and applied within one tick (grid
/// game) or immediately (drawing surface).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Steer the creature.
    SetDirection(Direction),
    /// Change the inter-tick delay, in milliseconds.
    SetTempo(u64),
    /// Extend the active ink stroke to a point.
    DrawAt(Point),
    /// Cycle to the next palette colour.
    ChangeColor,
    /// Extend an eraser stroke to a point.
    Erase(Point),
    /// Remove every stroke.
    ClearAll,
    /// Save the current drawing.
    SaveSnapshot,
    /// End the active stroke without drawing.
    LiftPen,
}
