//! Classification labels produced by the external classifier.
//!
//! Hand-gesture replies carry a `gesture_name`; head-pose replies carry a
//! `direction`. Both are parsed leniently: a name the pipeline does not
//! know becomes [`GestureLabel::Unknown`] rather than a decode failure, so
//! a classifier upgrade that adds labels never takes the channel down.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A hand gesture recognised by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GestureLabel {
    /// All fingers closed.
    Fist,
    /// All fingers extended.
    OpenHand,
    /// Only the index finger extended.
    Pointing,
    /// Index and middle fingers extended.
    Peace,
    /// Only the thumb extended.
    ThumbsUp,
    /// Thumb and pinky extended.
    Pinky,
    /// Index and pinky extended.
    Rock,
    /// Index, middle and ring extended.
    Three,
    /// All fingers except the thumb extended.
    Four,
    /// Thumb and index extended.
    Ok,
    /// No hand in frame.
    NoHand,
    /// A hand was seen but matched no known shape.
    Unknown,
}

impl GestureLabel {
    /// Parse a wire `gesture_name`. Unrecognised names map to
    /// [`GestureLabel::Unknown`].
    pub fn from_wire(name: &str) -> Self {
        match name {
            "fist" => Self::Fist,
            "open_hand" => Self::OpenHand,
            "pointing" => Self::Pointing,
            "peace" => Self::Peace,
            "thumbs_up" => Self::ThumbsUp,
            "pinky" => Self::Pinky,
            "rock" => Self::Rock,
            "three" => Self::Three,
            "four" => Self::Four,
            "ok" => Self::Ok,
            "no_hand" => Self::NoHand,
            _ => Self::Unknown,
        }
    }

    /// The wire name of this label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fist => "fist",
            Self::OpenHand => "open_hand",
            Self::Pointing => "pointing",
            Self::Peace => "peace",
            Self::ThumbsUp => "thumbs_up",
            Self::Pinky => "pinky",
            Self::Rock => "rock",
            Self::Three => "three",
            Self::Four => "four",
            Self::Ok => "ok",
            Self::NoHand => "no_hand",
            Self::Unknown => "unknown",
        }
    }
}

/// Head direction reported by the face classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PoseDirection {
    /// Nose above the eye line.
    Up,
    /// Nose below the eye line.
    Down,
    /// Head turned left.
    Left,
    /// Head turned right.
    Right,
    /// Facing the camera.
    Center,
    /// No face in frame.
    NoFace,
}

impl PoseDirection {
    /// Parse a wire `direction`. Unrecognised values map to
    /// [`PoseDirection::Center`], which steers nothing.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "no_face" => Self::NoFace,
            _ => Self::Center,
        }
    }

    /// The wire name of this direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
            Self::NoFace => "no_face",
        }
    }
}

/// The label carried by a classification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Label {
    /// A hand gesture.
    Gesture(GestureLabel),
    /// A head pose.
    Pose(PoseDirection),
}

impl Label {
    /// The wire name of the underlying label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gesture(g) => g.as_str(),
            Self::Pose(p) => p.as_str(),
        }
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
