//! Session identifiers.
//!
//! A session binds one screen instance to one duplex channel. The
//! identifier is opaque to every component except the screen that minted
//! it: the gateway only uses it as a routing key and echoes it back in
//! classification replies.
//!
//! Identifiers are `<prefix>_<uuid v7>` where the prefix names the screen
//! kind, which keeps gateway logs readable without a lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// The kind of screen that owns a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SessionKind {
    /// Live gesture readout with no simulation attached.
    Detect,
    /// Grid game steered by hand gestures.
    Snake,
    /// Grid game steered by head pose, mouth open boosts speed.
    Face,
    /// Freehand drawing surface.
    Draw,
}

impl SessionKind {
    /// The prefix used when minting session identifiers for this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Detect => "session",
            Self::Snake => "snake",
            Self::Face => "face",
            Self::Draw => "draw",
        }
    }

    /// Parse a screen name as written in config files and on the command
    /// line (`detect`, `snake`, `face`, `draw`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "detect" => Some(Self::Detect),
            "snake" => Some(Self::Snake),
            "face" => Some(Self::Face),
            "draw" => Some(Self::Draw),
            _ => None,
        }
    }

    /// Whether the classifier for this screen reports head pose rather
    /// than hand gestures.
    pub const fn uses_pose(self) -> bool {
        matches!(self, Self::Face)
    }
}

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh identifier for a screen of the given kind.
    pub fn new(kind: SessionKind) -> Self {
        Self(format!("{}_{}", kind.prefix(), Uuid::now_v7().simple()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A screen's session record. Created once per screen activation and
/// dropped when the screen stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The opaque identifier used as the channel routing key.
    pub id: SessionId,
    /// Which screen owns this session.
    pub kind: SessionKind,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session for a screen of the given kind.
    pub fn new(kind: SessionKind) -> Self {
        Self {
            id: SessionId::new(kind),
            kind,
            created_at: Utc::now(),
        }
    }
}
