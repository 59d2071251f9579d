//! Shared application state for the gateway.
//!
//! [`AppState`] holds the classifier client and a registry of the
//! duplex channels currently attached. The registry is bookkeeping only:
//! each channel replies on its own socket, so nothing routes through it.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use wavegrid_types::SessionId;

use crate::classifier::Classifier;

/// One attached duplex channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    /// Whether frames go to the head-pose classifier.
    pub pose: bool,
    /// When the channel was accepted.
    pub connected_at: DateTime<Utc>,
    /// Frames received on this channel.
    pub frames: u64,
}

/// Attached channels keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, SessionEntry>>,
}

impl SessionRegistry {
    /// Record a newly accepted channel. A reconnect under the same id
    /// replaces the previous entry.
    pub async fn register(&self, id: SessionId, pose: bool) {
        let entry = SessionEntry {
            pose,
            connected_at: Utc::now(),
            frames: 0,
        };
        let mut sessions = self.sessions.write().await;
        if sessions.insert(id.clone(), entry).is_some() {
            debug!(session_id = %id, "session re-registered");
        }
    }

    /// Forget a channel.
    pub async fn unregister(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    /// Count a frame received on a channel.
    pub async fn record_frame(&self, id: &SessionId) {
        if let Some(entry) = self.sessions.write().await.get_mut(id) {
            entry.frames = entry.frames.saturating_add(1);
        }
    }

    /// Number of attached channels.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// The entry for one channel, if attached.
    pub async fn get(&self, id: &SessionId) -> Option<SessionEntry> {
        self.sessions.read().await.get(id).cloned()
    }
}

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    /// The classifier backend.
    pub classifier: Classifier,
    /// Attached duplex channels.
    pub sessions: SessionRegistry,
    started_at: Instant,
}

impl AppState {
    /// Create state around a classifier backend.
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            sessions: SessionRegistry::default(),
            started_at: Instant::now(),
        }
    }

    /// Whole seconds since the gateway started.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
