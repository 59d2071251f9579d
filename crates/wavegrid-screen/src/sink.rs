//! Render sink that reports state through `tracing`.
//!
//! Per-tick snapshots go out at `debug`; score changes, game over,
//! classifications and connection changes at `info`. Saved drawings are
//! written to disk as JSON.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use wavegrid_core::runner::RenderSink;
use wavegrid_types::{
    ClassificationEvent, ConnectionState, DrawingSnapshot, GamePhase, GameSnapshot, Label,
};

use crate::error::ScreenError;

/// Logs snapshots and persists saved drawings.
#[derive(Debug, Clone)]
pub struct LogSink {
    snapshot_dir: PathBuf,
    last_score: u32,
    last_phase: Option<GamePhase>,
    last_stroke_count: usize,
}

impl LogSink {
    /// Create a sink saving drawings under `snapshot_dir`.
    pub const fn new(snapshot_dir: PathBuf) -> Self {
        Self {
            snapshot_dir,
            last_score: 0,
            last_phase: None,
            last_stroke_count: 0,
        }
    }
}

impl RenderSink for LogSink {
    fn on_game(&mut self, snapshot: &GameSnapshot) {
        debug!(
            tick = snapshot.tick,
            length = snapshot.segments.len(),
            heading = ?snapshot.heading,
            tempo_ms = snapshot.tempo_ms,
            "game tick"
        );
        if self.last_phase != Some(snapshot.phase) {
            match snapshot.phase {
                GamePhase::Running => {
                    self.last_score = snapshot.score;
                    info!("game running");
                }
                GamePhase::Over => info!(
                    score = snapshot.score,
                    reason = ?snapshot.end_reason,
                    "game over, type `start` to play again"
                ),
                GamePhase::Idle => {}
            }
            self.last_phase = Some(snapshot.phase);
        }
        if snapshot.score != self.last_score {
            info!(score = snapshot.score, tempo_ms = snapshot.tempo_ms, "food eaten");
            self.last_score = snapshot.score;
        }
    }

    fn on_drawing(&mut self, snapshot: &DrawingSnapshot) {
        let strokes = snapshot.strokes.len();
        if strokes != self.last_stroke_count {
            debug!(
                strokes,
                color = snapshot.active_color_index,
                "drawing updated"
            );
            self.last_stroke_count = strokes;
        }
    }

    fn on_drawing_saved(&mut self, snapshot: &DrawingSnapshot) {
        match save_drawing(&self.snapshot_dir, snapshot) {
            Ok(path) => info!(path = %path.display(), "drawing saved"),
            Err(e) => warn!("drawing not saved: {e}"),
        }
    }

    fn on_classification(&mut self, event: &ClassificationEvent) {
        let label = match event.label {
            Label::Gesture(g) => format!("{g:?}"),
            Label::Pose(p) => format!("{p:?}"),
        };
        info!(
            %label,
            confidence_pct = event.confidence_percent(),
            latency_ms = event.latency_ms,
            mouth_open = event.mouth_open,
            "classification"
        );
    }

    fn on_connection(&mut self, state: ConnectionState) {
        info!(?state, connected = state.is_open(), "gateway connection");
    }
}

/// Write `snapshot` as `drawing_<unix-ms>.json` under `dir`, creating the
/// directory if needed.
pub fn save_drawing(dir: &Path, snapshot: &DrawingSnapshot) -> Result<PathBuf, ScreenError> {
    std::fs::create_dir_all(dir).map_err(|source| ScreenError::Save {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format!("drawing_{}.json", Utc::now().timestamp_millis()));
    let json = serde_json::to_vec_pretty(snapshot)?;
    std::fs::write(&path, json).map_err(|source| ScreenError::Save {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
