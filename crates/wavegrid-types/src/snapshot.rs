//! Render snapshots and connection state.
//!
//! Snapshots are immutable copies of simulation state handed to a render
//! sink. The sink decides how to paint them; it never writes back.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::{Cell, Direction, Point};

/// Lifecycle phase of the grid game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GamePhase {
    /// Waiting for the first start.
    Idle,
    /// Ticking.
    Running,
    /// Ended; needs an explicit restart.
    Over,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EndReason {
    /// The head left the grid.
    Wall,
    /// The head ran into the body.
    SelfCollision,
    /// The creature fills the grid; no cell is left for food.
    BoardFull,
}

/// A point-in-time copy of the grid game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameSnapshot {
    /// Number of ticks executed since the last start.
    pub tick: u64,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Creature body, head first.
    pub segments: Vec<Cell>,
    /// Committed heading.
    pub heading: Direction,
    /// Current food cell.
    pub food: Cell,
    /// Score so far.
    pub score: u32,
    /// Current inter-tick delay in milliseconds.
    pub tempo_ms: u64,
    /// Set once `phase` is [`GamePhase::Over`].
    pub end_reason: Option<EndReason>,
    /// Grid width in cells.
    pub grid_width: i32,
    /// Grid height in cells.
    pub grid_height: i32,
}

/// Whether a stroke lays down ink or removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StrokeKind {
    /// Paint with the active colour.
    Ink,
    /// Remove whatever is under the stroke.
    Erase,
}

/// One straight stroke segment on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stroke {
    /// Start point.
    pub from: Point,
    /// End point.
    pub to: Point,
    /// Palette index active when the stroke was drawn.
    pub color_index: usize,
    /// Ink or eraser.
    pub kind: StrokeKind,
    /// Line width in canvas pixels.
    pub width: f32,
}

/// A point-in-time copy of the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DrawingSnapshot {
    /// Strokes in the order they were drawn.
    pub strokes: Vec<Stroke>,
    /// Index into `palette` of the active colour.
    pub active_color_index: usize,
    /// Palette as CSS hex colours.
    pub palette: Vec<String>,
    /// Whether a stroke is in progress.
    pub cursor_down: bool,
    /// Last traced point of the stroke in progress.
    pub last_point: Option<Point>,
    /// Canvas width in pixels.
    pub canvas_width: f32,
    /// Canvas height in pixels.
    pub canvas_height: f32,
}

/// State of the duplex channel as seen by the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ConnectionState {
    /// No channel.
    Closed,
    /// Channel open requested, not yet confirmed.
    Connecting,
    /// Channel usable in both directions.
    Open,
}

impl ConnectionState {
    /// The `connected` flag shown to the user.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}
