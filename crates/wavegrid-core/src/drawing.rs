//! Drawing surface state.
//!
//! Unlike the grid game, the drawing surface has no clock: every accepted
//! command is an immediate edit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use wavegrid_types::{ControlCommand, DrawingSnapshot, Point, Stroke, StrokeKind};

use crate::config::DrawingConfig;

/// Supplies the canvas point a drawing or erasing gesture applies to.
pub trait CursorSource: Send {
    /// The next cursor position.
    fn next_point(&mut self) -> Point;
}

/// Placeholder cursor that picks a uniformly random canvas point. Stands
/// in until the classifier reports fingertip coordinates.
#[derive(Debug, Clone)]
pub struct RandomCursor {
    rng: StdRng,
    width: f32,
    height: f32,
}

impl RandomCursor {
    /// Create a cursor over the configured canvas. A seed of `0` draws
    /// from OS entropy.
    pub fn new(config: &DrawingConfig, seed: u64) -> Self {
        let rng = if seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self {
            rng,
            width: config.canvas_width.max(0.0),
            height: config.canvas_height.max(0.0),
        }
    }
}

impl CursorSource for RandomCursor {
    fn next_point(&mut self) -> Point {
        let x = self.rng.random::<f32>() * self.width;
        let y = self.rng.random::<f32>() * self.height;
        Point::new(x, y)
    }
}

/// What applying one command did.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    /// State changed.
    Applied,
    /// The drawing was saved; the snapshot is handed to the screen.
    Saved(DrawingSnapshot),
    /// The command does not apply to the drawing surface.
    Ignored,
}

/// The drawing surface.
#[derive(Debug, Clone)]
pub struct DrawingEngine {
    palette: Vec<String>,
    canvas_width: f32,
    canvas_height: f32,
    ink_width: f32,
    eraser_width: f32,
    strokes: Vec<Stroke>,
    active_color_index: usize,
    cursor_down: bool,
    last_point: Option<Point>,
}

impl DrawingEngine {
    /// Create a blank surface.
    pub fn new(config: &DrawingConfig) -> Self {
        Self {
            palette: config.palette.clone(),
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            ink_width: config.ink_width,
            eraser_width: config.eraser_width,
            strokes: Vec::new(),
            active_color_index: 0,
            cursor_down: false,
            last_point: None,
        }
    }

    fn lift(&mut self) {
        self.cursor_down = false;
        self.last_point = None;
    }

    fn trace(&mut self, to: Point, kind: StrokeKind) {
        if let Some(from) = self.last_point {
            let width = match kind {
                StrokeKind::Ink => self.ink_width,
                StrokeKind::Erase => self.eraser_width,
            };
            self.strokes.push(Stroke {
                from,
                to,
                color_index: self.active_color_index,
                kind,
                width,
            });
        }
    }

    /// Apply one command.
    pub fn apply(&mut self, command: ControlCommand) -> DrawOutcome {
        match command {
            ControlCommand::DrawAt(point) => {
                self.trace(point, StrokeKind::Ink);
                self.last_point = Some(point);
                self.cursor_down = true;
            }
            ControlCommand::Erase(point) => {
                // An eraser only moves from an existing stroke position.
                if self.last_point.is_some() {
                    self.trace(point, StrokeKind::Erase);
                    self.last_point = Some(point);
                }
                self.cursor_down = true;
            }
            ControlCommand::ChangeColor => {
                let len = self.palette.len();
                self.active_color_index = self
                    .active_color_index
                    .saturating_add(1)
                    .checked_rem(len)
                    .unwrap_or(0);
                self.lift();
            }
            ControlCommand::ClearAll => {
                self.strokes.clear();
                self.lift();
            }
            ControlCommand::SaveSnapshot => {
                self.lift();
                let snapshot = self.snapshot();
                debug!(strokes = snapshot.strokes.len(), "drawing saved");
                return DrawOutcome::Saved(snapshot);
            }
            ControlCommand::LiftPen => self.lift(),
            ControlCommand::SetDirection(_) | ControlCommand::SetTempo(_) => {
                return DrawOutcome::Ignored;
            }
        }
        DrawOutcome::Applied
    }

    /// Index of the active palette colour.
    pub const fn active_color_index(&self) -> usize {
        self.active_color_index
    }

    /// Copy the state for rendering.
    pub fn snapshot(&self) -> DrawingSnapshot {
        DrawingSnapshot {
            strokes: self.strokes.clone(),
            active_color_index: self.active_color_index,
            palette: self.palette.clone(),
            cursor_down: self.cursor_down,
            last_point: self.last_point,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DrawingEngine {
        DrawingEngine::new(&DrawingConfig::default())
    }

    #[test]
    fn first_point_starts_a_stroke_without_ink() {
        let mut e = engine();
        assert_eq!(e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0))), DrawOutcome::Applied);
        let snap = e.snapshot();
        assert!(snap.strokes.is_empty());
        assert!(snap.cursor_down);
        assert_eq!(snap.last_point, Some(Point::new(1.0, 1.0)));
    }

    #[test]
    fn consecutive_points_lay_ink() {
        let mut e = engine();
        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        e.apply(ControlCommand::DrawAt(Point::new(5.0, 5.0)));
        let snap = e.snapshot();
        assert_eq!(snap.strokes.len(), 1);
        let stroke = snap.strokes.first().copied();
        assert_eq!(
            stroke,
            Some(Stroke {
                from: Point::new(1.0, 1.0),
                to: Point::new(5.0, 5.0),
                color_index: 0,
                kind: StrokeKind::Ink,
                width: 5.0,
            })
        );
    }

    #[test]
    fn change_color_cycles_and_lifts() {
        let mut e = engine();
        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        for _ in 0..5 {
            e.apply(ControlCommand::ChangeColor);
        }
        assert_eq!(e.active_color_index(), 5);
        e.apply(ControlCommand::ChangeColor);
        assert_eq!(e.active_color_index(), 0);
        let snap = e.snapshot();
        assert!(!snap.cursor_down);
        assert_eq!(snap.last_point, None);
    }

    #[test]
    fn erase_needs_a_previous_point() {
        let mut e = engine();
        e.apply(ControlCommand::Erase(Point::new(3.0, 3.0)));
        let snap = e.snapshot();
        assert!(snap.strokes.is_empty());
        assert_eq!(snap.last_point, None);

        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        e.apply(ControlCommand::Erase(Point::new(3.0, 3.0)));
        let snap = e.snapshot();
        assert_eq!(snap.strokes.len(), 1);
        assert!(snap.strokes.iter().all(|s| s.kind == StrokeKind::Erase));
        assert_eq!(snap.last_point, Some(Point::new(3.0, 3.0)));
    }

    #[test]
    fn clear_removes_everything() {
        let mut e = engine();
        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        e.apply(ControlCommand::DrawAt(Point::new(2.0, 2.0)));
        e.apply(ControlCommand::ClearAll);
        let snap = e.snapshot();
        assert!(snap.strokes.is_empty());
        assert_eq!(snap.last_point, None);
    }

    #[test]
    fn save_returns_snapshot_and_resets_cursor() {
        let mut e = engine();
        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        e.apply(ControlCommand::DrawAt(Point::new(2.0, 2.0)));
        let outcome = e.apply(ControlCommand::SaveSnapshot);
        assert!(matches!(outcome, DrawOutcome::Saved(_)));
        if let DrawOutcome::Saved(snapshot) = outcome {
            assert_eq!(snapshot.strokes.len(), 1);
            assert!(!snapshot.cursor_down);
        }
        // Strokes persist after saving.
        assert_eq!(e.snapshot().strokes.len(), 1);
    }

    #[test]
    fn other_gesture_lifts_pen() {
        let mut e = engine();
        e.apply(ControlCommand::DrawAt(Point::new(1.0, 1.0)));
        e.apply(ControlCommand::LiftPen);
        e.apply(ControlCommand::DrawAt(Point::new(9.0, 9.0)));
        assert!(e.snapshot().strokes.is_empty());
    }

    #[test]
    fn game_commands_are_ignored() {
        let mut e = engine();
        assert_eq!(e.apply(ControlCommand::SetTempo(80)), DrawOutcome::Ignored);
    }

    #[test]
    fn random_cursor_stays_on_canvas() {
        let config = DrawingConfig::default();
        let mut cursor = RandomCursor::new(&config, 5);
        for _ in 0..100 {
            let p = cursor.next_point();
            assert!(p.x >= 0.0 && p.x <= config.canvas_width);
            assert!(p.y >= 0.0 && p.y <= config.canvas_height);
        }
    }
}
