//! Classification-to-command mapping.
//!
//! The mapper is pure: it reads an event plus the state it needs (the
//! committed heading, or the cursor position) and returns commands. It
//! never touches simulation state.
//!
//! # Grid game
//!
//! | Label | Command |
//! |-------|---------|
//! | `pointing` / pose `up` | `SetDirection(Up)` unless heading `Down` |
//! | `peace` / pose `down` | `SetDirection(Down)` unless heading `Up` |
//! | `thumbs_up` / pose `right` | `SetDirection(Right)` unless heading `Left` |
//! | `rock` / pose `left` | `SetDirection(Left)` unless heading `Right` |
//! | `open_hand` | `SetTempo(fast)` |
//! | `fist` | `SetTempo(slow)` |
//! | pose, mouth open / closed | `SetTempo(fast)` / `SetTempo(default)` |
//!
//! A pose reply steers and sets tempo independently, so it can yield one
//! command per axis.
//!
//! # Drawing surface
//!
//! | Label | Command |
//! |-------|---------|
//! | `pointing` | `DrawAt(cursor)` |
//! | `peace` | `ChangeColor` |
//! | `open_hand` | `ClearAll` |
//! | `fist` | `Erase(cursor)` |
//! | `thumbs_up` | `SaveSnapshot` |
//! | anything else | `LiftPen` |

use tracing::debug;
use wavegrid_types::{
    ClassificationEvent, ControlCommand, Direction, GestureLabel, Label, Point, PoseDirection,
};

use crate::config::{ControlConfig, GameConfig};

/// Commands derived from one event for the grid game, at most one per
/// control axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappedCommands {
    /// Requested heading, already checked against the reversal guard.
    pub heading: Option<Direction>,
    /// Requested inter-tick delay.
    pub tempo_ms: Option<u64>,
}

impl MappedCommands {
    /// Whether the event produced nothing.
    pub const fn is_empty(&self) -> bool {
        self.heading.is_none() && self.tempo_ms.is_none()
    }

    /// The commands in application order: heading first, then tempo.
    pub fn commands(self) -> impl Iterator<Item = ControlCommand> {
        self.heading
            .map(ControlCommand::SetDirection)
            .into_iter()
            .chain(self.tempo_ms.map(ControlCommand::SetTempo))
    }
}

/// Maps classification events to control commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMapper {
    default_tempo_ms: u64,
    fast_tempo_ms: u64,
    slow_tempo_ms: u64,
    min_confidence: f32,
}

impl ControlMapper {
    /// Build a mapper from the game tempos and the confidence gate.
    pub const fn new(game: &GameConfig, control: &ControlConfig) -> Self {
        Self {
            default_tempo_ms: game.default_tempo_ms,
            fast_tempo_ms: game.fast_tempo_ms,
            slow_tempo_ms: game.slow_tempo_ms,
            min_confidence: control.min_confidence,
        }
    }

    fn passes_gate(&self, event: &ClassificationEvent) -> bool {
        if event.confidence < self.min_confidence {
            debug!(
                label = %event.label,
                confidence = event.confidence,
                min = self.min_confidence,
                "event below confidence gate"
            );
            return false;
        }
        true
    }

    /// Map an event for the grid game given the committed heading.
    pub fn map_game(&self, event: &ClassificationEvent, heading: Direction) -> MappedCommands {
        if !self.passes_gate(event) {
            return MappedCommands::default();
        }
        match event.label {
            Label::Gesture(gesture) => self.map_gesture(gesture, heading),
            Label::Pose(pose) => MappedCommands {
                heading: pose_heading(pose).and_then(|want| guarded(want, heading)),
                tempo_ms: event.mouth_open.map(|open| {
                    if open {
                        self.fast_tempo_ms
                    } else {
                        self.default_tempo_ms
                    }
                }),
            },
        }
    }

    fn map_gesture(&self, gesture: GestureLabel, heading: Direction) -> MappedCommands {
        let steer = |want| MappedCommands {
            heading: guarded(want, heading),
            tempo_ms: None,
        };
        let tempo = |ms| MappedCommands {
            heading: None,
            tempo_ms: Some(ms),
        };
        match gesture {
            GestureLabel::Pointing => steer(Direction::Up),
            GestureLabel::Peace => steer(Direction::Down),
            GestureLabel::ThumbsUp => steer(Direction::Right),
            GestureLabel::Rock => steer(Direction::Left),
            GestureLabel::OpenHand => tempo(self.fast_tempo_ms),
            GestureLabel::Fist => tempo(self.slow_tempo_ms),
            _ => MappedCommands::default(),
        }
    }

    /// Map an event for the drawing surface. `cursor` is the point a
    /// drawing or erasing gesture applies to.
    pub fn map_drawing(&self, event: &ClassificationEvent, cursor: Point) -> Option<ControlCommand> {
        if !self.passes_gate(event) {
            return None;
        }
        let command = match event.label {
            Label::Gesture(GestureLabel::Pointing) => ControlCommand::DrawAt(cursor),
            Label::Gesture(GestureLabel::Peace) => ControlCommand::ChangeColor,
            Label::Gesture(GestureLabel::OpenHand) => ControlCommand::ClearAll,
            Label::Gesture(GestureLabel::Fist) => ControlCommand::Erase(cursor),
            Label::Gesture(GestureLabel::ThumbsUp) => ControlCommand::SaveSnapshot,
            _ => ControlCommand::LiftPen,
        };
        Some(command)
    }
}

const fn pose_heading(pose: PoseDirection) -> Option<Direction> {
    match pose {
        PoseDirection::Up => Some(Direction::Up),
        PoseDirection::Down => Some(Direction::Down),
        PoseDirection::Left => Some(Direction::Left),
        PoseDirection::Right => Some(Direction::Right),
        PoseDirection::Center | PoseDirection::NoFace => None,
    }
}

/// The reversal guard: a heading that exactly reverses the committed one
/// is discarded.
fn guarded(want: Direction, heading: Direction) -> Option<Direction> {
    if want.is_opposite(heading) {
        debug!(?want, ?heading, "reversal rejected");
        None
    } else {
        Some(want)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn mapper() -> ControlMapper {
        ControlMapper::new(&GameConfig::default(), &ControlConfig::default())
    }

    fn gesture(label: GestureLabel) -> ClassificationEvent {
        ClassificationEvent {
            label: Label::Gesture(label),
            confidence: 0.9,
            latency_ms: None,
            mouth_open: None,
            received_at: Utc::now(),
        }
    }

    fn pose(direction: PoseDirection, mouth_open: bool) -> ClassificationEvent {
        ClassificationEvent {
            label: Label::Pose(direction),
            confidence: 0.9,
            latency_ms: None,
            mouth_open: Some(mouth_open),
            received_at: Utc::now(),
        }
    }

    const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[test]
    fn steering_gestures_map_to_headings() {
        let m = mapper();
        let cases = [
            (GestureLabel::Pointing, Direction::Up),
            (GestureLabel::Peace, Direction::Down),
            (GestureLabel::ThumbsUp, Direction::Right),
            (GestureLabel::Rock, Direction::Left),
        ];
        for (label, want) in cases {
            // A perpendicular heading, so the reversal guard never applies.
            let heading = match want {
                Direction::Left | Direction::Right => Direction::Up,
                Direction::Up | Direction::Down => Direction::Left,
            };
            let out = m.map_game(&gesture(label), heading);
            assert_eq!(out.heading, Some(want), "{label:?}");
            assert_eq!(out.tempo_ms, None);
        }
    }

    #[test]
    fn reversal_guard_never_emits_opposite() {
        let m = mapper();
        let steering = [
            GestureLabel::Pointing,
            GestureLabel::Peace,
            GestureLabel::ThumbsUp,
            GestureLabel::Rock,
        ];
        for heading in ALL {
            for label in steering {
                let out = m.map_game(&gesture(label), heading);
                if let Some(next) = out.heading {
                    assert!(!next.is_opposite(heading), "{label:?} while {heading:?}");
                }
            }
            for dir in [
                PoseDirection::Up,
                PoseDirection::Down,
                PoseDirection::Left,
                PoseDirection::Right,
            ] {
                let out = m.map_game(&pose(dir, false), heading);
                if let Some(next) = out.heading {
                    assert!(!next.is_opposite(heading));
                }
            }
        }
    }

    #[test]
    fn reversal_is_discarded() {
        let out = mapper().map_game(&gesture(GestureLabel::Rock), Direction::Right);
        assert!(out.is_empty());
    }

    #[test]
    fn tempo_gestures() {
        let m = mapper();
        let fast = m.map_game(&gesture(GestureLabel::OpenHand), Direction::Right);
        assert_eq!(fast.tempo_ms, Some(80));
        let slow = m.map_game(&gesture(GestureLabel::Fist), Direction::Right);
        assert_eq!(slow.tempo_ms, Some(200));
    }

    #[test]
    fn unmapped_gestures_do_nothing() {
        let m = mapper();
        for label in [
            GestureLabel::Pinky,
            GestureLabel::Three,
            GestureLabel::NoHand,
            GestureLabel::Unknown,
        ] {
            assert!(m.map_game(&gesture(label), Direction::Right).is_empty());
        }
    }

    #[test]
    fn pose_steers_and_sets_tempo() {
        let m = mapper();
        let out = m.map_game(&pose(PoseDirection::Up, true), Direction::Right);
        assert_eq!(out.heading, Some(Direction::Up));
        assert_eq!(out.tempo_ms, Some(80));
        let commands: Vec<_> = out.commands().collect();
        assert_eq!(
            commands,
            vec![
                ControlCommand::SetDirection(Direction::Up),
                ControlCommand::SetTempo(80)
            ]
        );

        let out = m.map_game(&pose(PoseDirection::Center, false), Direction::Right);
        assert_eq!(out.heading, None);
        assert_eq!(out.tempo_ms, Some(150));
    }

    #[test]
    fn confidence_gate_blocks_weak_events() {
        let control = ControlConfig {
            min_confidence: 0.95,
        };
        let m = ControlMapper::new(&GameConfig::default(), &control);
        assert!(m.map_game(&gesture(GestureLabel::Pointing), Direction::Right).is_empty());
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::Peace), Point::new(1.0, 1.0)),
            None
        );
    }

    #[test]
    fn drawing_table() {
        let m = mapper();
        let at = Point::new(10.0, 20.0);
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::Pointing), at),
            Some(ControlCommand::DrawAt(at))
        );
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::Peace), at),
            Some(ControlCommand::ChangeColor)
        );
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::OpenHand), at),
            Some(ControlCommand::ClearAll)
        );
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::Fist), at),
            Some(ControlCommand::Erase(at))
        );
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::ThumbsUp), at),
            Some(ControlCommand::SaveSnapshot)
        );
        assert_eq!(
            m.map_drawing(&gesture(GestureLabel::Rock), at),
            Some(ControlCommand::LiftPen)
        );
    }
}
