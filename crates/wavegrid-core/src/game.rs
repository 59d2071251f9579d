//! Grid game state machine.
//!
//! [`GameEngine`] owns the authoritative game state. It is driven by the
//! game loop task, which is the only code holding a mutable reference:
//! commands go through [`GameEngine::accept`], time goes through
//! [`GameEngine::step`].
//!
//! # Tick order
//!
//! 1. Commit the pending heading.
//! 2. Compute the new head.
//! 3. Wall collision ends the game.
//! 4. Collision with any current segment (tail included) ends the game.
//! 5. Prepend the new head.
//! 6. On food: score, optional speed-up, new food. Otherwise drop the tail.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info};
use wavegrid_types::{Cell, ControlCommand, Direction, EndReason, GamePhase, GameSnapshot};

use crate::config::GameConfig;
use crate::food::FoodPlacer;

/// What one call to [`GameEngine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The creature moved; the game goes on.
    Advanced {
        /// Whether food was eaten on this tick.
        ate: bool,
    },
    /// This tick ended the game.
    Ended(EndReason),
    /// The game is not running; nothing happened.
    NotRunning,
}

/// The grid game.
#[derive(Debug, Clone)]
pub struct GameEngine {
    config: GameConfig,
    speed_up_on_food: bool,
    placer: FoodPlacer,
    segments: VecDeque<Cell>,
    heading: Direction,
    pending_heading: Option<Direction>,
    food: Cell,
    score: u32,
    tempo_ms: u64,
    phase: GamePhase,
    tick: u64,
    end_reason: Option<EndReason>,
}

impl GameEngine {
    /// Create an idle game. `speed_up_on_food` enables the progressive
    /// tempo decrease on eating (gesture-steered variant only).
    pub fn new(config: &GameConfig, speed_up_on_food: bool) -> Self {
        let mut engine = Self {
            config: config.clone(),
            speed_up_on_food,
            placer: FoodPlacer::new(config.seed),
            segments: VecDeque::new(),
            heading: Direction::Right,
            pending_heading: None,
            food: Cell::new(0, 0),
            score: 0,
            tempo_ms: config.default_tempo_ms,
            phase: GamePhase::Idle,
            tick: 0,
            end_reason: None,
        };
        engine.reset_layout();
        engine
    }

    fn start_cell(&self) -> Cell {
        Cell::new(self.config.start_x, self.config.start_y)
    }

    /// Put the creature back at the start cell with fresh food. Returns
    /// `false` when no food cell is free.
    fn reset_layout(&mut self) -> bool {
        self.segments.clear();
        self.segments.push_back(self.start_cell());
        self.heading = Direction::Right;
        self.pending_heading = None;
        self.score = 0;
        self.tempo_ms = self.config.default_tempo_ms;
        self.tick = 0;
        self.end_reason = None;
        match self.placer.place(
            self.config.grid_width,
            self.config.grid_height,
            &self.segments,
        ) {
            Some(cell) => {
                self.food = cell;
                true
            }
            None => false,
        }
    }

    /// Start or restart the game from the initial layout.
    pub fn start(&mut self) {
        if self.reset_layout() {
            self.phase = GamePhase::Running;
            info!(
                start = ?self.start_cell(),
                food = ?self.food,
                tempo_ms = self.tempo_ms,
                "game started"
            );
        } else {
            self.finish(EndReason::BoardFull);
        }
    }

    fn finish(&mut self, reason: EndReason) {
        self.phase = GamePhase::Over;
        self.end_reason = Some(reason);
        self.pending_heading = None;
        info!(
            ?reason,
            score = self.score,
            length = self.segments.len(),
            tick = self.tick,
            "game over"
        );
    }

    /// Offer a command. Returns whether it was accepted.
    ///
    /// Commands are ignored unless the game is running. A heading that
    /// exactly reverses the committed heading is rejected; a later
    /// accepted heading replaces an earlier pending one.
    pub fn accept(&mut self, command: ControlCommand) -> bool {
        if self.phase != GamePhase::Running {
            debug!(?command, phase = ?self.phase, "command ignored, game not running");
            return false;
        }
        match command {
            ControlCommand::SetDirection(want) => {
                if want.is_opposite(self.heading) {
                    debug!(?want, heading = ?self.heading, "reversal rejected");
                    return false;
                }
                self.pending_heading = Some(want);
                true
            }
            ControlCommand::SetTempo(ms) if ms > 0 => {
                self.tempo_ms = ms;
                true
            }
            _ => false,
        }
    }

    /// Advance one tick.
    pub fn step(&mut self) -> StepOutcome {
        if self.phase != GamePhase::Running {
            return StepOutcome::NotRunning;
        }
        self.tick = self.tick.saturating_add(1);

        if let Some(next) = self.pending_heading.take() {
            self.heading = next;
        }

        let Some(&head) = self.segments.front() else {
            self.finish(EndReason::SelfCollision);
            return StepOutcome::Ended(EndReason::SelfCollision);
        };
        let new_head = match head.step(self.heading) {
            Some(cell) if cell.within(self.config.grid_width, self.config.grid_height) => cell,
            _ => {
                self.finish(EndReason::Wall);
                return StepOutcome::Ended(EndReason::Wall);
            }
        };
        if self.segments.contains(&new_head) {
            self.finish(EndReason::SelfCollision);
            return StepOutcome::Ended(EndReason::SelfCollision);
        }

        self.segments.push_front(new_head);

        if new_head != self.food {
            self.segments.pop_back();
            return StepOutcome::Advanced { ate: false };
        }

        self.score = self.score.saturating_add(self.config.points_per_food);
        if self.speed_up_on_food && self.tempo_ms > self.config.min_tempo_ms {
            self.tempo_ms = self
                .tempo_ms
                .saturating_sub(self.config.speedup_step_ms)
                .max(self.config.min_tempo_ms);
        }
        match self.placer.place(
            self.config.grid_width,
            self.config.grid_height,
            &self.segments,
        ) {
            Some(cell) => {
                self.food = cell;
                debug!(score = self.score, food = ?cell, tempo_ms = self.tempo_ms, "food eaten");
                StepOutcome::Advanced { ate: true }
            }
            None => {
                self.finish(EndReason::BoardFull);
                StepOutcome::Ended(EndReason::BoardFull)
            }
        }
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Committed heading.
    pub const fn heading(&self) -> Direction {
        self.heading
    }

    /// Current inter-tick delay.
    pub const fn tempo(&self) -> Duration {
        Duration::from_millis(self.tempo_ms)
    }

    /// Copy the state for rendering.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            tick: self.tick,
            phase: self.phase,
            segments: self.segments.iter().copied().collect(),
            heading: self.heading,
            food: self.food,
            score: self.score,
            tempo_ms: self.tempo_ms,
            end_reason: self.end_reason,
            grid_width: self.config.grid_width,
            grid_height: self.config.grid_height,
        }
    }
}
