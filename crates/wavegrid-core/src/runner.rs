//! Simulation loop runners.
//!
//! Each runner is the single owner of its engine. Everything else talks
//! to it through two bounded channels: lifecycle inputs ([`LoopInput`])
//! and decoded classifications. A shared [`ScreenControl`] stops it.
//!
//! - [`run_game_loop`] -- self-rescheduling grid game. The delay before
//!   each tick is the tempo in effect when the previous tick finished, so
//!   a tempo change never shortens the sleep already in flight.
//! - [`run_drawing_loop`] -- applies each drawing command on arrival.
//! - [`run_readout_loop`] -- no simulation; reports classifications only.

use std::pin::pin;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};
use wavegrid_types::{
    ClassificationEvent, ConnectionState, DrawingSnapshot, GamePhase, GameSnapshot,
};

use crate::control::ScreenControl;
use crate::drawing::{CursorSource, DrawOutcome, DrawingEngine};
use crate::game::{GameEngine, StepOutcome};
use crate::mapper::ControlMapper;

/// Lifecycle input for a simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopInput {
    /// Start, or restart after game over.
    Start,
    /// Leave the loop.
    Stop,
}

/// Receives snapshots and status from the loops. Never mutates state.
pub trait RenderSink: Send {
    /// A new grid game state.
    fn on_game(&mut self, snapshot: &GameSnapshot);

    /// A new drawing state.
    fn on_drawing(&mut self, snapshot: &DrawingSnapshot);

    /// A drawing the user asked to keep.
    fn on_drawing_saved(&mut self, _snapshot: &DrawingSnapshot) {}

    /// A classification arrived; shown with its confidence.
    fn on_classification(&mut self, _event: &ClassificationEvent) {}

    /// The duplex channel changed state.
    fn on_connection(&mut self, _state: ConnectionState) {}
}

/// A sink that discards everything.
pub struct NoOpSink;

impl RenderSink for NoOpSink {
    fn on_game(&mut self, _snapshot: &GameSnapshot) {}
    fn on_drawing(&mut self, _snapshot: &DrawingSnapshot) {}
}

/// Receiving ends feeding one loop.
#[derive(Debug)]
pub struct LoopChannels {
    /// Start/stop requests.
    pub inputs: mpsc::Receiver<LoopInput>,
    /// Decoded classifications.
    pub events: mpsc::Receiver<ClassificationEvent>,
}

/// Why a loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The shared stop signal fired or [`LoopInput::Stop`] arrived.
    Stopped,
    /// The input channel closed.
    InputsClosed,
}

/// Outcome of [`run_game_loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLoopResult {
    /// Why the loop returned.
    pub exit: LoopExit,
    /// Ticks executed across all games.
    pub total_ticks: u64,
    /// Games started.
    pub games_started: u32,
}

enum Wake {
    Stop,
    Input(Option<LoopInput>),
    Event(ClassificationEvent),
    EventsClosed,
    Tick,
}

/// Wait for the next thing a loop must react to. `deadline` is the next
/// tick, if one is scheduled.
async fn next_wake(
    control: &ScreenControl,
    channels: &mut LoopChannels,
    events_open: bool,
    deadline: Option<Instant>,
) -> Wake {
    let tick = pin!(async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    });
    tokio::select! {
        biased;
        () = control.stopped() => Wake::Stop,
        input = channels.inputs.recv() => Wake::Input(input),
        event = channels.events.recv(), if events_open => {
            event.map_or(Wake::EventsClosed, Wake::Event)
        }
        () = tick => Wake::Tick,
    }
}

/// Drive the grid game until stopped.
///
/// Classifications are mapped against the committed heading and offered
/// to the engine as they arrive; the engine keeps only the latest heading
/// and tempo. When the event stream ends the game keeps ticking on the
/// last accepted input.
pub async fn run_game_loop(
    engine: &mut GameEngine,
    mapper: &ControlMapper,
    channels: &mut LoopChannels,
    control: &ScreenControl,
    sink: &mut dyn RenderSink,
) -> GameLoopResult {
    let mut deadline: Option<Instant> = None;
    let mut events_open = true;
    let mut total_ticks: u64 = 0;
    let mut games_started: u32 = 0;

    sink.on_game(&engine.snapshot());

    let exit = loop {
        match next_wake(control, channels, events_open, deadline).await {
            Wake::Stop | Wake::Input(Some(LoopInput::Stop)) => break LoopExit::Stopped,
            Wake::Input(None) => break LoopExit::InputsClosed,
            Wake::Input(Some(LoopInput::Start)) => {
                engine.start();
                games_started = games_started.saturating_add(1);
                sink.on_game(&engine.snapshot());
                deadline = if engine.phase() == GamePhase::Running {
                    Instant::now().checked_add(engine.tempo())
                } else {
                    None
                };
            }
            Wake::Event(event) => {
                sink.on_classification(&event);
                if engine.phase() == GamePhase::Running {
                    for command in mapper.map_game(&event, engine.heading()).commands() {
                        engine.accept(command);
                    }
                }
            }
            Wake::EventsClosed => {
                events_open = false;
                debug!("classification stream ended");
            }
            Wake::Tick => {
                let outcome = engine.step();
                if outcome != StepOutcome::NotRunning {
                    total_ticks = total_ticks.saturating_add(1);
                }
                sink.on_game(&engine.snapshot());
                deadline = match outcome {
                    StepOutcome::Advanced { .. } => Instant::now().checked_add(engine.tempo()),
                    StepOutcome::Ended(_) | StepOutcome::NotRunning => None,
                };
            }
        }
    };

    info!(?exit, total_ticks, games_started, "game loop finished");
    GameLoopResult {
        exit,
        total_ticks,
        games_started,
    }
}

/// Drive the drawing surface until stopped. [`LoopInput::Start`] is
/// accepted but has no effect: the surface is always live.
pub async fn run_drawing_loop(
    engine: &mut DrawingEngine,
    mapper: &ControlMapper,
    cursor: &mut dyn CursorSource,
    channels: &mut LoopChannels,
    control: &ScreenControl,
    sink: &mut dyn RenderSink,
) -> LoopExit {
    let mut events_open = true;
    sink.on_drawing(&engine.snapshot());

    let exit = loop {
        match next_wake(control, channels, events_open, None).await {
            Wake::Stop | Wake::Input(Some(LoopInput::Stop)) => break LoopExit::Stopped,
            Wake::Input(None) => break LoopExit::InputsClosed,
            Wake::Input(Some(LoopInput::Start)) | Wake::Tick => {}
            Wake::EventsClosed => events_open = false,
            Wake::Event(event) => {
                sink.on_classification(&event);
                let Some(command) = mapper.map_drawing(&event, cursor.next_point()) else {
                    continue;
                };
                match engine.apply(command) {
                    DrawOutcome::Applied => sink.on_drawing(&engine.snapshot()),
                    DrawOutcome::Saved(snapshot) => {
                        sink.on_drawing_saved(&snapshot);
                        sink.on_drawing(&snapshot);
                    }
                    DrawOutcome::Ignored => {}
                }
            }
        }
    };

    info!(?exit, "drawing loop finished");
    exit
}

/// Report classifications to the sink until stopped. Used by the live
/// detection screen, which has no simulation attached.
pub async fn run_readout_loop(
    channels: &mut LoopChannels,
    control: &ScreenControl,
    sink: &mut dyn RenderSink,
) -> LoopExit {
    let mut events_open = true;
    loop {
        match next_wake(control, channels, events_open, None).await {
            Wake::Stop | Wake::Input(Some(LoopInput::Stop)) => return LoopExit::Stopped,
            Wake::Input(None) => return LoopExit::InputsClosed,
            Wake::Input(Some(LoopInput::Start)) | Wake::Tick => {}
            Wake::EventsClosed => events_open = false,
            Wake::Event(event) => sink.on_classification(&event),
        }
    }
}
