//! One active screen: a session and the tasks serving it.
//!
//! [`ActiveScreen::start`] opens the duplex channel and spawns three
//! tasks (frame throttle, simulation loop, connection watcher).
//! [`ActiveScreen::stop`] is the single teardown path for all of them.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wavegrid_core::capture::{DirectorySource, FrameSource, WatchSource};
use wavegrid_core::config::WavegridConfig;
use wavegrid_core::control::ScreenControl;
use wavegrid_core::drawing::{DrawingEngine, RandomCursor};
use wavegrid_core::game::GameEngine;
use wavegrid_core::mapper::ControlMapper;
use wavegrid_core::runner::{
    LoopChannels, LoopInput, RenderSink, run_drawing_loop, run_game_loop, run_readout_loop,
};
use wavegrid_core::throttle::{FrameThrottle, ThrottleStats};
use wavegrid_core::transport::{Connector, TransportSession};
use wavegrid_types::{ConnectionState, Session, SessionKind};

use crate::error::ScreenError;
use crate::sink::LogSink;

const EVENT_BUFFER: usize = 16;
const INPUT_BUFFER: usize = 4;

/// Open the configured capture directory. An unavailable or empty
/// directory is reported once and replaced by a source that never has a
/// frame, so the throttle just skips.
pub fn open_capture(dir: &Path) -> Box<dyn FrameSource> {
    match DirectorySource::open(dir) {
        Ok(source) if !source.is_empty() => {
            info!(dir = %dir.display(), frames = source.len(), "capture source ready");
            Box::new(source)
        }
        Ok(_) => {
            warn!(dir = %dir.display(), "capture directory has no frames");
            Box::new(WatchSource::channel().1)
        }
        Err(e) => {
            warn!("capture unavailable: {e}");
            Box::new(WatchSource::channel().1)
        }
    }
}

/// A running screen.
#[derive(Debug)]
pub struct ActiveScreen {
    session: Session,
    control: Arc<ScreenControl>,
    inputs: mpsc::Sender<LoopInput>,
    transport: TransportSession,
    throttle: JoinHandle<ThrottleStats>,
    simulation: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

impl ActiveScreen {
    /// Create a session of `kind`, open its channel through `connector`
    /// and start streaming frames from `source`.
    ///
    /// Games start idle; send [`ActiveScreen::restart`] to play.
    pub async fn start(
        config: &WavegridConfig,
        kind: SessionKind,
        connector: Connector,
        source: Box<dyn FrameSource>,
    ) -> Result<Self, ScreenError> {
        let session = Session::new(kind);
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let transport = connector.open(&session, events_tx).await?;
        info!(session_id = %session.id, ?kind, "screen started");

        let control = Arc::new(ScreenControl::new());
        let sink = LogSink::new(config.drawing.snapshot_dir.clone());
        let watcher = spawn_watcher(transport.subscribe(), sink.clone());

        let throttle = {
            let control = Arc::clone(&control);
            let sender = transport.sender();
            let mut throttle = FrameThrottle::new(config.capture.profile(kind));
            let mut source = source;
            tokio::spawn(async move { throttle.run(source.as_mut(), &sender, &control).await })
        };

        let (inputs, inputs_rx) = mpsc::channel(INPUT_BUFFER);
        let channels = LoopChannels {
            inputs: inputs_rx,
            events,
        };
        let simulation = spawn_simulation(config, kind, channels, Arc::clone(&control), sink);

        Ok(Self {
            session,
            control,
            inputs,
            transport,
            throttle,
            simulation,
            watcher,
        })
    }

    /// The session this screen owns.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the channel is still open.
    pub fn is_connected(&self) -> bool {
        self.transport.state().is_open()
    }

    /// Start the game, or start over after game over.
    pub async fn restart(&self) {
        if self.inputs.send(LoopInput::Start).await.is_err() {
            warn!("simulation loop is gone");
        }
    }

    /// Stop every task and close the channel. Returns the frame counters.
    pub async fn stop(mut self) -> Result<ThrottleStats, ScreenError> {
        self.control.request_stop();
        if self.inputs.send(LoopInput::Stop).await.is_err() {
            debug!("simulation loop already finished");
        }
        self.transport.close();

        let stats = self.throttle.await.map_err(|e| ScreenError::Task {
            message: format!("frame throttle: {e}"),
        })?;
        self.simulation.await.map_err(|e| ScreenError::Task {
            message: format!("simulation loop: {e}"),
        })?;
        self.watcher.await.map_err(|e| ScreenError::Task {
            message: format!("connection watcher: {e}"),
        })?;
        info!(session_id = %self.session.id, "screen stopped");
        Ok(stats)
    }
}

/// Forward connection changes to the sink until the channel closes.
fn spawn_watcher(mut state: watch::Receiver<ConnectionState>, mut sink: LogSink) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = *state.borrow_and_update();
        sink.on_connection(current);
        while current != ConnectionState::Closed {
            if state.changed().await.is_err() {
                break;
            }
            current = *state.borrow_and_update();
            sink.on_connection(current);
        }
    })
}

fn spawn_simulation(
    config: &WavegridConfig,
    kind: SessionKind,
    mut channels: LoopChannels,
    control: Arc<ScreenControl>,
    mut sink: LogSink,
) -> JoinHandle<()> {
    let mapper = ControlMapper::new(&config.game, &config.control);
    match kind {
        SessionKind::Snake | SessionKind::Face => {
            // Only the hand-gesture game speeds up as it grows.
            let mut engine = GameEngine::new(&config.game, kind == SessionKind::Snake);
            tokio::spawn(async move {
                run_game_loop(&mut engine, &mapper, &mut channels, &control, &mut sink).await;
            })
        }
        SessionKind::Draw => {
            let mut engine = DrawingEngine::new(&config.drawing);
            let mut cursor = RandomCursor::new(&config.drawing, config.game.seed);
            tokio::spawn(async move {
                run_drawing_loop(
                    &mut engine,
                    &mapper,
                    &mut cursor,
                    &mut channels,
                    &control,
                    &mut sink,
                )
                .await;
            })
        }
        SessionKind::Detect => tokio::spawn(async move {
            run_readout_loop(&mut channels, &control, &mut sink).await;
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use wavegrid_core::capture::RawFrame;
    use wavegrid_core::transport::memory;

    use super::*;

    fn config() -> WavegridConfig {
        let mut config = WavegridConfig::default();
        config.drawing.snapshot_dir = std::env::temp_dir().join("wavegrid-screen-test");
        config
    }

    #[tokio::test(start_paused = true)]
    async fn detect_screen_streams_at_profile_rate() {
        let (connector, mut peer) = memory::pair(16);
        let (frames, source) = WatchSource::channel();
        frames.send_replace(Some(Arc::new(RawFrame::solid(8, 8, [0, 128, 255]))));

        let screen = ActiveScreen::start(
            &config(),
            SessionKind::Detect,
            Connector::Memory(connector),
            Box::new(source),
        )
        .await
        .unwrap();
        assert!(screen.is_connected());
        assert!(screen.session().id.as_str().starts_with("session_"));

        // Periods start at 0, 200 and 400 ms.
        tokio::time::sleep(Duration::from_millis(450)).await;
        let stats = screen.stop().await.unwrap();
        assert_eq!(stats.sent, 3);

        let mut received = 0;
        while let Ok(Some(_)) =
            tokio::time::timeout(Duration::from_secs(1), peer.frames.recv()).await
        {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn game_screen_stops_cleanly() {
        let (connector, peer) = memory::pair(16);
        let screen = ActiveScreen::start(
            &config(),
            SessionKind::Snake,
            Connector::Memory(connector),
            Box::new(WatchSource::channel().1),
        )
        .await
        .unwrap();
        screen.restart().await;
        peer.replies
            .send(String::from(
                r#"{"gesture_name":"peace","confidence":0.9,"latency_ms":3.0,"session_id":"s"}"#,
            ))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let stats = screen.stop().await.unwrap();
        assert_eq!(stats.sent, 0);
        assert!(stats.skipped_no_frame >= 1);
    }

    #[tokio::test]
    async fn stop_after_channel_loss_still_tears_down() {
        let (connector, peer) = memory::pair(4);
        let screen = ActiveScreen::start(
            &config(),
            SessionKind::Face,
            Connector::Memory(connector),
            Box::new(WatchSource::channel().1),
        )
        .await
        .unwrap();
        let mut state = screen.transport.subscribe();
        drop(peer);
        let lost = tokio::time::timeout(Duration::from_secs(1), async {
            state.wait_for(|s| *s == ConnectionState::Closed).await.is_ok()
        })
        .await;
        assert!(matches!(lost, Ok(true)));
        assert!(!screen.is_connected());

        let stats = screen.stop().await.unwrap();
        assert_eq!(stats.sent, 0);
    }

    #[tokio::test]
    async fn refused_channel_is_transport_error() {
        let (connector, peer) = memory::pair(1);
        drop(peer);
        let result = ActiveScreen::start(
            &config(),
            SessionKind::Draw,
            Connector::Memory(connector),
            Box::new(WatchSource::channel().1),
        )
        .await;
        assert!(matches!(result, Err(ScreenError::Transport { .. })));
    }

    #[test]
    fn missing_capture_dir_falls_back_to_empty_source() {
        let mut source = open_capture(Path::new("/definitely/not/a/frames/dir"));
        assert!(source.latest().unwrap().is_none());
    }
}
