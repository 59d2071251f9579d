//! The command loop's view of the one screen it runs.

use tracing::{error, info, warn};
use wavegrid_core::config::WavegridConfig;
use wavegrid_core::transport::{Connector, WebSocketConnector};
use wavegrid_types::SessionKind;

use crate::screen::{ActiveScreen, open_capture};

/// Builds the connector for each new session.
pub type ConnectFn = Box<dyn FnMut(&WavegridConfig) -> Connector + Send>;

/// Connector factory dialling the configured gateway.
pub fn gateway_connector() -> ConnectFn {
    Box::new(|config: &WavegridConfig| {
        Connector::WebSocket(WebSocketConnector::new(
            config.endpoints.gateway_url.clone(),
        ))
    })
}

/// Owns the configuration, the selected mode and at most one screen.
pub struct Host {
    config: WavegridConfig,
    mode: SessionKind,
    connect: ConnectFn,
    active: Option<ActiveScreen>,
}

impl Host {
    pub const fn new(config: WavegridConfig, connect: ConnectFn) -> Self {
        Self {
            mode: config.screen.mode,
            config,
            connect,
            active: None,
        }
    }

    pub const fn config(&self) -> &WavegridConfig {
        &self.config
    }

    /// Open a session if none is usable, then start (or restart) its game.
    /// A session whose channel has dropped is torn down and replaced.
    pub async fn start(&mut self) {
        if self.active.as_ref().is_some_and(|screen| !screen.is_connected()) {
            warn!("gateway channel lost, opening a new session");
            self.stop().await;
        }
        if self.active.is_none() {
            let connector = (self.connect)(&self.config);
            let source = open_capture(&self.config.capture.source_dir);
            match ActiveScreen::start(&self.config, self.mode, connector, source).await {
                Ok(screen) => {
                    info!(session_id = %screen.session().id, "session open");
                    self.active = Some(screen);
                }
                Err(e) => {
                    error!("cannot start screen: {e}");
                    return;
                }
            }
        }
        if let Some(screen) = &self.active {
            screen.restart().await;
        }
    }

    pub async fn stop(&mut self) {
        let Some(screen) = self.active.take() else {
            return;
        };
        match screen.stop().await {
            Ok(stats) => info!(
                sent = stats.sent,
                dropped = stats.dropped,
                "session closed"
            ),
            Err(e) => error!("{e}"),
        }
    }

    pub async fn switch_mode(&mut self, name: &str) {
        let Some(kind) = SessionKind::from_name(name) else {
            warn!(mode = name, "unknown mode");
            return;
        };
        self.stop().await;
        self.mode = kind;
        info!(mode = ?kind, "mode switched");
    }

    pub fn status(&self) {
        match &self.active {
            Some(screen) => info!(
                session_id = %screen.session().id,
                mode = ?self.mode,
                connected = screen.is_connected(),
                "session active"
            ),
            None => info!(mode = ?self.mode, "no active session"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use wavegrid_core::transport::{MemoryConnector, MemoryPeer, memory};

    use super::*;

    fn host(pairs: Vec<MemoryConnector>) -> Host {
        let mut config = WavegridConfig::default();
        config.screen.mode = SessionKind::Snake;
        config.capture.source_dir = "/definitely/not/a/frames/dir".into();
        let mut pending = VecDeque::from(pairs);
        Host::new(
            config,
            Box::new(move |_: &WavegridConfig| Connector::Memory(pending.pop_front().unwrap())),
        )
    }

    fn pairs(n: usize) -> (Vec<MemoryConnector>, Vec<MemoryPeer>) {
        (0..n).map(|_| memory::pair(8)).unzip()
    }

    #[tokio::test]
    async fn start_on_a_live_session_keeps_it() {
        let (connectors, _peers) = pairs(2);
        let mut host = host(connectors);
        host.start().await;
        let first = host.active.as_ref().unwrap().session().id.clone();

        host.start().await;
        assert_eq!(host.active.as_ref().unwrap().session().id, first);
        host.stop().await;
        assert!(host.active.is_none());
    }

    #[tokio::test]
    async fn start_replaces_a_session_whose_channel_dropped() {
        let (connectors, mut peers) = pairs(2);
        let mut host = host(connectors);
        host.start().await;
        let first = host.active.as_ref().unwrap().session().id.clone();

        drop(peers.remove(0));
        let lost = tokio::time::timeout(Duration::from_secs(1), async {
            while host.active.as_ref().unwrap().is_connected() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(lost.is_ok());

        host.start().await;
        let screen = host.active.as_ref().unwrap();
        assert!(screen.is_connected());
        assert_ne!(screen.session().id, first);
        host.stop().await;
    }

    #[tokio::test]
    async fn switching_mode_stops_the_session() {
        let (connectors, _peers) = pairs(1);
        let mut host = host(connectors);
        host.start().await;
        host.switch_mode("draw").await;
        assert!(host.active.is_none());
        assert_eq!(host.mode, SessionKind::Draw);

        host.switch_mode("paint").await;
        assert_eq!(host.mode, SessionKind::Draw);
    }
}
