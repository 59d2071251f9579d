//! Fixed-rate frame sampling.
//!
//! The throttle wakes once per period, takes the newest captured frame,
//! encodes it and offers it to the transport. It never queues: a missing
//! frame, a closed channel or a busy writer all just skip this period.
//! Missed periods (a slow encode, a stalled runtime) are skipped rather
//! than replayed in a burst.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, EncodedFrame, FrameSource, RawFrame, encode_jpeg};
use crate::config::CaptureProfile;
use crate::control::ScreenControl;
use crate::transport::{FrameSender, SendOutcome};

/// Per-run frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Frames handed to the transport.
    pub sent: u64,
    /// Frames dropped because the writer was busy.
    pub dropped: u64,
    /// Periods with no captured frame.
    pub skipped_no_frame: u64,
    /// Periods where the channel was not open.
    pub skipped_closed: u64,
    /// Frames that failed to load or encode.
    pub failed: u64,
}

/// Samples a [`FrameSource`] at a fixed period.
#[derive(Debug)]
pub struct FrameThrottle {
    profile: CaptureProfile,
    stats: ThrottleStats,
    source_warned: bool,
}

impl FrameThrottle {
    /// Create a throttle for one capture profile.
    pub const fn new(profile: CaptureProfile) -> Self {
        Self {
            profile,
            stats: ThrottleStats {
                sent: 0,
                dropped: 0,
                skipped_no_frame: 0,
                skipped_closed: 0,
                failed: 0,
            },
            source_warned: false,
        }
    }

    /// Encode one raw frame at the profile's quality.
    pub fn emit(&self, frame: &RawFrame) -> Result<EncodedFrame, CaptureError> {
        encode_jpeg(frame, self.profile.quality)
    }

    /// Counters so far.
    pub const fn stats(&self) -> ThrottleStats {
        self.stats
    }

    /// One sampling period.
    pub fn sample(&mut self, source: &mut dyn FrameSource, sender: &FrameSender) {
        if !sender.is_open() {
            self.stats.skipped_closed = self.stats.skipped_closed.saturating_add(1);
            return;
        }
        let frame = match source.latest() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.stats.skipped_no_frame = self.stats.skipped_no_frame.saturating_add(1);
                return;
            }
            Err(e) => {
                // Warn once per run; the source may come back.
                if !self.source_warned {
                    warn!(error = %e, "capture source failed, skipping frames");
                    self.source_warned = true;
                }
                self.stats.failed = self.stats.failed.saturating_add(1);
                return;
            }
        };
        let encoded = match self.emit(&frame) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "frame encode failed");
                self.stats.failed = self.stats.failed.saturating_add(1);
                return;
            }
        };
        match sender.try_send(&encoded) {
            SendOutcome::Sent => {
                self.stats.sent = self.stats.sent.saturating_add(1);
                debug!(bytes = encoded.jpeg_bytes, "frame sent");
            }
            SendOutcome::Dropped => self.stats.dropped = self.stats.dropped.saturating_add(1),
            SendOutcome::NotOpen => {
                self.stats.skipped_closed = self.stats.skipped_closed.saturating_add(1);
            }
        }
    }

    /// Sample until `control` requests a stop. Returns the counters.
    pub async fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sender: &FrameSender,
        control: &ScreenControl,
    ) -> ThrottleStats {
        let period = Duration::from_millis(self.profile.interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_ms = self.profile.interval_ms,
            quality = self.profile.quality,
            "frame throttle started"
        );

        loop {
            tokio::select! {
                biased;
                () = control.stopped() => break,
                _ = interval.tick() => self.sample(source, sender),
            }
        }

        info!(
            sent = self.stats.sent,
            dropped = self.stats.dropped,
            skipped_no_frame = self.stats.skipped_no_frame,
            skipped_closed = self.stats.skipped_closed,
            failed = self.stats.failed,
            "frame throttle stopped"
        );
        self.stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use wavegrid_types::{Session, SessionKind};

    use super::*;
    use crate::capture::WatchSource;
    use crate::transport::{Connector, MemoryPeer, TransportSession, memory};

    const PROFILE: CaptureProfile = CaptureProfile {
        interval_ms: 200,
        quality: 70,
    };

    async fn open() -> (TransportSession, MemoryPeer) {
        let (connector, peer) = memory::pair(64);
        let (events, _rx) = mpsc::channel(1);
        let transport = Connector::Memory(connector)
            .open(&Session::new(SessionKind::Detect), events)
            .await
            .unwrap();
        (transport, peer)
    }

    #[tokio::test]
    async fn missing_frame_is_silent_skip() {
        let (transport, _peer) = open().await;
        let (_tx, mut source) = WatchSource::channel();
        let mut throttle = FrameThrottle::new(PROFILE);
        throttle.sample(&mut source, &transport.sender());
        assert_eq!(throttle.stats().skipped_no_frame, 1);
        assert_eq!(throttle.stats().sent, 0);
    }

    #[tokio::test]
    async fn closed_transport_is_skip() {
        let (mut transport, _peer) = open().await;
        let sender = transport.sender();
        transport.close();
        let (tx, mut source) = WatchSource::channel();
        tx.send_replace(Some(Arc::new(RawFrame::solid(4, 4, [1, 2, 3]))));
        let mut throttle = FrameThrottle::new(PROFILE);
        throttle.sample(&mut source, &sender);
        assert_eq!(throttle.stats().skipped_closed, 1);
    }

    #[tokio::test]
    async fn busy_writer_drops() {
        let (transport, _peer) = open().await;
        let (tx, mut source) = WatchSource::channel();
        tx.send_replace(Some(Arc::new(RawFrame::solid(4, 4, [1, 2, 3]))));
        let mut throttle = FrameThrottle::new(PROFILE);
        let sender = transport.sender();
        throttle.sample(&mut source, &sender);
        throttle.sample(&mut source, &sender);
        assert_eq!(throttle.stats().sent, 1);
        assert_eq!(throttle.stats().dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_frame_per_period() {
        let (transport, mut peer) = open().await;
        let (tx, source) = WatchSource::channel();
        tx.send_replace(Some(Arc::new(RawFrame::solid(8, 8, [5, 5, 5]))));
        let control = Arc::new(ScreenControl::new());

        let handle = {
            let control = Arc::clone(&control);
            let sender = transport.sender();
            tokio::spawn(async move {
                let mut source = source;
                let mut throttle = FrameThrottle::new(PROFILE);
                throttle.run(&mut source, &sender, &control).await
            })
        };

        // Ticks at 0, 200, 400, 600, 800 and 1000 ms.
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        control.request_stop();
        let stats = handle.await.unwrap();

        assert_eq!(stats.sent, 6);
        assert_eq!(stats.dropped, 0);
        let mut received = 0;
        while peer.frames.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 6);
    }
}
