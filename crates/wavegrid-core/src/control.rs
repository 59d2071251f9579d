//! Shared stop signal for one screen activation.
//!
//! A [`ScreenControl`] is created per start and shared (via [`Arc`])
//! between the frame throttle, the simulation loop and whatever owns the
//! session. One call to [`ScreenControl::request_stop`] cancels both
//! timers.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Stop flag plus a wake-up for tasks parked on timers.
#[derive(Debug, Default)]
pub struct ScreenControl {
    stop_requested: AtomicBool,
    stop_notify: Notify,
}

impl ScreenControl {
    /// Create a control in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every task waiting in [`stopped`](Self::stopped).
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested. Returns immediately if it
    /// already was.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }
}
