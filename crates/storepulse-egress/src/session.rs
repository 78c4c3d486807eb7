//! Session-expiry signalling
//!
//! Session handling belongs to the host application. The egress layer only
//! raises a process-wide signal when the API answers 401 so the host can log
//! the user out in a controlled way.

use tokio::sync::watch;

/// Receives the session-expired signal
pub trait SessionListener: Send + Sync {
    fn session_expired(&self);
}

/// Listener that ignores the signal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSessionListener;

impl SessionListener for NoopSessionListener {
    fn session_expired(&self) {}
}

/// Listener backed by a watch channel; receivers observe `true` once expired
#[derive(Debug)]
pub struct SessionSignal {
    tx: watch::Sender<bool>,
}

impl SessionSignal {
    /// Create the signal and a receiver observing it
    pub fn channel() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn is_expired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clear the flag after the host re-authenticated
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }
}

impl SessionListener for SessionSignal {
    fn session_expired(&self) {
        if !self.tx.send_replace(true) {
            tracing::warn!("API session expired");
        }
    }
}
