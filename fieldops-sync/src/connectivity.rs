//! Connectivity signal.
//!
//! A watch channel wrapping the platform's "am I online" state. The
//! platform layer drives [`Connectivity::set_online`]; the session
//! subscribes and schedules a replay pass on every offline-to-online
//! transition.

use std::sync::Arc;
use tokio::sync::watch;

/// Readable online/offline state with transition notifications.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Creates a connectivity signal with the given initial state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Updates the state. No-op notification-wise if unchanged.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}
