//! WatchConnectivity - watch channel で online/offline を配る signal

use tokio::sync::watch;
use tracing::debug;

use crate::ports::ConnectivitySignal;

/// Connectivity signal driven by whoever owns it (platform glue, tests, the
/// demo CLI).
///
/// Only real transitions are published; setting the current value again is
/// a no-op for subscribers.
pub struct WatchConnectivity {
    tx: watch::Sender<bool>,
}

impl WatchConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Returns true if the value actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            debug!(online, "connectivity changed");
        }
        changed
    }
}

impl Default for WatchConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivitySignal for WatchConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
