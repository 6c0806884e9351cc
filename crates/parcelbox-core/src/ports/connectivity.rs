//! Connectivity port - オンライン/オフラインの signal

use tokio::sync::watch;

/// Platform-reported connectivity.
///
/// `subscribe` yields a receiver whose value changes once per actual
/// transition (`true` = online).
pub trait ConnectivitySignal: Send + Sync {
    fn is_online(&self) -> bool;

    fn subscribe(&self) -> watch::Receiver<bool>;
}
