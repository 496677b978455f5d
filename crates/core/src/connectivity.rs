//! Connectivity signal.
//!
//! The embedding application reports online/offline transitions into a
//! [`ConnectivityMonitor`]; sync components only see the
//! [`ConnectivityProbe`] trait. The reported state is treated as ground
//! truth: there is no heartbeat or active probing.

use tokio::sync::watch;

/// Read side of the connectivity signal.
pub trait ConnectivityProbe: Send + Sync {
    /// Synchronous "is currently online" query.
    fn is_online(&self) -> bool;

    /// Subscribe to online/offline transitions.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity state backed by a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    /// Record a connectivity change.
    ///
    /// Subscribers are only woken when the value actually changes.
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityProbe for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
