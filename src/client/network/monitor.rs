//! # Network Monitor
//!
//! Reads the latest platform network snapshot and classifies it. Also
//! delivers a freshly classified [`ConnectionInfo`] to subscribers on every
//! network-state transition.

use super::{ConnectionInfo, NetworkSnapshot};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Platform network-state capability
pub trait NetworkSource: Send + Sync {
    /// Latest snapshot, without blocking
    fn snapshot(&self) -> NetworkSnapshot;
    /// Receiver notified on every transition
    fn watch(&self) -> watch::Receiver<NetworkSnapshot>;
}

/// [`NetworkSource`] fed by whoever owns the platform bridge
#[derive(Debug)]
pub struct WatchNetworkSource {
    tx: watch::Sender<NetworkSnapshot>,
}

impl WatchNetworkSource {
    pub fn new(initial: NetworkSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a new platform snapshot
    pub fn update(&self, snapshot: NetworkSnapshot) {
        self.tx.send_replace(snapshot);
    }
}

impl NetworkSource for WatchNetworkSource {
    fn snapshot(&self) -> NetworkSnapshot {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<NetworkSnapshot> {
        self.tx.subscribe()
    }
}

/// Connection classifier over a [`NetworkSource`]
#[derive(Clone)]
pub struct NetworkMonitor {
    source: Arc<dyn NetworkSource>,
}

impl NetworkMonitor {
    pub fn new(source: Arc<dyn NetworkSource>) -> Self {
        Self { source }
    }

    /// Classify the current snapshot
    pub fn check_connection(&self) -> ConnectionInfo {
        ConnectionInfo::from_snapshot(&self.source.snapshot())
    }

    /// Invoke `callback` on every network-state transition.
    ///
    /// Must be called from within a tokio runtime. A panicking callback is
    /// logged and the subscription stays alive.
    pub fn subscribe<F>(&self, callback: F) -> NetworkSubscription
    where
        F: Fn(ConnectionInfo) + Send + Sync + 'static,
    {
        let mut rx = self.source.watch();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let info = ConnectionInfo::from_snapshot(&rx.borrow_and_update());
                let delivered = AssertUnwindSafe(async { callback(info) })
                    .catch_unwind()
                    .await;
                if delivered.is_err() {
                    tracing::error!("Network change callback panicked");
                }
            }
            tracing::debug!("Network source closed, subscription ended");
        });
        NetworkSubscription {
            handle: Mutex::new(Some(handle)),
        }
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor").finish_non_exhaustive()
    }
}

/// Handle to a network-change subscription; dropping it unsubscribes
#[derive(Debug)]
pub struct NetworkSubscription {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkSubscription {
    /// Stop delivering changes. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        match self.handle.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(_) => false,
        }
    }
}

impl Drop for NetworkSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
