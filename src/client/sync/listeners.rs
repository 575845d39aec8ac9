//! Observer list for sync events. Each dispatch is isolated: a panicking
//! listener is logged and the remaining listeners are still notified.

use crate::shared::event::SyncEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;
type Slots = Mutex<Vec<(u64, Listener)>>;

#[derive(Default)]
pub struct ListenerRegistry {
    slots: Arc<Slots>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the returned handle removes it
    pub fn add<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.slots).push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            slots: Arc::downgrade(&self.slots),
        }
    }

    /// Deliver `event` to every listener registered at call time
    pub fn notify(&self, event: &SyncEvent) {
        let listeners: Vec<(u64, Listener)> = lock(&self.slots).clone();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(listener = id, status = event.status(), "Sync listener panicked");
            }
        }
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Disposer returned by [`ListenerRegistry::add`]. Dropping the handle
/// keeps the listener registered; call [`ListenerHandle::unsubscribe`].
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: u64,
    slots: Weak<Slots>,
}

impl ListenerHandle {
    /// Remove the listener. Calling it again, or after the registry is
    /// gone, does nothing.
    pub fn unsubscribe(&self) {
        if let Some(slots) = self.slots.upgrade() {
            lock(&slots).retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(slots: &Slots) -> std::sync::MutexGuard<'_, Vec<(u64, Listener)>> {
    // Listeners run outside the lock, so a poisoned lock still holds a
    // consistent list.
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
