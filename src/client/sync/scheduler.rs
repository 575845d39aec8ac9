//! # Sync Scheduler
//!
//! Owns the persisted last-sync time and the minimum-interval rule. The
//! periodic timer only proposes syncs; this guard decides whether enough
//! time has passed since the last credited one.

use crate::client::local_db::{keys, load_json, save_json, KeyValueStore};
use crate::shared::error::SyncError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct SyncScheduler {
    store: Arc<dyn KeyValueStore>,
    /// Minimum time between credited syncs
    min_interval: Duration,
    /// Last credited sync
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

impl SyncScheduler {
    pub fn new(store: Arc<dyn KeyValueStore>, min_interval: Duration) -> Self {
        Self {
            store,
            min_interval,
            last_sync: RwLock::new(None),
        }
    }

    /// Restore the last sync time. Unreadable values are treated as "never
    /// synced" for this session.
    pub async fn load(&self) {
        let loaded = match load_json::<DateTime<Utc>>(self.store.as_ref(), keys::LAST_SYNC_TIME).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read last sync time, treating as never synced");
                None
            }
        };
        *self.last_sync.write().await = loaded;
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().await
    }

    /// Whether the minimum interval has elapsed at `now`
    pub async fn should_sync(&self, now: DateTime<Utc>) -> bool {
        match *self.last_sync.read().await {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= self.min_interval,
                // Last sync recorded in the future (clock moved back).
                Err(_) => false,
            },
        }
    }

    /// Time left before the interval guard opens
    pub async fn time_until_next_sync(&self, now: DateTime<Utc>) -> Duration {
        match *self.last_sync.read().await {
            None => Duration::ZERO,
            Some(last) => {
                let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
                self.min_interval.saturating_sub(elapsed)
            }
        }
    }

    /// Credit a successful sync. The in-memory value is updated even when
    /// persisting fails; the error is returned for the caller to report.
    pub async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), SyncError> {
        *self.last_sync.write().await = Some(at);
        save_json(self.store.as_ref(), keys::LAST_SYNC_TIME, &at).await
    }
}
