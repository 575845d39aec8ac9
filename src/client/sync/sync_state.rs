//! # Sync State
//!
//! Snapshot of the orchestrator published to callers. `is_syncing` lives
//! only in memory; the last sync time mirrors the persisted value.

use crate::client::network::NetworkStatus;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Message of the most recent failed cycle, cleared on success
    pub last_error: Option<String>,
    pub network_status: NetworkStatus,
    pub auto_sync_enabled: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            is_syncing: false,
            last_sync_time: None,
            last_error: None,
            network_status: NetworkStatus::Offline,
            auto_sync_enabled: true,
        }
    }
}

impl SyncState {
    /// Human-readable last sync time in the local timezone
    pub fn last_sync_display(&self) -> String {
        match self.last_sync_time {
            Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            None => "Never".to_string(),
        }
    }
}
