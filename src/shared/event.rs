//! Sync Event System
//!
//! Events emitted by the sync orchestrator to its listeners. Events are
//! ephemeral: they are delivered to whoever is subscribed at emit time and
//! never stored.

use crate::shared::error::SyncError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle event of one sync cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A cycle has entered the syncing state
    Started,
    /// Every sub-task finished and the last sync time was recorded
    Completed {
        /// Time credited as the last successful sync
        timestamp: DateTime<Utc>,
    },
    /// The cycle finished with at least one failure
    Error {
        /// What went wrong
        #[serde(serialize_with = "serialize_error")]
        error: SyncError,
    },
}

impl SyncEvent {
    /// Create a completed event stamped now
    pub fn completed_now() -> Self {
        Self::Completed {
            timestamp: Utc::now(),
        }
    }

    /// Create an error event
    pub fn error(error: SyncError) -> Self {
        Self::Error { error }
    }

    /// Short status label (`started`, `completed`, `error`)
    pub fn status(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends a cycle
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }
}

fn serialize_error<S>(error: &SyncError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&error.to_string())
}
