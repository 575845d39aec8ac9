//! Shared Error Types
//!
//! This module defines the error taxonomy used across the sync core. Every
//! layer (classification, probing, fetching, sync cycles, persistence)
//! reports failures through [`SyncError`].
//!
//! # Error Categories
//!
//! - `NetworkUnavailable` - no api-capable connectivity for the operation
//! - `ProbeTimeout` - the speed probe exceeded its time bound
//! - `ApiRequestFailed` - non-2xx response, transport or parse failure
//! - `DegradedChannelFailed` - the sms channel could not deliver
//! - `SyncSubtaskFailed` - one per-resource sync sub-task failed
//! - `PersistenceFailed` - key-value storage read or write failure
//!
//! # Usage
//!
//! ```rust
//! use healthsync::shared::error::SyncError;
//!
//! let error = SyncError::api_failed(Some(503), "service unavailable");
//! assert!(error.to_string().contains("503"));
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync + Clone` so they can be carried inside
//! sync events delivered to many listeners.
use thiserror::Error;

/// Errors produced by the adaptive sync core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// No connectivity suitable for the requested operation
    #[error("Network unavailable: {message}")]
    NetworkUnavailable {
        /// Human-readable error message
        message: String,
    },

    /// The speed probe did not finish in time
    #[error("Speed probe timed out after {timeout_ms} ms")]
    ProbeTimeout {
        /// Configured probe timeout
        timeout_ms: u64,
    },

    /// An api request failed (non-2xx, transport failure or bad payload)
    #[error("API request failed{}: {message}", status_suffix(.status))]
    ApiRequestFailed {
        /// HTTP status when a response was received
        status: Option<u16>,
        /// Human-readable error message
        message: String,
    },

    /// The degraded (sms) channel failed
    #[error("Degraded channel failed: {message}")]
    DegradedChannelFailed {
        /// Human-readable error message
        message: String,
    },

    /// A per-resource sync sub-task failed
    #[error("Sync sub-task '{task}' failed: {message}")]
    SyncSubtaskFailed {
        /// Name of the sub-task
        task: String,
        /// Human-readable error message
        message: String,
    },

    /// Durable storage read/write failed
    #[error("Persistence failed: {message}")]
    PersistenceFailed {
        /// Human-readable error message
        message: String,
    },

    /// Caller-supplied data was rejected
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

impl SyncError {
    /// Create a network-unavailable error
    pub fn network_unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
        }
    }

    /// Create an api-request error
    pub fn api_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Create a degraded-channel error
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::DegradedChannelFailed {
            message: message.into(),
        }
    }

    /// Create a sub-task error
    pub fn subtask(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SyncSubtaskFailed {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(err.to_string())
    }
}
