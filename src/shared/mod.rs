//! Shared Module
//!
//! This module contains types that every layer of the sync core agrees on:
//! the error taxonomy, the sync event union and the application
//! configuration.
//!
//! # Overview
//!
//! The shared module holds no I/O. Its types are serializable where they
//! cross a boundary (events to listeners, configuration from TOML).

/// Sync lifecycle events
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SyncError;
pub use event::SyncEvent;
