//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A wired `HealthSync` against a wiremock api
//! - Sync event recording
//! - Custom assertion macros

#[macro_use]
pub mod assertions;
pub mod fixtures;

pub use fixtures::*;
