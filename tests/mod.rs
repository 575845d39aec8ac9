//! Test suite for HealthSync
//!
//! This module organizes all tests

#[macro_use]
pub mod common;
