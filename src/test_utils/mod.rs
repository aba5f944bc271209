//! Test utilities for use case and HTTP tests.
//!
//! This module provides:
//! - Test data factories for creating valid catalog and ledger fixtures
//! - An in-memory admission store standing in for Postgres
//! - Recording doubles for the gateway and the notifier
//! - `TestAppStateBuilder` for exercising routes with `axum_test`

mod admission_mocks;
mod app_state_builder;
mod factories;

pub use admission_mocks::*;
pub use app_state_builder::*;
pub use factories::*;
