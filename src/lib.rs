//! PumpGuard firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod eventlog;
pub mod events;
pub mod fault;
pub mod health;
pub mod relay;
pub mod schedule;
pub mod sync;
pub mod telemetry;

mod error;
mod pins;

pub use error::{StoreError, SyncError};

// Adapter and driver implementations; the hardware paths inside are
// cfg-guarded, the simulation paths compile everywhere.
pub mod adapters;
pub mod drivers;
