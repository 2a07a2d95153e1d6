//! VitalVent firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod api;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod mailbox;
pub mod pins;
pub mod safety;
pub mod thresholds;
pub mod vitals;

// Hardware-facing modules; the real implementations inside are guarded by
// cfg attributes so the crate compiles on host targets.
pub mod adapters;
pub mod drivers;
pub mod sensors;
