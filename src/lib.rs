//! AquaPLC controller library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//!   irrigation ──JobPort──▶ valves ──▶ drivers::valve_actuator
//!   pool ──────────────────────────▶ drivers::relay
//!        ╲                          ╱
//!         app::service::Controller
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod irrigation;
pub mod pins;
pub mod pool;
pub mod safety;
pub mod schedule;
pub mod sensors;
pub mod valves;
