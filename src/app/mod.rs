//! Application core: pure domain orchestration, zero I/O.
//!
//! This module wires the irrigation and pool supervisors to the valve
//! scheduler and exposes the dispatcher-facing command surface.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
