//! Output drivers over `embedded_hal` pins, plus simulated pins for host
//! builds and tests.

pub mod relay;
pub mod sim;
pub mod valve_actuator;
