//! Level-held relay output (source valves, pool pump, UV light).
//!
//! Switching is idempotent: re-asserting the current level performs no GPIO
//! write, which spares the relay contacts needless clicks.
//!
//! ## Dual-target design
//!
//! Generic over any `embedded_hal` output pin: an ESP-IDF `PinDriver` on
//! target, a [`SimPin`](super::sim::SimPin) on host/test.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct Relay<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    /// Wrap `pin` and drive it low so the tracked state matches the hardware.
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            log::warn!("Relay: initial set_low failed");
        }
        Self { pin, on: false }
    }

    pub fn turn_on(&mut self) -> Result<(), ActuatorError> {
        self.set(true)
    }

    pub fn turn_off(&mut self) -> Result<(), ActuatorError> {
        self.set(false)
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        if self.on == on {
            return Ok(());
        }
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        res.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
