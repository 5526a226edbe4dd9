//! Host-side simulated GPIO for tests and off-target runs.
//!
//! [`SimPin`] clones share one level, so a test can keep a handle to a pin
//! it has moved into a driver and observe or drive it from outside.

use core::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

#[derive(Debug, Default)]
struct PinCell {
    high: Cell<bool>,
    writes: Cell<u32>,
    fail: Cell<bool>,
}

/// Shared-level GPIO usable as both input and output.
#[derive(Debug, Clone, Default)]
pub struct SimPin(Rc<PinCell>);

/// Write failure injected with [`SimPin::fail_writes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set_high(&self) -> bool {
        self.0.high.get()
    }

    /// Drive the level from outside, as a panel switch would.
    pub fn drive(&self, high: bool) {
        self.0.high.set(high);
    }

    /// Number of successful writes through the output interface.
    pub fn write_count(&self) -> u32 {
        self.0.writes.get()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.0.fail.set(fail);
    }

    fn write(&self, high: bool) -> Result<(), SimPinError> {
        if self.0.fail.get() {
            return Err(SimPinError);
        }
        self.0.high.set(high);
        self.0.writes.set(self.0.writes.get() + 1);
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.high.get())
    }
}

/// Delay that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
