//! Multiplexed latching-solenoid valve driver plus the two source relays.
//!
//! ```text
//!   A0..A3 ──▶ ┌──────────┐ ──▶ out 0  zone 0 open
//!              │  4-bit   │ ──▶ out 1  zone 0 close
//!   SIG ─────▶ │   mux    │ ──▶ out 2  zone 1 open
//!              └──────────┘ ──▶ ...
//! ```
//!
//! One pulse at a time: the address is latched, the lines settle for
//! [`MUX_SETTLE_US`], then SIG goes high for [`PULSE_DURATION_MS`].  The
//! caller lowers it with [`ValveActuator::end_pulse`].  A new pulse may only
//! start once [`PULSE_DURATION_MS`] + [`BETWEEN_PULSES_MS`] have passed since
//! the previous one started.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

use crate::config::{SOURCE_COUNT, ZONE_COUNT};
use crate::drivers::relay::Relay;
use crate::error::ActuatorError;

/// Width of one valve pulse.
pub const PULSE_DURATION_MS: u64 = 100;
/// Quiet time after a pulse before the next may start.
pub const BETWEEN_PULSES_MS: u64 = 100;
/// Multiplexer address settle time before SIG is raised.
pub const MUX_SETTLE_US: u32 = 100;

const ADDRESS_LINES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pulse {
    address: u8,
    started_ms: u64,
}

pub struct ValveActuator<P, D> {
    address: [P; ADDRESS_LINES],
    signal: P,
    sources: [Relay<P>; SOURCE_COUNT as usize],
    delay: D,
    pulse: Option<Pulse>,
    last_pulse_start_ms: Option<u64>,
}

impl<P: OutputPin, D: DelayNs> ValveActuator<P, D> {
    pub fn new(
        address: [P; ADDRESS_LINES],
        mut signal: P,
        sources: [P; SOURCE_COUNT as usize],
        delay: D,
    ) -> Self {
        if signal.set_low().is_err() {
            warn!("ValveActuator: could not lower signal line");
        }
        Self {
            address,
            signal,
            sources: sources.map(Relay::new),
            delay,
            pulse: None,
            last_pulse_start_ms: None,
        }
    }

    /// Output that latches `zone` open.
    pub const fn open_address(zone: u8) -> u8 {
        2 * zone
    }

    /// Output that latches `zone` closed.
    pub const fn close_address(zone: u8) -> u8 {
        2 * zone + 1
    }

    // ── Pulses ────────────────────────────────────────────────

    /// No pulse in flight and the inter-pulse quiet period has passed.
    pub fn is_ready(&self, now_ms: u64) -> bool {
        self.pulse.is_none()
            && self
                .last_pulse_start_ms
                .is_none_or(|t| now_ms.saturating_sub(t) >= PULSE_DURATION_MS + BETWEEN_PULSES_MS)
    }

    pub fn open_zone(&mut self, zone: u8, now_ms: u64) -> Result<(), ActuatorError> {
        self.pulse(Self::open_address(zone), now_ms)
    }

    pub fn close_zone(&mut self, zone: u8, now_ms: u64) -> Result<(), ActuatorError> {
        self.pulse(Self::close_address(zone), now_ms)
    }

    /// Select `address` and raise the signal line.
    pub fn pulse(&mut self, address: u8, now_ms: u64) -> Result<(), ActuatorError> {
        if !self.is_ready(now_ms) {
            return Err(ActuatorError::PulseBusy);
        }
        if address >= 2 * ZONE_COUNT {
            return Err(ActuatorError::InvalidAddress);
        }

        for (bit, line) in self.address.iter_mut().enumerate() {
            let state = PinState::from(address & (1 << bit) != 0);
            line.set_state(state)
                .map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        self.delay.delay_us(MUX_SETTLE_US);
        self.signal
            .set_high()
            .map_err(|_| ActuatorError::GpioWriteFailed)?;

        self.pulse = Some(Pulse {
            address,
            started_ms: now_ms,
        });
        self.last_pulse_start_ms = Some(now_ms);
        Ok(())
    }

    pub fn pulse_active(&self) -> bool {
        self.pulse.is_some()
    }

    /// Address of the pulse in flight.
    pub fn active_pulse(&self) -> Option<u8> {
        self.pulse.map(|p| p.address)
    }

    /// The pulse in flight has been high for its full width.
    pub fn pulse_elapsed(&self, now_ms: u64) -> bool {
        self.pulse
            .is_some_and(|p| now_ms.saturating_sub(p.started_ms) >= PULSE_DURATION_MS)
    }

    /// Lower the signal line.  On failure the pulse stays marked active so
    /// the next tick retries before anything else moves.
    pub fn end_pulse(&mut self) -> Result<(), ActuatorError> {
        self.signal
            .set_low()
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.pulse = None;
        Ok(())
    }

    // ── Sources ───────────────────────────────────────────────

    pub fn set_source(&mut self, index: u8, on: bool) -> Result<(), ActuatorError> {
        self.sources
            .get_mut(index as usize)
            .ok_or(ActuatorError::InvalidSource)?
            .set(on)
    }

    pub fn source_on(&self, index: u8) -> bool {
        self.sources.get(index as usize).is_some_and(Relay::is_on)
    }

    /// De-energize every source, reporting the first failure.
    pub fn sources_off(&mut self) -> Result<(), ActuatorError> {
        let mut result = Ok(());
        for relay in &mut self.sources {
            if let Err(e) = relay.turn_off() {
                result = result.and(Err(e));
            }
        }
        result
    }
}
