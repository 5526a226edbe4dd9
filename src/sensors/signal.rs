//! Debounced digital panel input.
//!
//! The raw level must hold for [`DEBOUNCE_MS`] before the reported level
//! follows it.  A read error keeps the last reported level.

use embedded_hal::digital::InputPin;
use log::warn;

pub const DEBOUNCE_MS: u64 = 50;

pub struct SignalInput<I> {
    pin: I,
    stable: bool,
    candidate: bool,
    candidate_since_ms: u64,
}

impl<I: InputPin> SignalInput<I> {
    pub fn new(pin: I) -> Self {
        Self {
            pin,
            stable: false,
            candidate: false,
            candidate_since_ms: 0,
        }
    }

    /// Sample the pin and return the debounced level.
    pub fn sample(&mut self, now_ms: u64) -> bool {
        let raw = match self.pin.is_high() {
            Ok(level) => level,
            Err(_) => {
                warn!("SignalInput: read failed, holding last level");
                return self.stable;
            }
        };

        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
        }
        if self.candidate != self.stable
            && now_ms.saturating_sub(self.candidate_since_ms) >= DEBOUNCE_MS
        {
            self.stable = self.candidate;
        }
        self.stable
    }
}
