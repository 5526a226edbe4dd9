//! Error types for the controller firmware.
//!
//! Hardware and storage failures never reach the caller: the supervisors
//! log them and retry on a later tick.  What does surface is a refused
//! command, as [`Error::Rejected`].  All types are `Copy` so they can be
//! passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Error returned by the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A mutating request was refused; nothing was changed.
    Rejected(Rejection),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "rejected: {e}"),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// Why an output could not be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// A pulse is in flight or the inter-pulse quiet period has not elapsed.
    PulseBusy,
    /// Multiplexer address beyond the wired valve outputs.
    InvalidAddress,
    /// Source index beyond the wired source relays.
    InvalidSource,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PulseBusy => write!(f, "pulse busy"),
            Self::InvalidAddress => write!(f, "invalid valve address"),
            Self::InvalidSource => write!(f, "invalid source index"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation rejections
// ---------------------------------------------------------------------------

/// Why a setter refused its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    GroupIndex,
    /// 1–23 must divide 24, ≥24 must be a multiple of 24.
    Period,
    Duration,
    Zones,
    Source,
    TimeOfDay,
    NameTooLong,
    PeriodDays,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupIndex => write!(f, "group index out of range"),
            Self::Period => write!(f, "invalid period"),
            Self::Duration => write!(f, "duration out of bounds"),
            Self::Zones => write!(f, "zone mask out of range"),
            Self::Source => write!(f, "source index out of range"),
            Self::TimeOfDay => write!(f, "time of day out of range"),
            Self::NameTooLong => write!(f, "name too long"),
            Self::PeriodDays => write!(f, "period days must be non-zero"),
        }
    }
}

impl From<Rejection> for Error {
    fn from(e: Rejection) -> Self {
        Self::Rejected(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Pump failsafes.  Accumulated in a bitfield by the recirculation guard
/// so a single run can report every reason it was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// Scheduled end time lies further ahead than any valid run could.
    ImplausibleEndTime = 0b0000_0001,
    /// Pump running but no recirculation flow after the grace period.
    NoRecirculationFlow = 0b0000_0010,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImplausibleEndTime => write!(f, "implausible end time"),
            Self::NoRecirculationFlow => write!(f, "no recirculation flow"),
        }
    }
}
