//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to the panel
//! dispatcher, and so on.

use crate::error::SafetyFault;
use crate::irrigation::IrrigationState;
use crate::pool::PoolState;
use crate::valves::zones::ZoneMask;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller has started.
    Started,

    /// The panel auto-mode switch changed position.
    AutoModeChanged(bool),

    IrrigationStateChanged {
        from: IrrigationState,
        to: IrrigationState,
    },

    PoolStateChanged { from: PoolState, to: PoolState },

    /// The set of zones being actuated changed.
    ValvesChanged { zones: ZoneMask },

    /// A pool pump failsafe cut a scheduled run short.
    PumpFailsafe(SafetyFault),

    /// The wall clock was set; in-flight jobs were cancelled.
    ClockChanged { time: u32 },
}
