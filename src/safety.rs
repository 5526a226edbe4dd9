//! Pool pump failsafes and the UV interlock.
//!
//! The guard runs **every scheduled-run tick after the normal stop checks**
//! and latches a fault bitmask describing why a run was cut short.
//!
//! ## Fault lifecycle
//!
//! 1. A scheduled run starts; [`RecirculationGuard::arm`] clears old faults.
//! 2. Each tick, [`RecirculationGuard::evaluate`] checks the run.
//! 3. On a trip the bit is latched and the caller turns the pump off.
//! 4. The bits stay readable until the next run is armed.
//!
//! The UV interlock is stateless: [`uv_command`] decides from the current
//! readings whether the light must change level.

use log::error;

use crate::config::PoolConfig;
use crate::error::SafetyFault;
use crate::sensors::flow::FlowMonitor;

/// Timing of the pump run being supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpRun {
    pub turned_on_at: u32,
    pub ends_at: u32,
}

/// Scheduled-run failsafe supervisor.
#[derive(Debug, Default)]
pub struct RecirculationGuard {
    /// Latched fault bitmask.
    faults: u8,
}

impl RecirculationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous run's faults.
    pub fn arm(&mut self) {
        self.faults = 0;
    }

    /// Check a running pump.  Returns the first fault that requires the
    /// pump to stop.
    pub fn evaluate(
        &mut self,
        config: &PoolConfig,
        run: PumpRun,
        flow: &FlowMonitor,
        now: u32,
    ) -> Option<SafetyFault> {
        // ── End time further out than any valid run (clock went back) ──
        if run.ends_at.saturating_sub(now) >= u32::from(config.max_scheduled_duration) {
            return Some(self.trip(SafetyFault::ImplausibleEndTime));
        }

        // ── Dry run: no flow after the grace period ──
        let past_grace = now.saturating_sub(run.turned_on_at)
            >= u32::from(config.recirculation_max_turn_on_timeout);
        let flow_lost = flow
            .stopped_for(now)
            .is_some_and(|s| s >= u32::from(config.recirculation_stop_detection_timeout));
        if past_grace && flow_lost {
            return Some(self.trip(SafetyFault::NoRecirculationFlow));
        }

        None
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// Check if a specific fault is latched.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    fn trip(&mut self, fault: SafetyFault) -> SafetyFault {
        error!("SAFETY FAULT SET: {fault}");
        self.faults |= fault.mask();
        fault
    }
}

/// Decide whether the UV light must switch.  `Some(level)` means drive it
/// to `level`; `None` means leave it as is.
///
/// On requires UV enabled, the pump on and flow present for `delay_secs`.
/// Off follows UV disabled, pump off, or flow absent for `delay_secs`.
pub fn uv_command(
    uv_on: bool,
    uv_enable: bool,
    pump_on: bool,
    flow: &FlowMonitor,
    delay_secs: u8,
    now: u32,
) -> Option<bool> {
    let delay = u32::from(delay_secs);
    if uv_on {
        let flow_gone = flow.stopped_for(now).is_some_and(|s| s >= delay);
        (!uv_enable || !pump_on || flow_gone).then_some(false)
    } else {
        let flow_settled = flow.flowing_for(now).is_some_and(|s| s >= delay);
        (uv_enable && pump_on && flow_settled).then_some(true)
    }
}
