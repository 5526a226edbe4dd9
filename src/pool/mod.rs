//! Pool pump supervisor.
//!
//! Same three states as irrigation, but without a job queue: it drives the
//! recirculation pump relay directly and, independently of its state, the
//! UV disinfection light.
//!
//! ```text
//!   Idle ──switch on, unlocked──▶ Manual ──switch off──▶ Idle
//!   Idle ──schedule due─────────▶ Scheduled
//!                                   │ auto off │ schedule off │ end reached
//!                                   │ implausible end │ no flow
//!                                   ▼
//!                                  Idle
//! ```
//!
//! All times are wall-clock seconds.  Elapsed times saturate at zero so a
//! clock set backwards never wraps into a huge interval.

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::app::ports::{ControlTick, RecordKey, RecordStore};
use crate::config::{PoolConfig, PoolSchedule};
use crate::drivers::relay::Relay;
use crate::error::{Rejection, Result, SafetyFault};
use crate::safety::{PumpRun, RecirculationGuard, uv_command};
use crate::schedule::{SECS_PER_MINUTE, advance_past, pool_period_secs};
use crate::sensors::flow::FlowMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Idle = 0,
    Manual = 1,
    Scheduled = 2,
}

/// Inputs the pool supervisor reads each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolInputs {
    pub manual_switch: bool,
    pub uv_enable: bool,
    pub flow_detected: bool,
}

pub struct PoolSupervisor<P, S> {
    store: S,
    pump: Relay<P>,
    uv: Relay<P>,
    state: PoolState,
    schedule: PoolSchedule,
    config: PoolConfig,
    flow: FlowMonitor,
    guard: RecirculationGuard,
    manual_lock: bool,
    uv_enable_seen: bool,
    turn_on_time: u32,
    turn_off_time: u32,
    last_change: u32,
}

impl<P: OutputPin, S: RecordStore> PoolSupervisor<P, S> {
    pub fn new(store: S, pump: P, uv: P) -> Self {
        let schedule: PoolSchedule = store.load_or_default(RecordKey::PoolSchedule);
        let config: PoolConfig = store.load_or_default(RecordKey::PoolConfig);
        info!(
            "Pool: loaded, schedule {}, next run at {}",
            if schedule.enabled { "on" } else { "off" },
            schedule.next_turn_on_time
        );
        Self {
            store,
            pump: Relay::new(pump),
            uv: Relay::new(uv),
            state: PoolState::Idle,
            schedule,
            config,
            flow: FlowMonitor::new(),
            guard: RecirculationGuard::new(),
            manual_lock: true,
            uv_enable_seen: false,
            turn_on_time: 0,
            turn_off_time: 0,
            last_change: 0,
        }
    }

    // ── Per-tick ──────────────────────────────────────────────

    pub fn run(&mut self, tick: &ControlTick, inputs: PoolInputs) {
        let now = tick.time;
        self.flow.sample(inputs.flow_detected, now);

        match self.state {
            PoolState::Idle => self.idle(tick, inputs),
            PoolState::Manual => self.manual_run(tick, inputs),
            PoolState::Scheduled => self.scheduled_run(tick, inputs),
        }

        if inputs.uv_enable != self.uv_enable_seen {
            self.uv_enable_seen = inputs.uv_enable;
            self.touch(now);
        }
        self.uv_interlock(inputs, now);
    }

    fn idle(&mut self, tick: &ControlTick, inputs: PoolInputs) {
        let now = tick.time;

        // A failed turn-off is retried until the relay confirms.
        if self.pump.is_on() {
            self.pump_off();
        }

        // ── Manual switch ─────────────────────────────────────
        if inputs.manual_switch {
            if !self.manual_lock {
                if self.pump_on(now) {
                    self.transition(PoolState::Manual, now);
                }
                return;
            }
        } else if self.manual_lock {
            self.manual_lock = false;
            self.touch(now);
        }

        // ── Schedule ──────────────────────────────────────────
        let due = tick.auto_mode && self.schedule.enabled && now >= self.schedule.next_turn_on_time;
        if !due {
            return;
        }

        let next = self.schedule.next_turn_on_time;
        let duration = u32::from(self.schedule.duration_minutes) * SECS_PER_MINUTE;
        let on_time = now - next <= u32::from(self.config.max_scheduled_turn_on_timeout);
        let long_enough = duration >= u32::from(self.config.min_scheduled_duration);
        if !on_time {
            warn!("Pool: scheduled run overdue by {}s, skipped", now - next);
        } else if !long_enough {
            warn!("Pool: scheduled duration {duration}s below minimum, skipped");
        } else if self.pump_on(now) {
            self.guard.arm();
            self.turn_off_time = now.saturating_add(duration);
            self.transition(PoolState::Scheduled, now);
        }

        let period = pool_period_secs(self.schedule.period_days);
        self.schedule.next_turn_on_time = advance_past(now, next, period);
        self.save_schedule();
        self.touch(now);
    }

    fn manual_run(&mut self, tick: &ControlTick, inputs: PoolInputs) {
        if !inputs.manual_switch {
            self.pump_off();
            self.transition(PoolState::Idle, tick.time);
        }
    }

    fn scheduled_run(&mut self, tick: &ControlTick, inputs: PoolInputs) {
        let now = tick.time;

        // Switch toggled during a scheduled run must not keep the pump on
        // once the run ends.
        if inputs.manual_switch != self.manual_lock {
            self.manual_lock = inputs.manual_switch;
            self.touch(now);
        }

        if !tick.auto_mode || !self.schedule.enabled || now >= self.turn_off_time {
            self.end_scheduled_run(now);
            return;
        }

        let run = PumpRun {
            turned_on_at: self.turn_on_time,
            ends_at: self.turn_off_time,
        };
        if self.guard.evaluate(&self.config, run, &self.flow, now).is_some() {
            self.end_scheduled_run(now);
        }
    }

    fn end_scheduled_run(&mut self, now: u32) {
        self.pump_off();
        self.transition(PoolState::Idle, now);
    }

    fn uv_interlock(&mut self, inputs: PoolInputs, now: u32) {
        let command = uv_command(
            self.uv.is_on(),
            inputs.uv_enable,
            self.pump.is_on(),
            &self.flow,
            self.config.uv_turn_on_off_delay,
            now,
        );
        let Some(level) = command else {
            return;
        };
        match self.uv.set(level) {
            Ok(()) => {
                info!("Pool: UV {}", if level { "on" } else { "off" });
                self.touch(now);
            }
            Err(e) => error!("Pool: UV switch failed: {e}"),
        }
    }

    /// End a scheduled run on the next tick.  Used when the clock is set.
    pub fn stop_job(&mut self) {
        self.turn_off_time = 0;
    }

    // ── Controller state ──────────────────────────────────────

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn last_change(&self) -> u32 {
        self.last_change
    }

    pub fn manual_lock(&self) -> bool {
        self.manual_lock
    }

    pub fn pump_is_on(&self) -> bool {
        self.pump.is_on()
    }

    pub fn uv_is_on(&self) -> bool {
        self.uv.is_on()
    }

    /// Failsafes tripped by the most recent scheduled run.
    pub fn fault_flags(&self) -> u8 {
        self.guard.faults()
    }

    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.guard.has_fault(fault)
    }

    // ── Schedule ──────────────────────────────────────────────

    pub fn schedule(&self) -> &PoolSchedule {
        &self.schedule
    }

    pub fn is_schedule_enabled(&self) -> bool {
        self.schedule.enabled
    }

    pub fn enable_schedule(&mut self) {
        self.edit_schedule(|s| s.enabled = true);
    }

    pub fn disable_schedule(&mut self) {
        self.edit_schedule(|s| s.enabled = false);
    }

    pub fn next_turn_on_time(&self) -> u32 {
        self.schedule.next_turn_on_time
    }

    pub fn set_next_turn_on_time(&mut self, time: u32) {
        self.edit_schedule(|s| s.next_turn_on_time = time);
    }

    /// Minutes.
    pub fn duration(&self) -> u16 {
        self.schedule.duration_minutes
    }

    pub fn set_duration(&mut self, minutes: u16) {
        self.edit_schedule(|s| s.duration_minutes = minutes);
    }

    pub fn period_days(&self) -> u8 {
        self.schedule.period_days
    }

    pub fn set_period_days(&mut self, days: u8) -> Result<()> {
        if days == 0 {
            return Err(Rejection::PeriodDays.into());
        }
        self.edit_schedule(|s| s.period_days = days);
        Ok(())
    }

    // ── Config (read-only at runtime) ─────────────────────────

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn max_scheduled_turn_on_timeout(&self) -> u16 {
        self.config.max_scheduled_turn_on_timeout
    }

    pub fn min_scheduled_duration(&self) -> u16 {
        self.config.min_scheduled_duration
    }

    pub fn max_scheduled_duration(&self) -> u16 {
        self.config.max_scheduled_duration
    }

    pub fn recirculation_max_turn_on_timeout(&self) -> u8 {
        self.config.recirculation_max_turn_on_timeout
    }

    pub fn recirculation_stop_detection_timeout(&self) -> u8 {
        self.config.recirculation_stop_detection_timeout
    }

    pub fn uv_turn_on_off_delay(&self) -> u8 {
        self.config.uv_turn_on_off_delay
    }

    /// Switch everything off and restore factory config and schedule.
    pub fn reset(&mut self) {
        info!("Pool: factory reset");
        self.pump_off();
        if let Err(e) = self.uv.turn_off() {
            error!("Pool: UV switch failed: {e}");
        }

        self.config = PoolConfig::default();
        if let Err(e) = self.store.save(RecordKey::PoolConfig, &self.config) {
            warn!("Pool: saving config failed: {e}");
        }
        self.schedule = PoolSchedule::default();
        self.save_schedule();

        self.state = PoolState::Idle;
        self.manual_lock = true;
        self.turn_off_time = 0;
        self.guard.arm();
        self.bump();
    }

    // ── Internal ──────────────────────────────────────────────

    fn pump_on(&mut self, now: u32) -> bool {
        match self.pump.turn_on() {
            Ok(()) => {
                self.turn_on_time = now;
                true
            }
            Err(e) => {
                error!("Pool: pump on failed: {e}");
                false
            }
        }
    }

    fn pump_off(&mut self) {
        match self.pump.turn_off() {
            Ok(()) => self.turn_on_time = 0,
            Err(e) => error!("Pool: pump off failed: {e}"),
        }
    }

    fn transition(&mut self, to: PoolState, now: u32) {
        info!("Pool: {:?} -> {:?}", self.state, to);
        self.state = to;
        self.touch(now);
    }

    fn touch(&mut self, now: u32) {
        self.last_change = now.max(self.last_change.wrapping_add(1));
    }

    fn bump(&mut self) {
        self.last_change = self.last_change.wrapping_add(1);
    }

    fn edit_schedule(&mut self, edit: impl FnOnce(&mut PoolSchedule)) {
        edit(&mut self.schedule);
        self.save_schedule();
        self.bump();
    }

    fn save_schedule(&self) {
        if let Err(e) = self.store.save(RecordKey::PoolSchedule, &self.schedule) {
            warn!("Pool: saving schedule failed: {e}");
        }
    }
}
