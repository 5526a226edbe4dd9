//! Irrigation supervisor.
//!
//! Arbitrates between the panel's manual switch, the persisted schedule
//! groups and "run group now" requests, and turns the winner into jobs for
//! the valve scheduler.
//!
//! ```text
//!             switch on, valves free, unlocked
//!   ┌──────┐ ─────────────────────────────────▶ ┌────────┐
//!   │      │ ◀── switch off / job finished ──── │ Manual │
//!   │ Idle │                                    └────────┘
//!   │      │ ── group due / run-now ──────────▶ ┌───────────┐
//!   └──────┘ ◀── queue empty / auto off ─────── │ Scheduled │
//!                                               └───────────┘
//! ```
//!
//! ## Manual lock
//!
//! The lock stops the switch from starting a manual job.  It is set when the
//! switch is flipped on during a scheduled run or when a manual submission
//! is refused, and cleared only once the switch is seen off.  It starts set,
//! so a switch left on across a reboot must be cycled first.

mod settings;

use heapless::Deque;
use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{ControlTick, JobPort, RecordKey, RecordStore, WallClock};
use crate::config::{
    GROUP_COUNT, IrrigationGroup, IrrigationManualConfig, IrrigationScheduleConfig,
};
use crate::schedule::{advance_past, group_period_secs, is_missed};

/// Manual jobs run until the switch goes off; this only bounds them.
pub const MANUAL_JOB_DURATION_SECS: u32 = u16::MAX as u32;

const RUN_NOW_CAPACITY: usize = GROUP_COUNT as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IrrigationState {
    Idle = 0,
    Manual = 1,
    Scheduled = 2,
}

/// Inputs the irrigation supervisor reads each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IrrigationInputs {
    pub manual_switch: bool,
}

pub struct IrrigationSupervisor<S, C> {
    store: S,
    clock: C,
    state: IrrigationState,
    schedule: IrrigationScheduleConfig,
    manual: IrrigationManualConfig,
    groups: [IrrigationGroup; GROUP_COUNT as usize],
    run_now: Deque<u8, RUN_NOW_CAPACITY>,
    manual_lock: bool,
    last_change: u32,
}

impl<S: RecordStore, C: WallClock> IrrigationSupervisor<S, C> {
    /// Load every irrigation record; missing or malformed ones fall back to
    /// their reset values.
    pub fn new(store: S, clock: C) -> Self {
        let schedule: IrrigationScheduleConfig = store.load_or_default(RecordKey::IrrigationSchedule);
        let manual: IrrigationManualConfig = store.load_or_default(RecordKey::IrrigationManual);
        let groups = core::array::from_fn(|i| {
            let group: IrrigationGroup = store.load_or_default(RecordKey::IrrigationGroup(i as u8));
            if group.is_well_formed() {
                group
            } else {
                warn!("Irrigation: group {i} malformed, resetting");
                IrrigationGroup::default()
            }
        });

        let supervisor = Self {
            store,
            clock,
            state: IrrigationState::Idle,
            schedule,
            manual,
            groups,
            run_now: Deque::new(),
            manual_lock: true,
            last_change: 0,
        };
        info!(
            "Irrigation: loaded, schedule {}, groups enabled 0b{:010b}",
            if schedule.enabled { "on" } else { "off" },
            supervisor.groups_enable_mask()
        );
        supervisor
    }

    // ── Per-tick ──────────────────────────────────────────────

    /// Run one supervisor cycle.
    pub fn run(&mut self, tick: &ControlTick, inputs: IrrigationInputs, valves: &mut impl JobPort) {
        match self.state {
            IrrigationState::Idle => self.idle(tick, inputs, valves),
            IrrigationState::Manual => self.manual_run(tick, inputs, valves),
            IrrigationState::Scheduled => self.scheduled_run(tick, inputs, valves),
        }

        if valves.poll_state_changed() {
            self.touch(tick.time);
        }
    }

    fn idle(&mut self, tick: &ControlTick, inputs: IrrigationInputs, valves: &mut impl JobPort) {
        // ── Manual switch ─────────────────────────────────────
        if inputs.manual_switch && !valves.is_busy() {
            if !self.manual_lock {
                let manual = self.manual;
                if valves.submit_job(manual.zones, manual.source, MANUAL_JOB_DURATION_SECS) {
                    self.transition(IrrigationState::Manual, tick.time);
                } else {
                    warn!("Irrigation: manual job refused, locking until switch off");
                    self.manual_lock = true;
                    self.touch(tick.time);
                }
                return;
            }
        } else if !inputs.manual_switch && self.manual_lock {
            self.manual_lock = false;
            self.touch(tick.time);
        }

        if !tick.auto_mode {
            self.run_now.clear();
            return;
        }

        // ── Run-now requests take priority over the schedule ──
        if let Some(idx) = self.run_now.pop_front() {
            self.start_run_now(idx, tick, valves);
            return;
        }

        // ── Periodic schedule ─────────────────────────────────
        if !self.schedule.enabled || !self.pause_elapsed(tick.time) {
            return;
        }
        for idx in 0..GROUP_COUNT {
            self.evaluate_group(idx, tick.time, valves);
        }
    }

    fn start_run_now(&mut self, idx: u8, tick: &ControlTick, valves: &mut impl JobPort) {
        let Some(group) = self.groups.get(idx as usize) else {
            warn!("Irrigation: run-now for unknown group {idx}");
            return;
        };
        if !self.schedule.duration_in_bounds(group.duration) {
            warn!("Irrigation: run-now group {idx} duration {}s out of bounds", group.duration);
            return;
        }
        if valves.submit_job(group.zones, group.source, u32::from(group.duration)) {
            info!("Irrigation: running group {idx} now");
            self.transition(IrrigationState::Scheduled, tick.time);
        }
    }

    /// `false` while paused.  Reaching the resume time clears the pause.
    fn pause_elapsed(&mut self, now: u32) -> bool {
        let until = self.schedule.paused_until;
        if until == 0 {
            return true;
        }
        if now < until {
            return false;
        }
        info!("Irrigation: schedule resumed");
        self.schedule.paused_until = 0;
        self.save_schedule();
        self.touch(now);
        true
    }

    fn evaluate_group(&mut self, idx: u8, now: u32, valves: &mut impl JobPort) {
        let timeout = u32::from(self.schedule.max_scheduled_turn_on_timeout);
        let group = self.groups[idx as usize].clone();
        if !group.enabled || group.next_timestamp > now {
            return;
        }

        let missed = is_missed(now, group.next_timestamp, timeout);
        let mut started = false;
        if missed {
            warn!("Irrigation: group {idx} missed its slot, re-anchoring");
        } else if self.schedule.duration_in_bounds(group.duration) {
            started = valves.submit_job(group.zones, group.source, u32::from(group.duration));
        }

        let period = group_period_secs(group.period, missed);
        let next = advance_past(now, group.next_timestamp, period);
        self.groups[idx as usize].next_timestamp = next;
        self.save_group(idx);
        self.touch(now);

        if started {
            info!("Irrigation: group {idx} fired, next at {next}");
            if self.state != IrrigationState::Scheduled {
                self.transition(IrrigationState::Scheduled, now);
            }
        }
    }

    fn manual_run(&mut self, tick: &ControlTick, inputs: IrrigationInputs, valves: &mut impl JobPort) {
        if !inputs.manual_switch || !valves.is_busy() {
            valves.request_cancel_current();
            self.transition(IrrigationState::Idle, tick.time);
        }
    }

    fn scheduled_run(&mut self, tick: &ControlTick, inputs: IrrigationInputs, valves: &mut impl JobPort) {
        if inputs.manual_switch != self.manual_lock {
            self.manual_lock = inputs.manual_switch;
            self.touch(tick.time);
        }

        if !valves.is_busy() {
            self.transition(IrrigationState::Idle, tick.time);
        } else if !tick.auto_mode {
            info!("Irrigation: auto mode off, cancelling scheduled jobs");
            valves.request_cancel_all();
            self.transition(IrrigationState::Idle, tick.time);
        }
    }

    // ── Commands that reach the valves ────────────────────────

    pub fn cancel_current(&mut self, valves: &mut impl JobPort) {
        valves.request_cancel_current();
    }

    pub fn cancel_all(&mut self, valves: &mut impl JobPort) {
        valves.request_cancel_all();
    }

    /// The wall clock was set: job timing derived from it is void.
    pub fn on_clock_changed(&mut self, valves: &mut impl JobPort) {
        info!("Irrigation: clock changed, cancelling all jobs");
        valves.request_cancel_all();
    }

    /// Queue group `idx` to run at the next idle cycle with auto mode on.
    /// Out-of-range indices are accepted here and dropped when drained.
    pub fn run_group_now(&mut self, idx: u8) {
        if self.run_now.push_back(idx).is_err() {
            warn!("Irrigation: run-now queue full, dropping group {idx}");
        }
    }

    // ── Controller state ──────────────────────────────────────

    pub fn state(&self) -> IrrigationState {
        self.state
    }

    pub fn last_change(&self) -> u32 {
        self.last_change
    }

    pub fn manual_lock(&self) -> bool {
        self.manual_lock
    }

    pub fn zones_state(&self, valves: &impl JobPort) -> crate::valves::zones::ZoneMask {
        valves.active_zones()
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, to: IrrigationState, now: u32) {
        info!("Irrigation: {:?} -> {:?}", self.state, to);
        self.state = to;
        self.touch(now);
    }

    /// Record a runtime change at wall time `now`, never moving backwards.
    fn touch(&mut self, now: u32) {
        self.last_change = now.max(self.last_change.wrapping_add(1));
    }

    /// Record a configuration change.
    fn bump(&mut self) {
        self.last_change = self.last_change.wrapping_add(1);
    }

    fn persist<T: Serialize>(&self, key: RecordKey, record: &T) {
        if let Err(e) = self.store.save(key, record) {
            warn!("Irrigation: saving {:?} failed: {}", key, e);
        }
    }

    fn save_schedule(&self) {
        self.persist(RecordKey::IrrigationSchedule, &self.schedule);
    }

    fn save_manual(&self) {
        self.persist(RecordKey::IrrigationManual, &self.manual);
    }

    fn save_group(&self, idx: u8) {
        if let Some(group) = self.groups.get(idx as usize) {
            self.persist(RecordKey::IrrigationGroup(idx), group);
        }
    }
}
