//! Controller service: the hexagonal core.
//!
//! [`Controller`] owns the valve scheduler and both supervisors and runs
//! them in a fixed order each tick.  Panel inputs, events and persistence
//! flow through port traits, so the whole core runs on host with
//! simulated pins.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────────┐ ──▶ EventSink
//!                 │            Controller             │
//!                 │ irrigation ─▶ valves   pool       │
//!                 └──────────────────────────────────┘
//!                        │ RecordStore   │ WallClock
//! ```
//!
//! ## Tick order
//!
//! 1. Read the debounced panel inputs.
//! 2. Track the auto-mode switch.
//! 3. Irrigation supervisor (may queue or cancel valve jobs).
//! 4. Pool supervisor (pump, UV).
//! 5. Valve scheduler (pulses, sources).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::error::{Rejection, Result, SafetyFault};
use crate::irrigation::{IrrigationInputs, IrrigationState, IrrigationSupervisor};
use crate::pool::{PoolInputs, PoolState, PoolSupervisor};
use crate::sensors::PanelInputs;
use crate::valves::ElectrovalveScheduler;
use crate::valves::zones::ZoneMask;

use super::commands::{Command, IrrigationCommand, PoolCommand, Reply};
use super::events::AppEvent;
use super::ports::{ControlTick, EventSink, JobPort, RecordStore, SensorPort, WallClock};

/// Source index of the mains inlet valve.
const MAINS_INLET_SOURCE: u8 = 0;
/// Source index of the pool irrigation pump.
const IRRIGATION_PUMP_SOURCE: u8 = 1;

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<P, D, S, C> {
    clock: C,
    valves: ElectrovalveScheduler<P, D>,
    irrigation: IrrigationSupervisor<S, C>,
    pool: PoolSupervisor<P, S>,
    inputs: PanelInputs,
    zones_seen: ZoneMask,
    last_change: u32,
}

impl<P, D, S, C> Controller<P, D, S, C>
where
    P: OutputPin,
    D: DelayNs,
    S: RecordStore + Clone,
    C: WallClock + Clone,
{
    /// Load both supervisors from `store`.  `pump` and `uv` are the pool
    /// outputs; the valve scheduler owns everything else.
    pub fn new(clock: C, store: S, valves: ElectrovalveScheduler<P, D>, pump: P, uv: P) -> Self {
        let irrigation = IrrigationSupervisor::new(store.clone(), clock.clone());
        let pool = PoolSupervisor::new(store, pump, uv);
        Self {
            clock,
            valves,
            irrigation,
            pool,
            inputs: PanelInputs::default(),
            zones_seen: ZoneMask::EMPTY,
            last_change: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!("Controller started at {}", self.clock.now());
        sink.emit(&AppEvent::Started);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.  `now_ms` is the monotonic uptime used for
    /// valve pulse timing; wall time comes from the clock.
    pub fn tick(&mut self, now_ms: u64, sensors: &mut impl SensorPort, sink: &mut impl EventSink) {
        let time = self.clock.now();
        let inputs = sensors.read_inputs(now_ms);

        if inputs.auto_mode != self.inputs.auto_mode {
            info!("Controller: auto mode {}", if inputs.auto_mode { "on" } else { "off" });
            self.touch(time);
            sink.emit(&AppEvent::AutoModeChanged(inputs.auto_mode));
        }
        self.inputs = inputs;

        let tick = ControlTick {
            time,
            auto_mode: inputs.auto_mode,
        };
        let irrigation_before = self.irrigation.state();
        let pool_before = self.pool.state();
        let faults_before = self.pool.fault_flags();

        self.irrigation.run(
            &tick,
            IrrigationInputs {
                manual_switch: inputs.irrigation_manual,
            },
            &mut self.valves,
        );
        self.pool.run(
            &tick,
            PoolInputs {
                manual_switch: inputs.pool_manual,
                uv_enable: inputs.uv_enable,
                flow_detected: inputs.recirculation_flow,
            },
        );
        self.valves.run(now_ms);

        self.emit_changes(irrigation_before, pool_before, faults_before, sink);
    }

    fn emit_changes(
        &mut self,
        irrigation_before: IrrigationState,
        pool_before: PoolState,
        faults_before: u8,
        sink: &mut impl EventSink,
    ) {
        let irrigation_now = self.irrigation.state();
        if irrigation_now != irrigation_before {
            sink.emit(&AppEvent::IrrigationStateChanged {
                from: irrigation_before,
                to: irrigation_now,
            });
        }

        let pool_now = self.pool.state();
        if pool_now != pool_before {
            sink.emit(&AppEvent::PoolStateChanged {
                from: pool_before,
                to: pool_now,
            });
        }

        for fault in [SafetyFault::ImplausibleEndTime, SafetyFault::NoRecirculationFlow] {
            if self.pool.has_fault(fault) && faults_before & fault.mask() == 0 {
                sink.emit(&AppEvent::PumpFailsafe(fault));
            }
        }

        let zones = self.valves.active_zones();
        if zones != self.zones_seen {
            self.zones_seen = zones;
            sink.emit(&AppEvent::ValvesChanged { zones });
        }
    }

    // ── Clock ─────────────────────────────────────────────────

    /// Set the wall clock.  Every job timed against the old clock is
    /// cancelled: queued valve jobs and any scheduled pool run.
    pub fn set_clock(&mut self, time: u32, sink: &mut impl EventSink) {
        info!("Controller: clock set to {time}");
        self.clock.set(time);
        self.irrigation.on_clock_changed(&mut self.valves);
        self.pool.stop_job();
        self.touch(time);
        sink.emit(&AppEvent::ClockChanged { time });
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn last_change(&self) -> u32 {
        self.last_change
    }

    /// Inputs seen by the most recent tick.
    pub fn inputs(&self) -> PanelInputs {
        self.inputs
    }

    pub fn valves(&self) -> &ElectrovalveScheduler<P, D> {
        &self.valves
    }

    pub fn irrigation(&self) -> &IrrigationSupervisor<S, C> {
        &self.irrigation
    }

    pub fn pool(&self) -> &PoolSupervisor<P, S> {
        &self.pool
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one dispatcher command.  Rejected setters change nothing.
    pub fn handle_command(&mut self, cmd: Command, sink: &mut impl EventSink) -> Result<Reply> {
        match cmd {
            Command::GetLastChange => Ok(Reply::U32(self.last_change)),
            Command::GetAutoMode => Ok(Reply::Bool(self.inputs.auto_mode)),
            Command::GetClock => Ok(Reply::U32(self.clock.now())),
            Command::SetClock(time) => {
                self.set_clock(time, sink);
                Ok(Reply::Done)
            }
            Command::Pool(cmd) => self.handle_pool(cmd),
            Command::Irrigation(cmd) => self.handle_irrigation(cmd),
        }
    }

    fn handle_pool(&mut self, cmd: PoolCommand) -> Result<Reply> {
        let pool = &mut self.pool;
        let reply = match cmd {
            PoolCommand::GetLastChange => Reply::U32(pool.last_change()),
            PoolCommand::GetState => Reply::U8(pool.state() as u8),
            PoolCommand::GetPumpState => Reply::Bool(pool.pump_is_on()),
            PoolCommand::GetUvState => Reply::Bool(pool.uv_is_on()),
            PoolCommand::GetManualInput => Reply::Bool(self.inputs.pool_manual),
            PoolCommand::GetUvEnableInput => Reply::Bool(self.inputs.uv_enable),
            PoolCommand::GetFlowInput => Reply::Bool(self.inputs.recirculation_flow),
            PoolCommand::GetManualLock => Reply::Bool(pool.manual_lock()),
            PoolCommand::GetScheduleEnabled => Reply::Bool(pool.is_schedule_enabled()),
            PoolCommand::SetScheduleEnabled(true) => {
                pool.enable_schedule();
                Reply::Done
            }
            PoolCommand::SetScheduleEnabled(false) => {
                pool.disable_schedule();
                Reply::Done
            }
            PoolCommand::GetNextTurnOnTime => Reply::U32(pool.next_turn_on_time()),
            PoolCommand::SetNextTurnOnTime(t) => {
                pool.set_next_turn_on_time(t);
                Reply::Done
            }
            PoolCommand::GetDuration => Reply::U16(pool.duration()),
            PoolCommand::SetDuration(m) => {
                pool.set_duration(m);
                Reply::Done
            }
            PoolCommand::GetPeriodDays => Reply::U8(pool.period_days()),
            PoolCommand::SetPeriodDays(d) => pool.set_period_days(d).map(|()| Reply::Done)?,
            PoolCommand::FaultFlags => Reply::U8(pool.fault_flags()),
            PoolCommand::Reset => {
                pool.reset();
                Reply::Done
            }
        };
        Ok(reply)
    }

    fn handle_irrigation(&mut self, cmd: IrrigationCommand) -> Result<Reply> {
        use IrrigationCommand as Irr;

        let irr = &mut self.irrigation;
        let reply = match cmd {
            Irr::GetLastChange => Reply::U32(irr.last_change()),
            Irr::GetState => Reply::U8(irr.state() as u8),
            Irr::GetPumpState => Reply::Bool(self.valves.source_state(IRRIGATION_PUMP_SOURCE)),
            Irr::GetMainsInletState => Reply::Bool(self.valves.source_state(MAINS_INLET_SOURCE)),
            Irr::GetManualInput => Reply::Bool(self.inputs.irrigation_manual),
            Irr::GetPressureInput => Reply::Bool(self.inputs.irrigation_pressure),
            Irr::GetManualLock => Reply::Bool(irr.manual_lock()),
            Irr::GetZonesState => Reply::Zones(irr.zones_state(&self.valves)),
            Irr::GetManualZones => Reply::Zones(irr.manual_zones()),
            Irr::SetManualZones(z) => {
                irr.set_manual_zones(z);
                Reply::Done
            }
            Irr::GetManualSource => Reply::U8(irr.manual_source()),
            Irr::SetManualSource(s) => {
                irr.set_manual_source(s);
                Reply::Done
            }
            Irr::GetScheduleEnabled => Reply::Bool(irr.is_schedule_enabled()),
            Irr::SetScheduleEnabled(true) => {
                irr.enable_schedule();
                Reply::Done
            }
            Irr::SetScheduleEnabled(false) => {
                irr.disable_schedule();
                Reply::Done
            }
            Irr::GetPaused => Reply::Bool(irr.is_paused()),
            Irr::PauseUntil(t) => {
                irr.pause_until(t);
                Reply::Done
            }
            Irr::Resume => {
                irr.resume();
                Reply::Done
            }
            Irr::GetResumeTime => Reply::U32(irr.schedule_paused_until()),
            Irr::GetNextIrrigationTime => Reply::U32(irr.next_irrigation_time()),
            Irr::GetGroupsEnableMask => Reply::U16(irr.groups_enable_mask()),
            Irr::GetGroupEnabled(i) => Reply::Bool(irr.group(i).ok_or(Rejection::GroupIndex)?.enabled),
            Irr::SetGroupEnabled(i, true) => irr.enable_group(i).map(|()| Reply::Done)?,
            Irr::SetGroupEnabled(i, false) => irr.disable_group(i).map(|()| Reply::Done)?,
            Irr::GetGroupName(i) => Reply::Name(group_field(irr.group(i).map(|g| g.name.clone()))?),
            Irr::SetGroupName(i, name) => irr.set_group_name(i, &name).map(|()| Reply::Done)?,
            Irr::GetGroupZones(i) => Reply::Zones(group_field(irr.group_zones(i))?),
            Irr::SetGroupZones(i, z) => irr.set_group_zones(i, z).map(|()| Reply::Done)?,
            Irr::GetGroupSource(i) => Reply::U8(group_field(irr.group_source(i))?),
            Irr::SetGroupSource(i, s) => irr.set_group_source(i, s).map(|()| Reply::Done)?,
            Irr::GetGroupPeriod(i) => Reply::U8(group_field(irr.group_period(i))?),
            Irr::SetGroupPeriod(i, p) => irr.set_group_period(i, p).map(|()| Reply::Done)?,
            Irr::GetGroupDuration(i) => Reply::U16(group_field(irr.group_duration(i))?),
            Irr::SetGroupDuration(i, d) => irr.set_group_duration(i, d).map(|()| Reply::Done)?,
            Irr::GetGroupTimeOfDay(i) => Reply::U16(group_field(irr.group_time_of_day(i))?),
            Irr::SetGroupTimeOfDay(i, m) => irr.set_group_time_of_day(i, m).map(|()| Reply::Done)?,
            Irr::GetGroupNextTime(i) => Reply::U32(group_field(irr.group_next_timestamp(i))?),
            Irr::RunGroupNow(i) => {
                irr.run_group_now(i);
                Reply::Done
            }
            Irr::CancelCurrent => {
                irr.cancel_current(&mut self.valves);
                Reply::Done
            }
            Irr::CancelAll => {
                irr.cancel_all(&mut self.valves);
                Reply::Done
            }
            Irr::ResetGroup(i) => irr.reset_group(i).map(|()| Reply::Done)?,
            Irr::Reset => {
                irr.reset();
                Reply::Done
            }
        };
        Ok(reply)
    }

    fn touch(&mut self, time: u32) {
        self.last_change = time.max(self.last_change.wrapping_add(1));
    }
}

fn group_field<T>(field: Option<T>) -> Result<T> {
    field.ok_or_else(|| Rejection::GroupIndex.into())
}
