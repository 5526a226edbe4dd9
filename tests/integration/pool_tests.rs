//! Pool pump, UV interlock and failsafes through the controller.

use aquaplc::app::commands::{Command, PoolCommand, Reply};
use aquaplc::app::events::AppEvent;
use aquaplc::error::SafetyFault;
use aquaplc::pool::PoolState;
use aquaplc::schedule::SECS_PER_DAY;

use crate::mock_hw::{DAY0, Rig};

const START: u32 = DAY0 + 8 * 3_600;

/// Rig with a five-minute daily pool run starting two seconds in.
fn scheduled_rig() -> Rig {
    let mut rig = Rig::new(START);
    rig.panel.inputs.auto_mode = true;
    rig.pool(PoolCommand::SetDuration(5));
    rig.pool(PoolCommand::SetPeriodDays(1));
    rig.pool(PoolCommand::SetNextTurnOnTime(START + 2));
    rig.pool(PoolCommand::SetScheduleEnabled(true));
    rig
}

fn state(rig: &Rig) -> PoolState {
    rig.controller.pool().state()
}

#[test]
fn scheduled_run_turns_pump_on_then_off_at_end_time() {
    let mut rig = scheduled_rig();
    rig.panel.inputs.recirculation_flow = true;

    rig.run_secs(5);
    assert_eq!(state(&rig), PoolState::Scheduled);
    assert!(rig.pump.is_set_high());
    assert_eq!(
        rig.pool(PoolCommand::GetNextTurnOnTime),
        Reply::U32(START + 2 + SECS_PER_DAY)
    );

    rig.run_secs(5 * 60);
    assert_eq!(state(&rig), PoolState::Idle);
    assert!(!rig.pump.is_set_high());
    assert_eq!(rig.pool(PoolCommand::FaultFlags), Reply::U8(0));
    assert!(rig.events.contains(&AppEvent::PoolStateChanged {
        from: PoolState::Scheduled,
        to: PoolState::Idle,
    }));
}

#[test]
fn missing_flow_trips_failsafe() {
    let mut rig = scheduled_rig();

    rig.run_secs(25);
    assert!(rig.pump.is_set_high());

    rig.run_secs(10);
    assert!(!rig.pump.is_set_high());
    assert_eq!(state(&rig), PoolState::Idle);
    assert_eq!(
        rig.pool(PoolCommand::FaultFlags),
        Reply::U8(SafetyFault::NoRecirculationFlow.mask())
    );
    assert!(rig.events.contains(&AppEvent::PumpFailsafe(SafetyFault::NoRecirculationFlow)));
}

#[test]
fn uv_follows_flow_with_delay() {
    let mut rig = scheduled_rig();
    rig.panel.inputs.recirculation_flow = true;
    rig.panel.inputs.uv_enable = true;

    rig.run_secs(4);
    assert!(rig.pump.is_set_high());
    assert!(!rig.uv.is_set_high());

    rig.run_secs(10);
    assert!(rig.uv.is_set_high());
    assert_eq!(rig.pool(PoolCommand::GetUvState), Reply::Bool(true));

    rig.panel.inputs.uv_enable = false;
    rig.run_secs(1);
    assert!(!rig.uv.is_set_high());
}

#[test]
fn uv_never_runs_without_pump() {
    let mut rig = Rig::new(START);
    rig.panel.inputs.recirculation_flow = true;
    rig.panel.inputs.uv_enable = true;
    rig.run_secs(20);
    assert!(!rig.uv.is_set_high());
}

#[test]
fn overdue_run_is_skipped_and_rescheduled() {
    let mut rig = scheduled_rig();
    rig.clock.advance(2 * 3_600);
    rig.run_secs(2);

    assert_eq!(state(&rig), PoolState::Idle);
    assert!(!rig.pump.is_set_high());
    assert_eq!(
        rig.pool(PoolCommand::GetNextTurnOnTime),
        Reply::U32(START + 2 + SECS_PER_DAY)
    );
}

#[test]
fn manual_switch_runs_pump_after_cycle() {
    let mut rig = Rig::new(START);
    rig.panel.inputs.pool_manual = true;
    rig.run_secs(2);
    assert!(!rig.pump.is_set_high());
    assert_eq!(rig.pool(PoolCommand::GetManualLock), Reply::Bool(true));

    rig.panel.inputs.pool_manual = false;
    rig.run_secs(1);
    rig.panel.inputs.pool_manual = true;
    rig.run_secs(1);
    assert_eq!(state(&rig), PoolState::Manual);
    assert_eq!(rig.pool(PoolCommand::GetPumpState), Reply::Bool(true));

    rig.panel.inputs.pool_manual = false;
    rig.run_secs(1);
    assert_eq!(state(&rig), PoolState::Idle);
    assert!(!rig.pump.is_set_high());
}

#[test]
fn setting_clock_ends_scheduled_run() {
    let mut rig = scheduled_rig();
    rig.panel.inputs.recirculation_flow = true;
    rig.run_secs(5);
    assert!(rig.pump.is_set_high());

    rig.controller.set_clock(START + 100, &mut rig.events);
    rig.run_secs(1);
    assert_eq!(state(&rig), PoolState::Idle);
    assert!(!rig.pump.is_set_high());
}

#[test]
fn zero_period_is_rejected() {
    let mut rig = Rig::new(START);
    let before = rig.store.writes();
    assert!(rig.cmd(Command::Pool(PoolCommand::SetPeriodDays(0))).is_err());
    assert_eq!(rig.store.writes(), before);
    assert_eq!(rig.pool(PoolCommand::GetPeriodDays), Reply::U8(255));
}
