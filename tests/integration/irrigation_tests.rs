//! Irrigation supervisor driven through the whole controller.

use std::rc::Rc;

use aquaplc::app::commands::{IrrigationCommand as Irr, Reply};
use aquaplc::app::events::AppEvent;
use aquaplc::app::ports::{ControlTick, JobPort};
use aquaplc::config::IrrigationGroup;
use aquaplc::irrigation::{IrrigationInputs, IrrigationState, IrrigationSupervisor};
use aquaplc::schedule::{SECS_PER_DAY, SECS_PER_HOUR};
use aquaplc::valves::zones::ZoneMask;

use crate::mock_hw::{DAY0, FakeClock, MemStore, RecordingJobs, Rig};

const TEN_PM: u32 = DAY0 + 22 * SECS_PER_HOUR;

fn auto_rig(time: u32) -> Rig {
    let mut rig = Rig::new(time);
    rig.panel.inputs.auto_mode = true;
    rig
}

fn state(rig: &Rig) -> IrrigationState {
    rig.controller.irrigation().state()
}

// ── Scheduled groups ──────────────────────────────────────────

#[test]
fn group_fires_at_time_of_day_and_advances_by_period() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b001, 0, 20, 6, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    assert_eq!(rig.irr(Irr::GetGroupNextTime(0)), Reply::U32(TEN_PM));
    assert_eq!(rig.irr(Irr::GetNextIrrigationTime), Reply::U32(TEN_PM));

    rig.run_secs(10);
    assert_eq!(state(&rig), IrrigationState::Scheduled);
    assert!(rig.source_on(0));
    assert_eq!(
        rig.irr(Irr::GetGroupNextTime(0)),
        Reply::U32(TEN_PM + 6 * SECS_PER_HOUR)
    );
    assert_eq!(rig.irr(Irr::GetZonesState), Reply::Zones(ZoneMask::from_bits(0b001)));
    assert!(rig.events.contains(&AppEvent::IrrigationStateChanged {
        from: IrrigationState::Idle,
        to: IrrigationState::Scheduled,
    }));

    rig.run_secs(20);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.source_on(0));
    assert_eq!(rig.trace.addresses(), [1, 3, 5, 0, 1]);
}

#[test]
fn missed_slot_reanchors_without_running() {
    let mut rig = auto_rig(DAY0 + 21 * SECS_PER_HOUR);
    rig.setup_group(0, 0b001, 0, 20, 6, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));

    // Powered off for seven hours past the slot.
    rig.clock.advance(8 * SECS_PER_HOUR);
    rig.run_secs(2);

    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.controller.valves().is_busy());
    assert_eq!(
        rig.irr(Irr::GetGroupNextTime(0)),
        Reply::U32(TEN_PM + 12 * SECS_PER_HOUR)
    );
    assert_eq!(rig.trace.addresses(), [1, 3, 5]);
}

#[test]
fn disabled_schedule_never_fires() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b001, 0, 20, 24, 22 * 60);

    rig.run_secs(10);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert_eq!(rig.irr(Irr::GetNextIrrigationTime), Reply::U32(u32::MAX));
    assert_eq!(rig.irr(Irr::GetGroupNextTime(0)), Reply::U32(TEN_PM));
}

#[test]
fn pause_holds_firings_until_resume_time() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b001, 0, 20, 24, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    rig.irr(Irr::PauseUntil(TEN_PM + 60));

    assert_eq!(rig.irr(Irr::GetPaused), Reply::Bool(true));
    assert_eq!(rig.irr(Irr::GetNextIrrigationTime), Reply::U32(TEN_PM + 60));

    rig.run_secs(30);
    assert_eq!(state(&rig), IrrigationState::Idle);

    rig.run_secs(40);
    assert_eq!(state(&rig), IrrigationState::Scheduled);
    assert_eq!(rig.irr(Irr::GetPaused), Reply::Bool(false));
    assert_eq!(rig.irr(Irr::GetResumeTime), Reply::U32(0));
}

#[test]
fn resume_releases_a_pending_firing() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b001, 0, 20, 24, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    rig.irr(Irr::PauseUntil(TEN_PM + SECS_PER_DAY));

    rig.run_secs(10);
    assert_eq!(state(&rig), IrrigationState::Idle);

    rig.irr(Irr::Resume);
    rig.run_secs(1);
    assert_eq!(state(&rig), IrrigationState::Scheduled);
}

#[test]
fn auto_mode_off_cancels_scheduled_run() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b011, 0, 600, 24, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    rig.run_secs(10);
    assert!(rig.source_on(0));

    rig.panel.inputs.auto_mode = false;
    rig.run_secs(3);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.source_on(0));
    assert!(!rig.controller.valves().is_busy());
}

#[test]
fn groups_due_together_queue_in_one_cycle() {
    let clock = Rc::new(FakeClock::new(TEN_PM - 60));
    let mut irr = IrrigationSupervisor::new(Rc::new(MemStore::new()), Rc::clone(&clock));
    for (idx, zones) in [(0u8, 0b001u16), (3, 0b110)] {
        let group = IrrigationGroup {
            enabled: true,
            zones: ZoneMask::from_bits(zones),
            duration: 45,
            time_of_day: 22 * 60,
            ..IrrigationGroup::default()
        };
        irr.update_group(idx, group).unwrap();
    }
    irr.enable_schedule();

    let mut jobs = RecordingJobs::default();
    let tick = ControlTick { time: TEN_PM, auto_mode: true };
    irr.run(&tick, IrrigationInputs::default(), &mut jobs);

    assert_eq!(irr.state(), IrrigationState::Scheduled);
    assert_eq!(
        jobs.submitted,
        [(ZoneMask::from_bits(0b001), 0, 45), (ZoneMask::from_bits(0b110), 0, 45)]
    );
    assert_eq!(irr.group_next_timestamp(0), Some(TEN_PM + SECS_PER_DAY));
    assert_eq!(irr.next_irrigation_time(), TEN_PM + SECS_PER_DAY);

    jobs.finish();
    irr.run(&ControlTick { time: TEN_PM + 1, auto_mode: true }, IrrigationInputs::default(), &mut jobs);
    assert_eq!(irr.state(), IrrigationState::Idle);
    assert!(irr.last_change() >= TEN_PM + 1);
}

// ── Run now ───────────────────────────────────────────────────

#[test]
fn run_group_now_ignores_schedule_switch() {
    let mut rig = auto_rig(DAY0);
    rig.setup_group(2, 0b100, 1, 30, 24, 0);
    rig.irr(Irr::RunGroupNow(2));

    rig.run_secs(5);
    assert_eq!(state(&rig), IrrigationState::Scheduled);
    assert!(rig.source_on(1));
    assert_eq!(rig.irr(Irr::GetPumpState), Reply::Bool(true));
    assert_eq!(rig.irr(Irr::GetMainsInletState), Reply::Bool(false));
}

#[test]
fn run_now_requests_are_dropped_while_auto_is_off() {
    let mut rig = Rig::new(DAY0);
    rig.setup_group(0, 0b001, 0, 30, 24, 0);
    rig.irr(Irr::RunGroupNow(0));
    rig.run_secs(1);

    rig.panel.inputs.auto_mode = true;
    rig.run_secs(5);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.controller.valves().is_busy());
}

#[test]
fn run_now_with_out_of_bounds_duration_is_skipped() {
    let mut rig = auto_rig(DAY0);
    rig.setup_group(0, 0b001, 0, 3_600, 24, 0);
    rig.irr(Irr::RunGroupNow(0));
    rig.irr(Irr::RunGroupNow(42));
    rig.run_secs(2);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.controller.valves().is_busy());
}

// ── Manual switch ─────────────────────────────────────────────

#[test]
fn switch_on_at_boot_must_be_cycled() {
    let mut rig = Rig::new(DAY0);
    rig.irr(Irr::SetManualZones(ZoneMask::from_bits(0b101)));
    rig.panel.inputs.irrigation_manual = true;

    rig.run_secs(5);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert_eq!(rig.irr(Irr::GetManualLock), Reply::Bool(true));

    rig.panel.inputs.irrigation_manual = false;
    rig.run_secs(1);
    assert_eq!(rig.irr(Irr::GetManualLock), Reply::Bool(false));

    rig.panel.inputs.irrigation_manual = true;
    rig.run_secs(5);
    assert_eq!(state(&rig), IrrigationState::Manual);
    assert!(rig.source_on(0));
    assert_eq!(rig.irr(Irr::GetZonesState), Reply::Zones(ZoneMask::from_bits(0b101)));

    rig.panel.inputs.irrigation_manual = false;
    rig.run_secs(2);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.source_on(0));
    assert_eq!(rig.trace.addresses(), [1, 3, 5, 0, 4, 1, 5]);
}

#[test]
fn refused_manual_job_latches_lock() {
    let mut rig = Rig::new(DAY0);
    // Default manual zones are empty, so the job is refused.
    rig.run_secs(1);
    rig.panel.inputs.irrigation_manual = true;
    rig.run_secs(1);

    assert_eq!(state(&rig), IrrigationState::Idle);
    assert_eq!(rig.irr(Irr::GetManualLock), Reply::Bool(true));
    assert!(!rig.controller.valves().is_busy());
}

#[test]
fn switch_during_scheduled_run_does_not_start_manual_after() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.irr(Irr::SetManualZones(ZoneMask::from_bits(0b010)));
    rig.setup_group(0, 0b001, 0, 20, 24, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    rig.run_secs(10);
    assert_eq!(state(&rig), IrrigationState::Scheduled);

    rig.panel.inputs.irrigation_manual = true;
    rig.run_secs(30);
    assert_eq!(state(&rig), IrrigationState::Idle);
    assert_eq!(rig.irr(Irr::GetManualLock), Reply::Bool(true));
    assert!(!rig.controller.valves().is_busy());

    rig.panel.inputs.irrigation_manual = false;
    rig.run_secs(1);
    assert_eq!(rig.irr(Irr::GetManualLock), Reply::Bool(false));
}

#[test]
fn manual_switch_off_during_boot_sweep_cancels_job() {
    let mut rig = Rig::new(DAY0);
    rig.irr(Irr::SetManualZones(ZoneMask::from_bits(0b001)));

    rig.run_ms(10);
    rig.panel.inputs.irrigation_manual = true;
    rig.run_ms(10);
    assert_eq!(state(&rig), IrrigationState::Manual);
    assert!(rig.controller.valves().is_sweeping());

    rig.panel.inputs.irrigation_manual = false;
    rig.run_ms(10);
    rig.run_secs(60);

    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.controller.valves().is_busy());
    assert!(!rig.source_on(0));
    assert_eq!(rig.trace.addresses(), [1, 3, 5]);
}

#[test]
fn cancel_current_drops_run_now_queued_behind_sweep() {
    let mut rig = auto_rig(DAY0);
    rig.setup_group(0, 0b001, 0, 30, 24, 0);
    rig.irr(Irr::RunGroupNow(0));
    rig.run_ms(20);
    assert_eq!(state(&rig), IrrigationState::Scheduled);
    assert!(rig.controller.valves().is_sweeping());

    rig.irr(Irr::CancelCurrent);
    rig.run_secs(10);

    assert_eq!(state(&rig), IrrigationState::Idle);
    assert!(!rig.controller.valves().is_busy());
    assert!(!rig.source_on(0));
    assert_eq!(rig.trace.addresses(), [1, 3, 5]);
}

// ── Clock ─────────────────────────────────────────────────────

#[test]
fn setting_clock_cancels_running_jobs() {
    let mut rig = auto_rig(TEN_PM - 5);
    rig.setup_group(0, 0b001, 0, 600, 24, 22 * 60);
    rig.irr(Irr::SetScheduleEnabled(true));
    rig.run_secs(10);
    assert!(rig.source_on(0));

    rig.controller.set_clock(TEN_PM + 30, &mut rig.events);
    rig.run_secs(2);

    assert!(rig.events.contains(&AppEvent::ClockChanged { time: TEN_PM + 30 }));
    assert!(!rig.source_on(0));
    assert!(!rig.controller.valves().is_busy());
    assert_eq!(state(&rig), IrrigationState::Idle);
}
