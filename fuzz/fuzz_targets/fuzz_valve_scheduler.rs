//! Fuzz target: `ElectrovalveScheduler`
//!
//! Interprets the input as a stream of operations (submit, cancel, advance
//! time) and asserts that pulses never come closer than the pacing allows,
//! both sources are never on at once, and the scheduler always settles
//! with every output off.
//!
//! cargo fuzz run fuzz_valve_scheduler

#![no_main]

use aquaplc::app::ports::JobPort;
use aquaplc::drivers::sim::{NoDelay, SimPin};
use aquaplc::drivers::valve_actuator::ValveActuator;
use aquaplc::valves::zones::ZoneMask;
use aquaplc::valves::{ElectrovalveScheduler, ValveState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let address: [SimPin; 4] = Default::default();
    let signal = SimPin::new();
    let sources: [SimPin; 2] = Default::default();
    let actuator = ValveActuator::new(address, signal.clone(), sources.clone(), NoDelay);
    let mut scheduler = ElectrovalveScheduler::new(actuator, 0);

    let mut t = 0u64;
    let mut high = false;
    let mut last_pulse: Option<u64> = None;
    for op in data.chunks(2) {
        let (kind, arg) = (op[0], op.get(1).copied().unwrap_or(0));
        match kind % 4 {
            0 => {
                scheduler.submit_job(ZoneMask::from_bits(u16::from(arg)), kind >> 7, u32::from(arg % 5));
            }
            1 => scheduler.request_cancel_current(),
            2 => scheduler.request_cancel_all(),
            _ => {
                for _ in 0..u64::from(arg) {
                    scheduler.run(t);
                    let signal_high = signal.is_set_high();
                    if signal_high && !high {
                        assert!(last_pulse.is_none_or(|p| t - p >= 200), "pulses overlap at {t}");
                        last_pulse = Some(t);
                    }
                    high = signal_high;
                    assert!(!(sources[0].is_set_high() && sources[1].is_set_high()));
                    t += 10;
                }
            }
        }
    }

    scheduler.request_cancel_all();
    let deadline = t + 600_000;
    while t < deadline && (scheduler.is_busy() || scheduler.state() != ValveState::Idle) {
        scheduler.run(t);
        t += 10;
    }
    // One more tick drains the trailing cancel.
    scheduler.run(t);

    assert_eq!(scheduler.state(), ValveState::Idle);
    assert!(!scheduler.is_busy());
    assert!(sources.iter().all(|s| !s.is_set_high()));
    assert!(!signal.is_set_high());
});
