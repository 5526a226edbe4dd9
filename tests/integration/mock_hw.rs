//! Mock adapters for integration tests.
//!
//! Simulated pins stand in for GPIO; the store, clock, panel and event sink
//! record everything so tests can assert on full histories.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use aquaplc::app::commands::{Command, IrrigationCommand, PoolCommand, Reply};
use aquaplc::app::events::AppEvent;
use aquaplc::app::ports::{EventSink, JobPort, SensorPort, StorageError, StoragePort, WallClock};
use aquaplc::app::service::Controller;
use aquaplc::drivers::sim::{NoDelay, SimPin};
use aquaplc::drivers::valve_actuator::ValveActuator;
use aquaplc::error::Result;
use aquaplc::sensors::PanelInputs;
use aquaplc::valves::ElectrovalveScheduler;
use aquaplc::valves::zones::ZoneMask;

/// 2023-11-15 00:00:00 UTC.
pub const DAY0: u32 = 1_700_006_400;

// ── MemStore ──────────────────────────────────────────────────

/// In-memory [`StoragePort`] that counts writes.
#[derive(Default)]
pub struct MemStore {
    data: RefCell<HashMap<String, Vec<u8>>>,
    writes: Cell<u32>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.borrow().contains_key(key)
    }
}

impl StoragePort for MemStore {
    fn read(&self, _namespace: &str, key: &str, buf: &mut [u8]) -> core::result::Result<usize, StorageError> {
        let data = self.data.borrow();
        let value = data.get(key).ok_or(StorageError::NotFound)?;
        if value.len() > buf.len() {
            return Err(StorageError::TooLarge);
        }
        buf[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn write(&self, _namespace: &str, key: &str, data: &[u8]) -> core::result::Result<(), StorageError> {
        self.writes.set(self.writes.get() + 1);
        self.data.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

// ── FakeClock ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct FakeClock(Cell<u32>);

#[allow(dead_code)]
impl FakeClock {
    pub fn new(time: u32) -> Self {
        Self(Cell::new(time))
    }

    pub fn advance(&self, secs: u32) {
        self.0.set(self.0.get() + secs);
    }
}

impl WallClock for FakeClock {
    fn now(&self) -> u32 {
        self.0.get()
    }

    fn set(&self, time: u32) {
        self.0.set(time);
    }
}

// ── FakePanel ─────────────────────────────────────────────────

/// Panel whose debounced levels are set directly by the test.
#[derive(Debug, Default)]
pub struct FakePanel {
    pub inputs: PanelInputs,
}

impl SensorPort for FakePanel {
    fn read_inputs(&mut self, _now_ms: u64) -> PanelInputs {
        self.inputs
    }
}

// ── EventLog ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── RecordingJobs ─────────────────────────────────────────────

/// [`JobPort`] fake that records every request.  Submitted jobs stay
/// "running" until the test calls [`RecordingJobs::finish`].
#[derive(Debug)]
pub struct RecordingJobs {
    pub submitted: Vec<(ZoneMask, u8, u32)>,
    pub cancel_current: u32,
    pub cancel_all: u32,
    pub accept: bool,
    changed: bool,
}

impl Default for RecordingJobs {
    fn default() -> Self {
        Self {
            submitted: Vec::new(),
            cancel_current: 0,
            cancel_all: 0,
            accept: true,
            changed: false,
        }
    }
}

#[allow(dead_code)]
impl RecordingJobs {
    pub fn finish(&mut self) {
        self.submitted.clear();
        self.changed = true;
    }
}

impl JobPort for RecordingJobs {
    fn submit_job(&mut self, zones: ZoneMask, source: u8, duration_secs: u32) -> bool {
        if self.accept {
            self.submitted.push((zones, source, duration_secs));
        }
        self.accept
    }

    fn request_cancel_current(&mut self) {
        self.cancel_current += 1;
    }

    fn request_cancel_all(&mut self) {
        self.cancel_all += 1;
    }

    fn is_busy(&self) -> bool {
        !self.submitted.is_empty()
    }

    fn poll_state_changed(&mut self) -> bool {
        core::mem::take(&mut self.changed)
    }

    fn active_zones(&self) -> ZoneMask {
        self.submitted.first().map_or(ZoneMask::EMPTY, |j| j.0)
    }
}

// ── Valve rig ─────────────────────────────────────────────────

pub type Scheduler = ElectrovalveScheduler<SimPin, NoDelay>;

/// Handles to every pin the valve actuator drives.
#[derive(Clone, Default)]
pub struct ValvePins {
    pub address: [SimPin; 4],
    pub signal: SimPin,
    pub sources: [SimPin; 2],
}

#[allow(dead_code)]
impl ValvePins {
    pub fn scheduler(&self, now_ms: u64) -> Scheduler {
        let actuator = ValveActuator::new(
            self.address.clone(),
            self.signal.clone(),
            self.sources.clone(),
            NoDelay,
        );
        ElectrovalveScheduler::new(actuator, now_ms)
    }

    /// Multiplexer output currently addressed.
    pub fn address(&self) -> u8 {
        self.address
            .iter()
            .enumerate()
            .map(|(bit, pin)| u8::from(pin.is_set_high()) << bit)
            .sum()
    }
}

/// Records each rising edge of the signal line with the address it hit.
#[derive(Debug, Default)]
pub struct PulseTrace {
    pub pulses: Vec<(u64, u8)>,
    high: bool,
}

#[allow(dead_code)]
impl PulseTrace {
    pub fn observe(&mut self, pins: &ValvePins, now_ms: u64) {
        let high = pins.signal.is_set_high();
        if high && !self.high {
            self.pulses.push((now_ms, pins.address()));
        }
        self.high = high;
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.pulses.iter().map(|&(_, a)| a).collect()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

/// Tick `scheduler` every 10 ms over `[from, until)`, tracing pulses.
#[allow(dead_code)]
pub fn run_valves(
    scheduler: &mut Scheduler,
    pins: &ValvePins,
    trace: &mut PulseTrace,
    from: u64,
    until: u64,
) -> u64 {
    let mut t = from;
    while t < until {
        scheduler.run(t);
        trace.observe(pins, t);
        t += 10;
    }
    t
}

// ── Controller rig ────────────────────────────────────────────

pub type TestController = Controller<SimPin, NoDelay, Rc<MemStore>, Rc<FakeClock>>;

/// A whole controller on simulated hardware.
#[allow(dead_code)]
pub struct Rig {
    pub controller: TestController,
    pub store: Rc<MemStore>,
    pub clock: Rc<FakeClock>,
    pub valves: ValvePins,
    pub pump: SimPin,
    pub uv: SimPin,
    pub panel: FakePanel,
    pub events: EventLog,
    pub trace: PulseTrace,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(time: u32) -> Self {
        Self::with_store(Rc::new(MemStore::new()), time)
    }

    /// Boot a controller over an existing store, as after a reboot.
    pub fn with_store(store: Rc<MemStore>, time: u32) -> Self {
        let clock = Rc::new(FakeClock::new(time));
        let valves = ValvePins::default();
        let (pump, uv) = (SimPin::new(), SimPin::new());
        let controller = Controller::new(
            Rc::clone(&clock),
            Rc::clone(&store),
            valves.scheduler(0),
            pump.clone(),
            uv.clone(),
        );
        Self {
            controller,
            store,
            clock,
            valves,
            pump,
            uv,
            panel: FakePanel::default(),
            events: EventLog::default(),
            trace: PulseTrace::default(),
            now_ms: 0,
        }
    }

    /// Run 10 ms ticks for `ms`, advancing the wall clock by whole seconds.
    pub fn run_ms(&mut self, ms: u64) {
        let end = self.now_ms + ms;
        while self.now_ms < end {
            self.controller
                .tick(self.now_ms, &mut self.panel, &mut self.events);
            self.trace.observe(&self.valves, self.now_ms);
            self.now_ms += 10;
            if self.now_ms % 1_000 == 0 {
                self.clock.advance(1);
            }
        }
    }

    pub fn run_secs(&mut self, secs: u64) {
        self.run_ms(secs * 1_000);
    }

    pub fn source_on(&self, index: usize) -> bool {
        self.valves.sources[index].is_set_high()
    }

    pub fn cmd(&mut self, cmd: Command) -> Result<Reply> {
        self.controller.handle_command(cmd, &mut self.events)
    }

    /// Irrigation command that must succeed.
    pub fn irr(&mut self, cmd: IrrigationCommand) -> Reply {
        self.cmd(Command::Irrigation(cmd.clone()))
            .unwrap_or_else(|e| panic!("{cmd:?} failed: {e}"))
    }

    /// Pool command that must succeed.
    pub fn pool(&mut self, cmd: PoolCommand) -> Reply {
        self.cmd(Command::Pool(cmd))
            .unwrap_or_else(|e| panic!("{cmd:?} failed: {e}"))
    }

    /// Configure and enable irrigation group `idx`.
    pub fn setup_group(&mut self, idx: u8, zones: u16, source: u8, duration: u16, period: u8, time_of_day: u16) {
        use aquaplc::valves::zones::ZoneMask;
        use IrrigationCommand as Irr;

        self.irr(Irr::SetGroupZones(idx, ZoneMask::from_bits(zones)));
        self.irr(Irr::SetGroupSource(idx, source));
        self.irr(Irr::SetGroupDuration(idx, duration));
        self.irr(Irr::SetGroupPeriod(idx, period));
        self.irr(Irr::SetGroupTimeOfDay(idx, time_of_day));
        self.irr(Irr::SetGroupEnabled(idx, true));
    }
}
