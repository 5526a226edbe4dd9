//! Electrovalve scheduler: the only writer of valve and source state.
//!
//! ```text
//!            submit               zones open, source on
//!   ┌──────┐ ─────▶ ┌──────────┐ ─────────────────────▶ ┌─────────┐
//!   │ Idle │        │ Starting │                        │ Running │◀──┐
//!   └──────┘ ◀───┐  └──────────┘                        └─────────┘   │
//!                │                  duration elapsed,     │    │      │
//!                │               next job on same source  │    │      │
//!                │        ┌───────────────────────────────┘    │      │
//!                │        ▼                                    │      │
//!                │  ┌───────────────┐  next open ┌──────────┐  │      │
//!                │  │ OpeningNext   │ ─────────▶ │ Closing  │ ─┼──────┘
//!                │  └───────────────┘            │ Current  │  │
//!                │                               └──────────┘  │ elapsed / cancel
//!                │  ┌──────────┐                               │
//!                └──│ Stopping │ ◀─────────────────────────────┘
//!                   └──────────┘
//! ```
//!
//! Every tick does a bounded amount of work.  A pulse in flight blocks all
//! other progress; cancellations queue up and are applied only from
//! `Running` (forced stop) or `Idle` (drop jobs that have not started).
//! `Stopping` holds until the source confirms off.

pub mod queue;
pub mod zones;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::app::ports::JobPort;
use crate::config::ZONE_COUNT;
use crate::drivers::valve_actuator::ValveActuator;

use queue::{CancelQueue, CancelRequest, Job, JobQueue};
use zones::ZoneMask;

/// Minimum off-time of a source before it may be energized again.
pub const BETWEEN_SOURCES_MS: u64 = 3_000;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    OpeningNext,
    ClosingCurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Idle,
    Starting,
    Running,
    Transitioning(TransitionPhase),
    Stopping,
}

impl ValveState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Transitioning(TransitionPhase::OpeningNext) => "OpeningNext",
            Self::Transitioning(TransitionPhase::ClosingCurrent) => "ClosingCurrent",
            Self::Stopping => "Stopping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Open,
    Close,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct ElectrovalveScheduler<P, D> {
    actuator: ValveActuator<P, D>,
    jobs: JobQueue,
    cancels: CancelQueue,
    state: ValveState,
    source_off_ms: u64,
    /// Zone cursor of the close-everything sweep that follows a reset.
    sweep: Option<u8>,
    changed: bool,
}

impl<P: OutputPin, D: DelayNs> ElectrovalveScheduler<P, D> {
    /// Take ownership of the valve hardware and start with a full reset, so
    /// every zone is driven closed before the first job runs.
    pub fn new(actuator: ValveActuator<P, D>, now_ms: u64) -> Self {
        let mut scheduler = Self {
            actuator,
            jobs: JobQueue::new(),
            cancels: CancelQueue::new(),
            state: ValveState::Idle,
            source_off_ms: now_ms,
            sweep: None,
            changed: false,
        };
        scheduler.reset(now_ms);
        scheduler
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn source_state(&self, index: u8) -> bool {
        self.actuator.source_on(index)
    }

    pub fn queued_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// True while the post-reset close sweep is still pulsing.
    pub fn is_sweeping(&self) -> bool {
        self.sweep.is_some()
    }

    pub fn actuator(&self) -> &ValveActuator<P, D> {
        &self.actuator
    }

    // ── Tick ──────────────────────────────────────────────────

    /// Advance the state machine by one step.
    pub fn run(&mut self, now_ms: u64) {
        if self.actuator.pulse_active() {
            if self.actuator.pulse_elapsed(now_ms) {
                if let Err(e) = self.actuator.end_pulse() {
                    error!("Valves: failed to end pulse: {e}");
                }
            }
            return;
        }

        if let Some(request) = self.cancels.front() {
            match self.state {
                ValveState::Running => {
                    info!("Valves: cancel requested, stopping current job");
                    // A cancel-all stays queued so `Idle` drops the rest.
                    if request == CancelRequest::CancelCurrent {
                        self.cancels.pop();
                    }
                    self.transition(ValveState::Stopping);
                }
                ValveState::Idle => {
                    self.cancels.pop();
                    match request {
                        CancelRequest::CancelAll => {
                            self.jobs.clear();
                            self.cancels.clear();
                            info!("Valves: cancelled all pending jobs");
                        }
                        // A queued job has not touched the hardware yet,
                        // e.g. while the close sweep is still running.
                        CancelRequest::CancelCurrent => {
                            if self.jobs.pop_current().is_some() {
                                info!("Valves: cancelled job before it started");
                                self.changed = true;
                            }
                        }
                    }
                    return;
                }
                // Starting, Transitioning and Stopping finish first.
                _ => {}
            }
        }

        match self.state {
            ValveState::Idle => self.idle(now_ms),
            ValveState::Starting => self.starting(now_ms),
            ValveState::Running => self.running(now_ms),
            ValveState::Transitioning(TransitionPhase::OpeningNext) => self.opening_next(now_ms),
            ValveState::Transitioning(TransitionPhase::ClosingCurrent) => {
                self.closing_current(now_ms);
            }
            ValveState::Stopping => self.stopping(now_ms),
        }
    }

    /// De-energize everything, drop all jobs and cancellations, return to
    /// `Idle` and schedule a close pulse for every zone.
    pub fn reset(&mut self, now_ms: u64) {
        if self.actuator.pulse_active() && self.actuator.end_pulse().is_err() {
            error!("Valves: reset could not lower signal line");
        }
        if let Err(e) = self.actuator.sources_off() {
            error!("Valves: reset could not turn sources off: {e}");
        }
        self.jobs.clear();
        self.cancels.clear();
        self.state = ValveState::Idle;
        self.source_off_ms = now_ms;
        self.sweep = Some(0);
        self.changed = true;
    }

    // ── State handlers ────────────────────────────────────────

    fn idle(&mut self, now_ms: u64) {
        if let Some(zone) = self.sweep {
            if zone >= ZONE_COUNT {
                self.sweep = None;
            } else if self.actuator.is_ready(now_ms) {
                match self.actuator.close_zone(zone, now_ms) {
                    Ok(()) => self.sweep = Some(zone + 1),
                    Err(e) => warn!("Valves: close sweep zone {zone}: {e}"),
                }
            }
            return;
        }

        if !self.jobs.is_empty() {
            self.transition(ValveState::Starting);
        }
    }

    fn starting(&mut self, now_ms: u64) {
        let Some(job) = self.jobs.current_mut() else {
            return self.defensive_reset(now_ms);
        };
        if job.cursor.is_none()
            && now_ms.saturating_sub(self.source_off_ms) < BETWEEN_SOURCES_MS
        {
            return;
        }
        if !step_zones(&mut self.actuator, job, Latch::Open, ZoneMask::EMPTY, now_ms) {
            return;
        }

        let source = job.source;
        job.started_ms = now_ms;
        if let Err(e) = self.actuator.set_source(source, true) {
            error!("Valves: source {source} failed to start, abandoning job: {e}");
            self.transition(ValveState::Stopping);
            return;
        }
        self.changed = true;
        self.transition(ValveState::Running);
    }

    fn running(&mut self, now_ms: u64) {
        let Some(job) = self.jobs.current() else {
            return self.defensive_reset(now_ms);
        };
        if !job.elapsed(now_ms) {
            return;
        }
        let shares_source = self.jobs.next().is_some_and(|next| next.source == job.source);
        if shares_source {
            self.transition(ValveState::Transitioning(TransitionPhase::OpeningNext));
        } else {
            self.transition(ValveState::Stopping);
        }
    }

    fn opening_next(&mut self, now_ms: u64) {
        let Some(keep_open) = self.jobs.current().map(|j| j.zones) else {
            return self.defensive_reset(now_ms);
        };
        let Some(next) = self.jobs.next_mut() else {
            return self.defensive_reset(now_ms);
        };
        if step_zones(&mut self.actuator, next, Latch::Open, keep_open, now_ms) {
            next.started_ms = now_ms;
            self.transition(ValveState::Transitioning(TransitionPhase::ClosingCurrent));
        }
    }

    fn closing_current(&mut self, now_ms: u64) {
        let Some(still_needed) = self.jobs.next().map(|j| j.zones) else {
            return self.defensive_reset(now_ms);
        };
        let Some(job) = self.jobs.current_mut() else {
            return self.defensive_reset(now_ms);
        };
        if step_zones(&mut self.actuator, job, Latch::Close, still_needed, now_ms) {
            self.jobs.pop_current();
            self.changed = true;
            self.transition(ValveState::Running);
        }
    }

    fn stopping(&mut self, now_ms: u64) {
        let Some(job) = self.jobs.current_mut() else {
            return self.defensive_reset(now_ms);
        };
        // No zone closes against a source that may still be energized.
        if job.cursor.is_none() {
            if let Err(e) = self.actuator.set_source(job.source, false) {
                error!("Valves: source {} failed to stop, retrying: {e}", job.source);
                return;
            }
            self.source_off_ms = now_ms;
        }
        if step_zones(&mut self.actuator, job, Latch::Close, ZoneMask::EMPTY, now_ms) {
            self.jobs.pop_current();
            self.changed = true;
            self.transition(ValveState::Idle);
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, to: ValveState) {
        info!("Valves: {} -> {}", self.state.name(), to.name());
        self.state = to;
    }

    fn defensive_reset(&mut self, now_ms: u64) {
        error!(
            "Valves: inconsistent queue in state {}, resetting",
            self.state.name()
        );
        self.reset(now_ms);
    }
}

/// Pulse the job's zones one at a time in ascending order, skipping any in
/// `skip`.  Returns `true` once the sweep is complete; the cursor is then
/// cleared for the next sweep.
fn step_zones<P: OutputPin, D: DelayNs>(
    actuator: &mut ValveActuator<P, D>,
    job: &mut Job,
    latch: Latch,
    skip: ZoneMask,
    now_ms: u64,
) -> bool {
    let zones = job.zones;
    let zone = *job.cursor.get_or_insert_with(|| zones.next_zone(None));
    if zone >= ZONE_COUNT {
        job.cursor = None;
        return true;
    }
    if !actuator.is_ready(now_ms) {
        return false;
    }

    if !skip.contains(zone) {
        let res = match latch {
            Latch::Open => actuator.open_zone(zone, now_ms),
            Latch::Close => actuator.close_zone(zone, now_ms),
        };
        if let Err(e) = res {
            // Retried on a later tick; the cursor stays put.
            warn!("Valves: zone {zone} {latch:?} pulse failed: {e}");
            return false;
        }
    }
    job.cursor = Some(job.zones.next_zone(Some(zone)));
    false
}

// ---------------------------------------------------------------------------
// JobPort
// ---------------------------------------------------------------------------

impl<P: OutputPin, D: DelayNs> JobPort for ElectrovalveScheduler<P, D> {
    fn submit_job(&mut self, zones: ZoneMask, source: u8, duration_secs: u32) -> bool {
        let Some(job) = Job::new(zones, source, duration_secs) else {
            warn!(
                "Valves: rejected job zones=0b{:08b} source={source}",
                zones.bits()
            );
            return false;
        };
        if !self.jobs.push(job) {
            warn!("Valves: job queue full");
            return false;
        }
        info!(
            "Valves: queued job zones=0b{:08b} source={} duration={}s",
            job.zones.bits(),
            source,
            duration_secs
        );
        true
    }

    fn request_cancel_current(&mut self) {
        self.cancels.push(CancelRequest::CancelCurrent);
    }

    fn request_cancel_all(&mut self) {
        self.cancels.push(CancelRequest::CancelAll);
    }

    fn is_busy(&self) -> bool {
        !self.jobs.is_empty()
    }

    fn poll_state_changed(&mut self) -> bool {
        core::mem::take(&mut self.changed)
    }

    fn active_zones(&self) -> ZoneMask {
        self.jobs.current().map_or(ZoneMask::EMPTY, |j| j.zones)
    }
}
