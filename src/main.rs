//! AquaPLC firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  InputHub         LogEventSink   NvsStore      SystemClock     │
//! │  (SensorPort)     (EventSink)    (StoragePort) (WallClock)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Irrigation · Pool · ElectrovalveScheduler             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One cooperative loop: every [`pins::CONTROL_TICK_MS`] the controller
//! reads the panel, runs both supervisors and advances the valve
//! scheduler.  Nothing in a tick blocks beyond the multiplexer settle delay.
#![deny(unused_must_use)]

use std::rc::Rc;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use log::info;

use aquaplc::adapters::log_sink::LogEventSink;
use aquaplc::adapters::nvs::NvsStore;
use aquaplc::adapters::time::SystemClock;
use aquaplc::app::service::Controller;
use aquaplc::drivers::valve_actuator::ValveActuator;
use aquaplc::pins;
use aquaplc::sensors::InputHub;
use aquaplc::valves::ElectrovalveScheduler;

type OutputDriver = PinDriver<'static, AnyOutputPin, Output>;
type InputDriver = PinDriver<'static, AnyInputPin, Input>;

fn output(gpio: i32) -> Result<OutputDriver> {
    // SAFETY: each GPIO number in `pins` is claimed exactly once, here.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    Ok(PinDriver::output(pin)?)
}

fn input(gpio: i32) -> Result<InputDriver> {
    // SAFETY: as for `output`.
    let pin = unsafe { AnyInputPin::new(gpio) };
    Ok(PinDriver::input(pin)?)
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AquaPLC v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Clock and persistence ──────────────────────────────
    let clock = Rc::new(SystemClock::new());
    let store = Rc::new(NvsStore::new().map_err(|e| anyhow!("NVS init failed: {e}"))?);

    // ── 3. Outputs ────────────────────────────────────────────
    let [a0, a1, a2, a3] = pins::MUX_ADDRESS_GPIOS;
    let actuator = ValveActuator::new(
        [output(a0)?, output(a1)?, output(a2)?, output(a3)?],
        output(pins::MUX_SIGNAL_GPIO)?,
        [output(pins::MAINS_INLET_GPIO)?, output(pins::IRRIGATION_PUMP_GPIO)?],
        Ets,
    );
    let valves = ElectrovalveScheduler::new(actuator, clock.uptime_ms());

    let mut controller = Controller::new(
        Rc::clone(&clock),
        store,
        valves,
        output(pins::POOL_PUMP_GPIO)?,
        output(pins::UV_LIGHT_GPIO)?,
    );

    // ── 4. Panel inputs ───────────────────────────────────────
    let [i0, i1, i2, i3, i4, i5] = pins::PANEL_INPUT_GPIOS;
    let mut panel = InputHub::new([
        input(i0)?,
        input(i1)?,
        input(i2)?,
        input(i3)?,
        input(i4)?,
        input(i5)?,
    ]);

    // ── 5. Control loop ───────────────────────────────────────
    let mut sink = LogEventSink::new();
    controller.start(&mut sink);

    loop {
        controller.tick(clock.uptime_ms(), &mut panel, &mut sink);
        FreeRtos::delay_ms(pins::CONTROL_TICK_MS);
    }
}
