//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production, stderr on host).
//! A panel telemetry adapter would implement the same trait.

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | controller up"),
            AppEvent::AutoModeChanged(on) => {
                info!("AUTO  | {}", if *on { "on" } else { "off" });
            }
            AppEvent::IrrigationStateChanged { from, to } => {
                info!("IRR   | {:?} -> {:?}", from, to);
            }
            AppEvent::PoolStateChanged { from, to } => {
                info!("POOL  | {:?} -> {:?}", from, to);
            }
            AppEvent::ValvesChanged { zones } => {
                info!("VALVE | zones=0b{:08b}", zones.bits());
            }
            AppEvent::PumpFailsafe(fault) => {
                error!("FAULT | pool pump stopped: {}", fault);
            }
            AppEvent::ClockChanged { time } => {
                info!("CLOCK | set to {}", time);
            }
        }
    }
}
