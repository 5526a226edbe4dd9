//! Panel inputs.
//!
//! | Input                 | Meaning when high                     |
//! |-----------------------|---------------------------------------|
//! | `auto_mode`           | scheduled actuation allowed           |
//! | `pool_manual`         | run the pool pump by hand             |
//! | `uv_enable`           | UV light may run with the pump        |
//! | `irrigation_manual`   | irrigate the manual zones by hand     |
//! | `recirculation_flow`  | flow switch closed                    |
//! | `irrigation_pressure` | pressure present on the irrigation line |

pub mod flow;
pub mod signal;

use embedded_hal::digital::InputPin;

use crate::app::ports::SensorPort;
use signal::SignalInput;

/// Debounced snapshot of every panel input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelInputs {
    pub auto_mode: bool,
    pub pool_manual: bool,
    pub uv_enable: bool,
    pub irrigation_manual: bool,
    pub recirculation_flow: bool,
    pub irrigation_pressure: bool,
}

/// Owns the six panel input lines.
pub struct InputHub<I> {
    auto_mode: SignalInput<I>,
    pool_manual: SignalInput<I>,
    uv_enable: SignalInput<I>,
    irrigation_manual: SignalInput<I>,
    recirculation_flow: SignalInput<I>,
    irrigation_pressure: SignalInput<I>,
}

impl<I: InputPin> InputHub<I> {
    /// Pins in panel order: auto mode, pool manual, UV enable, irrigation
    /// manual, recirculation flow, irrigation pressure.
    pub fn new(pins: [I; 6]) -> Self {
        let [auto_mode, pool_manual, uv_enable, irrigation_manual, flow, pressure] = pins;
        Self {
            auto_mode: SignalInput::new(auto_mode),
            pool_manual: SignalInput::new(pool_manual),
            uv_enable: SignalInput::new(uv_enable),
            irrigation_manual: SignalInput::new(irrigation_manual),
            recirculation_flow: SignalInput::new(flow),
            irrigation_pressure: SignalInput::new(pressure),
        }
    }
}

impl<I: InputPin> SensorPort for InputHub<I> {
    fn read_inputs(&mut self, now_ms: u64) -> PanelInputs {
        PanelInputs {
            auto_mode: self.auto_mode.sample(now_ms),
            pool_manual: self.pool_manual.sample(now_ms),
            uv_enable: self.uv_enable.sample(now_ms),
            irrigation_manual: self.irrigation_manual.sample(now_ms),
            recirculation_flow: self.recirculation_flow.sample(now_ms),
            irrigation_pressure: self.irrigation_pressure.sample(now_ms),
        }
    }
}
