//! GPIO pin assignments for the PLC main board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Relay outputs are active HIGH.  Panel inputs are opto-isolated and read
//! HIGH when the switch or sensor contact is closed.

// ---------------------------------------------------------------------------
// Relay outputs
// ---------------------------------------------------------------------------

/// Pool recirculation pump.
pub const POOL_PUMP_GPIO: i32 = 4;
/// UV disinfection light.
pub const UV_LIGHT_GPIO: i32 = 5;
/// Irrigation source 0: mains water inlet valve.
pub const MAINS_INLET_GPIO: i32 = 6;
/// Irrigation source 1: pool irrigation pump.
pub const IRRIGATION_PUMP_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Valve multiplexer (latching solenoids)
// ---------------------------------------------------------------------------

/// Address lines A0..A3, least significant first.
pub const MUX_ADDRESS_GPIOS: [i32; 4] = [15, 16, 17, 18];
/// Pulse line routed to the addressed output.
pub const MUX_SIGNAL_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Panel inputs, in `InputHub` order
// ---------------------------------------------------------------------------

pub const AUTO_MODE_GPIO: i32 = 9;
pub const POOL_MANUAL_GPIO: i32 = 10;
pub const UV_ENABLE_GPIO: i32 = 11;
pub const IRRIGATION_MANUAL_GPIO: i32 = 12;
pub const RECIRCULATION_FLOW_GPIO: i32 = 13;
pub const IRRIGATION_PRESSURE_GPIO: i32 = 14;

/// Panel inputs in the order [`InputHub::new`](crate::sensors::InputHub::new)
/// expects them.
pub const PANEL_INPUT_GPIOS: [i32; 6] = [
    AUTO_MODE_GPIO,
    POOL_MANUAL_GPIO,
    UV_ENABLE_GPIO,
    IRRIGATION_MANUAL_GPIO,
    RECIRCULATION_FLOW_GPIO,
    IRRIGATION_PRESSURE_GPIO,
];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Control loop period.  Short enough that 100 ms valve pulses end on time.
pub const CONTROL_TICK_MS: u32 = 10;
