//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                  |
//! |------------|--------------|------------------------------|
//! | `log_sink` | EventSink    | Serial log output            |
//! | `nvs`      | StoragePort  | NVS / in-memory store        |
//! | `time`     | WallClock    | RTC wall time, system timer  |
//!
//! Panel inputs ([`SensorPort`](crate::app::ports::SensorPort)) are served
//! by [`InputHub`](crate::sensors::InputHub) over any `embedded_hal` pin.

pub mod log_sink;
pub mod nvs;
pub mod time;
