//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (panel inputs, storage, clock, event sinks) implement
//! these traits.  The supervisors consume them via generics, so the domain
//! core never touches hardware directly.

use core::fmt;
use std::rc::Rc;

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sensors::PanelInputs;
use crate::valves::zones::ZoneMask;

// ───────────────────────────────────────────────────────────────
// Tick
// ───────────────────────────────────────────────────────────────

/// Per-cycle state handed to every supervisor by the tick source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlTick {
    /// Wall-clock Unix time in seconds.
    pub time: u32,
    /// Position of the panel auto-mode switch.
    pub auto_mode: bool,
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller calls this once per tick.
pub trait SensorPort {
    /// Sample every panel input and return a debounced snapshot.
    fn read_inputs(&mut self, now_ms: u64) -> PanelInputs;
}

// ───────────────────────────────────────────────────────────────
// Job port (irrigation supervisor → valve scheduler)
// ───────────────────────────────────────────────────────────────

/// The slice of the valve scheduler the irrigation supervisor drives.
pub trait JobPort {
    /// Queue a job.  Returns `false` without side effects when the zones,
    /// source or queue capacity forbid it.
    fn submit_job(&mut self, zones: ZoneMask, source: u8, duration_secs: u32) -> bool;

    /// Ask the scheduler to stop the running job at its next safe point.
    /// A job that has not started yet is dropped instead.
    fn request_cancel_current(&mut self);

    /// Ask the scheduler to stop the running job and drop every queued one.
    fn request_cancel_all(&mut self);

    /// True while any job is queued or running.
    fn is_busy(&self) -> bool;

    /// Return and clear the "a source or job toggled" flag.
    fn poll_state_changed(&mut self) -> bool;

    /// Zones of the job currently being actuated.
    fn active_zones(&self) -> ZoneMask;
}

// ───────────────────────────────────────────────────────────────
// Wall clock port
// ───────────────────────────────────────────────────────────────

/// Settable wall clock shared by the controller and its supervisors.
pub trait WallClock {
    /// Unix time in seconds.
    fn now(&self) -> u32;

    /// Set the wall time.  Callers must then run the controller's
    /// clock-change hooks.
    fn set(&self, time: u32);
}

impl<C: WallClock + ?Sized> WallClock for &C {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn set(&self, time: u32) {
        (**self).set(time)
    }
}

impl<C: WallClock + ?Sized> WallClock for Rc<C> {
    fn now(&self) -> u32 {
        (**self).now()
    }

    fn set(&self, time: u32) {
        (**self).set(time)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Methods take `&self` so one store can back several supervisors;
/// implementations use interior mutability.  Writes MUST be atomic per key.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

impl<S: StoragePort + ?Sized> StoragePort for &S {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(namespace, key, buf)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, data)
    }
}

impl<S: StoragePort + ?Sized> StoragePort for Rc<S> {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(namespace, key, buf)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, data)
    }
}

// ───────────────────────────────────────────────────────────────
// Typed records on top of the storage port
// ───────────────────────────────────────────────────────────────

/// NVS namespace holding every controller record.
pub const RECORD_NAMESPACE: &str = "plc";

/// Upper bound of one encoded record.
pub const MAX_RECORD_SIZE: usize = 64;

/// Logical identifier of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    IrrigationSchedule,
    IrrigationManual,
    IrrigationGroup(u8),
    PoolSchedule,
    PoolConfig,
}

impl RecordKey {
    /// NVS key (≤ 15 bytes).
    pub fn storage_key(self) -> heapless::String<15> {
        let mut key = heapless::String::new();
        let res = match self {
            Self::IrrigationSchedule => key.push_str("irr_sched"),
            Self::IrrigationManual => key.push_str("irr_manual"),
            Self::IrrigationGroup(idx) => fmt::write(&mut key, format_args!("irr_grp{idx}"))
                .map_err(|_| ()),
            Self::PoolSchedule => key.push_str("pool_sched"),
            Self::PoolConfig => key.push_str("pool_cfg"),
        };
        debug_assert!(res.is_ok(), "record key overflow");
        key
    }
}

/// Typed get/put of whole records, encoded with postcard.
pub trait RecordStore {
    /// `Ok(None)` when the record was never written.
    fn load<T: DeserializeOwned>(&self, key: RecordKey) -> Result<Option<T>, StorageError>;

    fn save<T: Serialize>(&self, key: RecordKey, record: &T) -> Result<(), StorageError>;

    /// Load a record, falling back to its default when missing or unreadable.
    fn load_or_default<T: DeserializeOwned + Default>(&self, key: RecordKey) -> T {
        match self.load(key) {
            Ok(Some(record)) => record,
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Record {:?} unreadable ({}), using defaults", key, e);
                T::default()
            }
        }
    }
}

impl<S: StoragePort + ?Sized> RecordStore for S {
    fn load<T: DeserializeOwned>(&self, key: RecordKey) -> Result<Option<T>, StorageError> {
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let len = match self.read(RECORD_NAMESPACE, &key.storage_key(), &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        postcard::from_bytes(&buf[..len])
            .map(Some)
            .map_err(|_| StorageError::Corrupted)
    }

    fn save<T: Serialize>(&self, key: RecordKey, record: &T) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_RECORD_SIZE];
        let bytes = postcard::to_slice(record, &mut buf).map_err(|_| StorageError::TooLarge)?;
        self.write(RECORD_NAMESPACE, &key.storage_key(), bytes)
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] and [`RecordStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Generic I/O error.
    IoError,
    /// Stored bytes do not decode as the expected record.
    Corrupted,
    /// Record does not fit the encoding buffer.
    TooLarge,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::TooLarge => write!(f, "record too large"),
        }
    }
}
