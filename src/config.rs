//! Controller configuration records and hardware dimensions.
//!
//! Each record is persisted whole under its own [`RecordKey`] and carries
//! its factory-reset values in `Default`.
//!
//! [`RecordKey`]: crate::app::ports::RecordKey

use serde::{Deserialize, Serialize};

use crate::schedule::{MINUTES_PER_DAY, is_period_valid};
use crate::valves::zones::ZoneMask;

// --- Hardware dimensions ---

/// Wired irrigation zones.  The 4-bit multiplexer addresses two outputs per
/// zone, so at most 8 zones fit.
pub const ZONE_COUNT: u8 = 3;
/// Source 0 is the mains inlet valve, source 1 the pool irrigation pump.
pub const SOURCE_COUNT: u8 = 2;
/// Persisted irrigation schedule groups.
pub const GROUP_COUNT: u8 = 10;
/// Bytes available for a group name.
pub const GROUP_NAME_LEN: usize = 16;

const _: () = assert!(ZONE_COUNT >= 1 && ZONE_COUNT <= 8);

pub type GroupName = heapless::String<GROUP_NAME_LEN>;

// --- Irrigation ---

/// Global irrigation schedule settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationScheduleConfig {
    pub enabled: bool,
    /// Schedule is paused until this time (0 = not paused).
    pub paused_until: u32,
    /// A firing overdue by this many seconds is skipped.
    pub max_scheduled_turn_on_timeout: u16,
    /// Group durations must lie strictly between these bounds (seconds).
    pub min_scheduled_duration: u16,
    pub max_scheduled_duration: u16,
}

impl Default for IrrigationScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            paused_until: 0,
            max_scheduled_turn_on_timeout: 6 * 60 * 60,
            min_scheduled_duration: 10,
            max_scheduled_duration: 30 * 60,
        }
    }
}

impl IrrigationScheduleConfig {
    pub fn duration_in_bounds(&self, duration: u16) -> bool {
        duration > self.min_scheduled_duration && duration < self.max_scheduled_duration
    }
}

/// What the manual switch irrigates.  Not validated on write: an invalid
/// combination is refused at job submission and latches the manual lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IrrigationManualConfig {
    pub zones: ZoneMask,
    pub source: u8,
}

/// One recurring irrigation schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationGroup {
    pub enabled: bool,
    pub name: GroupName,
    pub zones: ZoneMask,
    pub source: u8,
    /// Hours between firings.
    pub period: u8,
    /// Seconds.
    pub duration: u16,
    /// Minutes since midnight.
    pub time_of_day: u16,
    /// Absolute time of the next firing.
    pub next_timestamp: u32,
}

impl Default for IrrigationGroup {
    fn default() -> Self {
        Self {
            enabled: false,
            name: GroupName::new(),
            zones: ZoneMask::EMPTY,
            source: 0,
            period: 24,
            duration: 0,
            time_of_day: 0,
            next_timestamp: 0,
        }
    }
}

impl IrrigationGroup {
    /// Structural checks shared by whole-record writes and record loading.
    pub fn is_well_formed(&self) -> bool {
        is_period_valid(self.period)
            && self.zones.is_within_range()
            && self.source < SOURCE_COUNT
            && self.time_of_day < MINUTES_PER_DAY
    }
}

// --- Pool ---

/// Recurring pump schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSchedule {
    pub enabled: bool,
    pub next_turn_on_time: u32,
    pub duration_minutes: u16,
    pub period_days: u8,
}

impl Default for PoolSchedule {
    fn default() -> Self {
        Self {
            enabled: false,
            next_turn_on_time: u32::MAX,
            duration_minutes: 0,
            period_days: 255,
        }
    }
}

/// Pump limits and UV/flow timing (all seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_scheduled_turn_on_timeout: u16,
    pub min_scheduled_duration: u16,
    pub max_scheduled_duration: u16,
    /// Grace period after pump start before missing flow counts.
    pub recirculation_max_turn_on_timeout: u8,
    /// How long flow must be absent before the pump is cut.
    pub recirculation_stop_detection_timeout: u8,
    /// Flow must be stable this long before UV switches on or off.
    pub uv_turn_on_off_delay: u8,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_scheduled_turn_on_timeout: 60 * 60,
            min_scheduled_duration: 5 * 60,
            max_scheduled_duration: 12 * 60 * 60,
            recirculation_max_turn_on_timeout: 30,
            recirculation_stop_detection_timeout: 5,
            uv_turn_on_off_delay: 5,
        }
    }
}
