//! Wall-clock and uptime adapter.
//!
//! - **`target_os = "espidf"`**: wall time from `gettimeofday`/`settimeofday`
//!   (kept by the RTC across light sleep), uptime from `esp_timer_get_time()`.
//! - **`not(target_os = "espidf")`**: wall time is an offset over
//!   `std::time::Instant`, so host simulations can set it freely.
//!
//! An unset clock never reports a time before [`CLOCK_FLOOR`].

use log::warn;

use crate::app::ports::WallClock;

/// 2022-01-01T00:00:00+01:00.
pub const CLOCK_FLOOR: u32 = 1_640_991_600;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    base: core::cell::Cell<u32>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        let clock = Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            base: core::cell::Cell::new(CLOCK_FLOOR),
        };
        if clock.raw_now() < CLOCK_FLOOR {
            warn!("SystemClock: wall clock unset, starting from {CLOCK_FLOOR}");
            clock.set(CLOCK_FLOOR);
        }
        clock
    }

    /// Milliseconds since boot (monotonic).  Valve pulse timing runs on
    /// this, never on wall time.
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn raw_now(&self) -> u32 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; a null timezone is allowed.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        u32::try_from(tv.tv_sec).unwrap_or(0)
    }

    #[cfg(not(target_os = "espidf"))]
    fn raw_now(&self) -> u32 {
        let elapsed = u32::try_from(self.start.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.base.get().saturating_add(elapsed)
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> u32 {
        self.raw_now().max(CLOCK_FLOOR)
    }

    #[cfg(target_os = "espidf")]
    fn set(&self, time: u32) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: time as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        // SAFETY: `tv` outlives the call; a null timezone is allowed.
        if unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) } != 0 {
            warn!("SystemClock: settimeofday failed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set(&self, time: u32) {
        let elapsed = u32::try_from(self.start.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.base.set(time.wrapping_sub(elapsed));
    }
}
