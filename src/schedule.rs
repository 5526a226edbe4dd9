//! Pure schedule arithmetic on absolute Unix timestamps (seconds).
//!
//! Nothing in here reads a clock: every function takes the current time
//! as an argument, so the rescheduling rules are testable in isolation.
//!
//! ```text
//!   next ──────┬──── period ────┬──── period ────┬───▶
//!              │                │        ▲       │
//!           (missed)         (missed)   now   new next
//! ```
//!
//! Advancing always lands strictly after `now` on the original grid, so a
//! controller that was powered off for days resumes on its normal phase.

pub const SECS_PER_MINUTE: u32 = 60;
pub const SECS_PER_HOUR: u32 = 3_600;
pub const SECS_PER_DAY: u32 = 86_400;
pub const MINUTES_PER_DAY: u16 = 1_440;

/// Hours between recurring group firings are valid when 1–23 divide a day
/// evenly or when ≥24 they are a whole number of days.
pub const fn is_period_valid(hours: u8) -> bool {
    match hours {
        0 => false,
        1..=23 => 24 % hours == 0,
        _ => hours % 24 == 0,
    }
}

/// Move `next` forward by whole multiples of `period_secs` until it is
/// strictly after `now`.  A `next` already in the future still advances by
/// one period, mirroring a firing that just happened.
///
/// Saturates at `u32::MAX` rather than wrapping.
pub fn advance_past(now: u32, next: u32, period_secs: u32) -> u32 {
    let period = u64::from(period_secs.max(1));
    let elapsed = u64::from(now.saturating_sub(next));
    let steps = elapsed / period + 1;
    let advanced = u64::from(next) + steps * period;
    u32::try_from(advanced).unwrap_or(u32::MAX)
}

/// A firing is missed once it is `timeout_secs` or more overdue.
pub const fn is_missed(now: u32, next: u32, timeout_secs: u32) -> bool {
    now.saturating_sub(next) >= timeout_secs
}

/// Rescheduling period for an irrigation group.
///
/// A period of 0 is treated as daily.  A missed firing re-anchors to at
/// most 24 h so the group recovers within a day.
pub fn group_period_secs(period_hours: u8, missed: bool) -> u32 {
    let hours = if period_hours == 0 { 24 } else { u32::from(period_hours) };
    let hours = if missed { hours.min(24) } else { hours };
    hours * SECS_PER_HOUR
}

/// Rescheduling period for the pool pump, in whole days (0 is daily).
pub fn pool_period_secs(period_days: u8) -> u32 {
    u32::from(period_days.max(1)) * SECS_PER_DAY
}

/// Next occurrence of `minutes` past midnight (UTC day boundaries): today
/// if that moment is not yet past, otherwise tomorrow.
pub fn next_time_of_day(now: u32, minutes: u16) -> u32 {
    let midnight = now - now % SECS_PER_DAY;
    let today = midnight.saturating_add(u32::from(minutes) * SECS_PER_MINUTE);
    if today < now {
        today.saturating_add(SECS_PER_DAY)
    } else {
        today
    }
}
