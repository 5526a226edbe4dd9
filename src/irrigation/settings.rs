//! Configuration API of the irrigation supervisor.
//!
//! Every setter validates first.  A rejected call returns
//! [`Error::Rejected`] and leaves memory, storage and the last-change
//! counter untouched; an accepted call persists the affected record and
//! bumps the counter even when the value did not change.

use log::info;

use super::IrrigationSupervisor;
use crate::app::ports::{RecordStore, WallClock};
use crate::config::{
    GROUP_COUNT, GroupName, IrrigationGroup, IrrigationManualConfig, IrrigationScheduleConfig,
    SOURCE_COUNT,
};
use crate::error::{Rejection, Result};
use crate::schedule::{MINUTES_PER_DAY, is_period_valid, next_time_of_day};
use crate::valves::zones::ZoneMask;

impl<S: RecordStore, C: WallClock> IrrigationSupervisor<S, C> {
    // ── Manual configuration ──────────────────────────────────

    pub fn manual_zones(&self) -> ZoneMask {
        self.manual.zones
    }

    /// Not validated; an unusable mask is refused when the switch is used.
    pub fn set_manual_zones(&mut self, zones: ZoneMask) {
        self.manual.zones = zones;
        self.save_manual();
        self.bump();
    }

    pub fn manual_source(&self) -> u8 {
        self.manual.source
    }

    pub fn set_manual_source(&mut self, source: u8) {
        self.manual.source = source;
        self.save_manual();
        self.bump();
    }

    // ── Global schedule ───────────────────────────────────────

    pub fn schedule_config(&self) -> &IrrigationScheduleConfig {
        &self.schedule
    }

    pub fn is_schedule_enabled(&self) -> bool {
        self.schedule.enabled
    }

    pub fn enable_schedule(&mut self) {
        self.set_schedule_enabled(true);
    }

    pub fn disable_schedule(&mut self) {
        self.set_schedule_enabled(false);
    }

    fn set_schedule_enabled(&mut self, enabled: bool) {
        info!("Irrigation: schedule {}", if enabled { "enabled" } else { "disabled" });
        self.schedule.enabled = enabled;
        self.save_schedule();
        self.bump();
    }

    /// Resume time, or 0 when not paused.
    pub fn schedule_paused_until(&self) -> u32 {
        self.schedule.paused_until
    }

    pub fn is_paused(&self) -> bool {
        self.schedule.paused_until != 0
    }

    /// Suspend periodic firings until `timestamp`.  Passing 0 resumes.
    pub fn pause_until(&mut self, timestamp: u32) {
        info!("Irrigation: schedule paused until {timestamp}");
        self.schedule.paused_until = timestamp;
        self.save_schedule();
        self.bump();
    }

    pub fn resume(&mut self) {
        self.pause_until(0);
    }

    /// Earliest upcoming firing among enabled groups.  `u32::MAX` when the
    /// schedule is off or no group is enabled.  A pause pushes the answer
    /// out to the resume time.
    pub fn next_irrigation_time(&self) -> u32 {
        if !self.schedule.enabled {
            return u32::MAX;
        }
        let next = self
            .groups
            .iter()
            .filter(|g| g.enabled)
            .map(|g| g.next_timestamp)
            .min()
            .unwrap_or(u32::MAX);
        if next == u32::MAX {
            next
        } else {
            next.max(self.schedule.paused_until)
        }
    }

    // ── Groups ────────────────────────────────────────────────

    pub fn group(&self, idx: u8) -> Option<&IrrigationGroup> {
        self.groups.get(idx as usize)
    }

    /// Bit `i` set when group `i` is enabled.
    pub fn groups_enable_mask(&self) -> u16 {
        self.groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.enabled)
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    pub fn is_group_enabled(&self, idx: u8) -> bool {
        self.group(idx).is_some_and(|g| g.enabled)
    }

    /// Enable a group; its next firing is the next occurrence of its
    /// time of day.
    pub fn enable_group(&mut self, idx: u8) -> Result<()> {
        let now = self.clock.now();
        self.edit_group(idx, |g| {
            g.enabled = true;
            g.next_timestamp = next_time_of_day(now, g.time_of_day);
        })
    }

    pub fn disable_group(&mut self, idx: u8) -> Result<()> {
        self.edit_group(idx, |g| g.enabled = false)
    }

    /// Replace a whole group record.  Its next firing is recomputed from
    /// the new time of day.
    pub fn update_group(&mut self, idx: u8, group: IrrigationGroup) -> Result<()> {
        if !group.is_well_formed() {
            return Err(if !is_period_valid(group.period) {
                Rejection::Period
            } else if !group.zones.is_within_range() {
                Rejection::Zones
            } else if group.source >= SOURCE_COUNT {
                Rejection::Source
            } else {
                Rejection::TimeOfDay
            }
            .into());
        }
        let now = self.clock.now();
        self.edit_group(idx, |g| {
            *g = group;
            g.next_timestamp = next_time_of_day(now, g.time_of_day);
        })
    }

    /// Restore a group to its disabled factory state.
    pub fn reset_group(&mut self, idx: u8) -> Result<()> {
        self.edit_group(idx, |g| *g = IrrigationGroup::default())
    }

    pub fn group_name(&self, idx: u8) -> Option<&str> {
        self.group(idx).map(|g| g.name.as_str())
    }

    pub fn set_group_name(&mut self, idx: u8, name: &str) -> Result<()> {
        let name = GroupName::try_from(name).map_err(|_| Rejection::NameTooLong)?;
        self.edit_group(idx, |g| g.name = name)
    }

    pub fn group_zones(&self, idx: u8) -> Option<ZoneMask> {
        self.group(idx).map(|g| g.zones)
    }

    pub fn set_group_zones(&mut self, idx: u8, zones: ZoneMask) -> Result<()> {
        if !zones.is_within_range() {
            return Err(Rejection::Zones.into());
        }
        self.edit_group(idx, |g| g.zones = zones)
    }

    pub fn group_source(&self, idx: u8) -> Option<u8> {
        self.group(idx).map(|g| g.source)
    }

    pub fn set_group_source(&mut self, idx: u8, source: u8) -> Result<()> {
        if source >= SOURCE_COUNT {
            return Err(Rejection::Source.into());
        }
        self.edit_group(idx, |g| g.source = source)
    }

    pub fn group_period(&self, idx: u8) -> Option<u8> {
        self.group(idx).map(|g| g.period)
    }

    pub fn set_group_period(&mut self, idx: u8, period: u8) -> Result<()> {
        if !is_period_valid(period) {
            return Err(Rejection::Period.into());
        }
        let now = self.clock.now();
        self.edit_group(idx, |g| {
            g.period = period;
            g.next_timestamp = next_time_of_day(now, g.time_of_day);
        })
    }

    pub fn group_duration(&self, idx: u8) -> Option<u16> {
        self.group(idx).map(|g| g.duration)
    }

    /// Seconds.  Must exceed the configured minimum.
    pub fn set_group_duration(&mut self, idx: u8, duration: u16) -> Result<()> {
        if duration <= self.schedule.min_scheduled_duration {
            return Err(Rejection::Duration.into());
        }
        self.edit_group(idx, |g| g.duration = duration)
    }

    pub fn group_time_of_day(&self, idx: u8) -> Option<u16> {
        self.group(idx).map(|g| g.time_of_day)
    }

    /// Minutes since midnight.
    pub fn set_group_time_of_day(&mut self, idx: u8, minutes: u16) -> Result<()> {
        if minutes >= MINUTES_PER_DAY {
            return Err(Rejection::TimeOfDay.into());
        }
        let now = self.clock.now();
        self.edit_group(idx, |g| {
            g.time_of_day = minutes;
            g.next_timestamp = next_time_of_day(now, minutes);
        })
    }

    pub fn group_next_timestamp(&self, idx: u8) -> Option<u32> {
        self.group(idx).map(|g| g.next_timestamp)
    }

    // ── Factory reset ─────────────────────────────────────────

    /// Restore schedule, manual and every group record to defaults.
    pub fn reset(&mut self) {
        info!("Irrigation: factory reset");
        self.schedule = IrrigationScheduleConfig::default();
        self.save_schedule();
        self.manual = IrrigationManualConfig::default();
        self.save_manual();
        for idx in 0..GROUP_COUNT {
            self.groups[idx as usize] = IrrigationGroup::default();
            self.save_group(idx);
        }
        self.run_now.clear();
        self.bump();
    }

    /// Apply `edit` to group `idx`, then persist it and bump the counter.
    fn edit_group(&mut self, idx: u8, edit: impl FnOnce(&mut IrrigationGroup)) -> Result<()> {
        let group = self
            .groups
            .get_mut(idx as usize)
            .ok_or(Rejection::GroupIndex)?;
        edit(group);
        self.save_group(idx);
        self.bump();
        Ok(())
    }
}
