//! Inbound commands to the controller.
//!
//! One variant per logical quantity the panel dispatcher can read or
//! write.  The dispatcher decodes its wire protocol into a [`Command`],
//! hands it to [`Controller::handle_command`] and encodes the [`Reply`].
//!
//! [`Controller::handle_command`]: super::service::Controller::handle_command

use crate::config::GroupName;
use crate::valves::zones::ZoneMask;

/// Commands that external adapters can send into the controller core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Controller-wide last-change time.
    GetLastChange,
    GetAutoMode,
    GetClock,
    /// Set the wall clock and cancel everything timed against it.
    SetClock(u32),
    Pool(PoolCommand),
    Irrigation(IrrigationCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolCommand {
    GetLastChange,
    GetState,
    GetPumpState,
    GetUvState,
    GetManualInput,
    GetUvEnableInput,
    GetFlowInput,
    GetManualLock,
    GetScheduleEnabled,
    SetScheduleEnabled(bool),
    GetNextTurnOnTime,
    SetNextTurnOnTime(u32),
    /// Minutes.
    GetDuration,
    SetDuration(u16),
    GetPeriodDays,
    SetPeriodDays(u8),
    FaultFlags,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrrigationCommand {
    GetLastChange,
    GetState,
    /// Source 1, the pool irrigation pump.
    GetPumpState,
    /// Source 0, the mains inlet valve.
    GetMainsInletState,
    GetManualInput,
    GetPressureInput,
    GetManualLock,
    GetZonesState,
    GetManualZones,
    SetManualZones(ZoneMask),
    GetManualSource,
    SetManualSource(u8),
    GetScheduleEnabled,
    SetScheduleEnabled(bool),
    GetPaused,
    PauseUntil(u32),
    Resume,
    GetResumeTime,
    GetNextIrrigationTime,
    GetGroupsEnableMask,
    GetGroupEnabled(u8),
    SetGroupEnabled(u8, bool),
    GetGroupName(u8),
    SetGroupName(u8, GroupName),
    GetGroupZones(u8),
    SetGroupZones(u8, ZoneMask),
    GetGroupSource(u8),
    SetGroupSource(u8, u8),
    GetGroupPeriod(u8),
    SetGroupPeriod(u8, u8),
    GetGroupDuration(u8),
    SetGroupDuration(u8, u16),
    GetGroupTimeOfDay(u8),
    SetGroupTimeOfDay(u8, u16),
    GetGroupNextTime(u8),
    RunGroupNow(u8),
    CancelCurrent,
    CancelAll,
    ResetGroup(u8),
    Reset,
}

/// Result of a successfully handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A mutating command was applied.
    Done,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    Zones(ZoneMask),
    Name(GroupName),
}
