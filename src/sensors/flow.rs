//! Recirculation flow edge tracking.
//!
//! The flow switch only says "flowing or not"; the pump failsafe and the UV
//! interlock also need to know for how long.  [`FlowMonitor`] timestamps
//! each edge so both can ask "flowing for at least N seconds".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    Unknown,
    Flowing { since: u32 },
    Stopped { since: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct FlowMonitor {
    state: FlowState,
}

impl Default for FlowMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowMonitor {
    pub const fn new() -> Self {
        Self {
            state: FlowState::Unknown,
        }
    }

    /// Record the current flow reading at wall time `now`.
    pub fn sample(&mut self, flowing: bool, now: u32) {
        self.state = match (self.state, flowing) {
            (FlowState::Flowing { since }, true) => FlowState::Flowing { since },
            (FlowState::Stopped { since }, false) => FlowState::Stopped { since },
            (_, true) => FlowState::Flowing { since: now },
            (_, false) => FlowState::Stopped { since: now },
        };
    }

    pub fn is_flowing(&self) -> bool {
        matches!(self.state, FlowState::Flowing { .. })
    }

    /// Seconds of continuous flow, or `None` if not flowing.
    pub fn flowing_for(&self, now: u32) -> Option<u32> {
        match self.state {
            FlowState::Flowing { since } => Some(now.saturating_sub(since)),
            _ => None,
        }
    }

    /// Seconds without flow, or `None` if flowing or never sampled.
    pub fn stopped_for(&self, now: u32) -> Option<u32> {
        match self.state {
            FlowState::Stopped { since } => Some(now.saturating_sub(since)),
            _ => None,
        }
    }
}
