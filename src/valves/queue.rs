//! Pending actuation jobs and cancellation intents.

use heapless::Deque;
use log::warn;

use crate::config::SOURCE_COUNT;
use crate::valves::zones::ZoneMask;

/// Jobs that may wait behind the running one.
pub const JOB_QUEUE_CAPACITY: usize = 16;
/// Cancellation intents awaiting a safe point.
pub const CANCEL_QUEUE_CAPACITY: usize = 8;

/// One actuation request: open `zones`, feed them from `source` for
/// `duration_secs`, then close them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub zones: ZoneMask,
    pub source: u8,
    pub duration_secs: u32,
    /// Zone the next pulse addresses; `None` until a pulse sweep begins.
    pub cursor: Option<u8>,
    pub started_ms: u64,
}

impl Job {
    /// Validate and build a job.  Zones outside the wired range are dropped.
    pub fn new(zones: ZoneMask, source: u8, duration_secs: u32) -> Option<Self> {
        if !zones.has_valid_zone() || source >= SOURCE_COUNT {
            return None;
        }
        Some(Self {
            zones: zones.clamped(),
            source,
            duration_secs,
            cursor: None,
            started_ms: 0,
        })
    }

    pub fn elapsed(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_ms) >= u64::from(self.duration_secs) * 1_000
    }
}

/// FIFO of jobs.  The front is the current job, the one behind it the
/// lookahead used for source-sharing transitions.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Deque<Job, JOB_QUEUE_CAPACITY>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job; `false` when full.
    pub fn push(&mut self, job: Job) -> bool {
        self.jobs.push_back(job).is_ok()
    }

    pub fn current(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn current_mut(&mut self) -> Option<&mut Job> {
        self.jobs.front_mut()
    }

    pub fn next(&self) -> Option<&Job> {
        self.jobs.iter().nth(1)
    }

    pub fn next_mut(&mut self) -> Option<&mut Job> {
        self.jobs.iter_mut().nth(1)
    }

    /// Discard the current job; the next one becomes current.
    pub fn pop_current(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// A deferred cancellation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelRequest {
    CancelCurrent,
    CancelAll,
}

/// Ordered pending cancellations, consumed only at safe points.
#[derive(Debug, Default)]
pub struct CancelQueue {
    requests: Deque<CancelRequest, CANCEL_QUEUE_CAPACITY>,
}

impl CancelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request.  When full, a cancel-all supersedes everything
    /// pending; a cancel-current is dropped.
    pub fn push(&mut self, request: CancelRequest) {
        if self.requests.push_back(request).is_ok() {
            return;
        }
        match request {
            CancelRequest::CancelAll => {
                self.requests.clear();
                // Capacity is non-zero, so this cannot fail after clear().
                let _ = self.requests.push_back(request);
            }
            CancelRequest::CancelCurrent => {
                warn!("Cancel queue full, dropping cancel-current");
            }
        }
    }

    pub fn front(&self) -> Option<CancelRequest> {
        self.requests.front().copied()
    }

    pub fn pop(&mut self) -> Option<CancelRequest> {
        self.requests.pop_front()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
