//! Progress poller state: tick gating, response sequencing and staleness.
//!
//! The poller owns no timer. A driver calls [`Poller::tick`] on every poll
//! interval and [`Poller::check_staleness`] on every stale-check interval,
//! passing the current time where it matters.

pub const POLL_INTERVAL_MS: u64 = 2_000;
pub const STALE_CHECK_INTERVAL_MS: u64 = 10_000;
pub const STALE_AFTER_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    #[default]
    Idle,
    Polling,
    /// Final for this instance; a new job gets a fresh poller.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval_ms: u64,
    pub stale_check_ms: u64,
    pub stale_after_ms: i64,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval_ms: POLL_INTERVAL_MS,
            stale_check_ms: STALE_CHECK_INTERVAL_MS,
            stale_after_ms: STALE_AFTER_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Poller {
    state: PollerState,
    timing: PollTiming,
    next_seq: u64,
    in_flight: Option<u64>,
    last_applied: Option<u64>,
    last_update_ms: Option<i64>,
    degraded: bool,
}

impl Poller {
    pub fn new(timing: PollTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    pub fn is_polling(&self) -> bool {
        self.state == PollerState::Polling
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn last_update_ms(&self) -> Option<i64> {
        self.last_update_ms
    }

    /// Idle -> Polling. Returns false when the poller was not idle.
    pub fn start(&mut self, now_ms: i64) -> bool {
        if self.state != PollerState::Idle {
            return false;
        }
        self.state = PollerState::Polling;
        self.last_update_ms = Some(now_ms);
        true
    }

    /// Issues the next request sequence number, or skips the tick when not
    /// polling or while the previous request is unresolved.
    pub fn tick(&mut self) -> Option<u64> {
        if self.state != PollerState::Polling || self.in_flight.is_some() {
            return None;
        }
        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        Some(self.next_seq)
    }

    /// Accepts the response for `seq` if it is the outstanding request and
    /// newer than anything applied so far.
    pub fn accept(&mut self, seq: u64, now_ms: i64) -> bool {
        if self.state != PollerState::Polling || self.in_flight != Some(seq) {
            return false;
        }
        if self.last_applied.is_some_and(|applied| applied >= seq) {
            return false;
        }
        self.in_flight = None;
        self.last_applied = Some(seq);
        self.last_update_ms = Some(now_ms);
        self.degraded = false;
        true
    }

    /// Releases the in-flight guard after a failed request. Returns whether
    /// `seq` was the outstanding request.
    pub fn release(&mut self, seq: u64) -> bool {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Updates the advisory degraded flag. Returns true when it changed.
    pub fn check_staleness(&mut self, now_ms: i64) -> bool {
        if self.state != PollerState::Polling {
            return false;
        }
        let stale = self
            .last_update_ms
            .is_some_and(|last| now_ms.saturating_sub(last) >= self.timing.stale_after_ms);
        let changed = stale != self.degraded;
        self.degraded = stale;
        changed
    }

    /// Moves to `Stopped`. Returns false if it already was.
    pub fn stop(&mut self) -> bool {
        if self.state == PollerState::Stopped {
            return false;
        }
        self.state = PollerState::Stopped;
        self.in_flight = None;
        self.degraded = false;
        true
    }
}
