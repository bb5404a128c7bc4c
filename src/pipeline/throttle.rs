//! Rate limiting of analysis requests.
//!
//! Pose results arrive at camera rate; the analysis service is asked at most
//! once per interval.  Results between emissions are dropped, not queued.
//! The first result after start is emitted immediately.

use std::time::{Duration, Instant};

use super::state::PauseFlag;

/// Default minimum spacing between two analysis requests.
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug)]
pub struct FeedbackThrottler {
    interval: Duration,
    last_emission: Option<Instant>,
    pause: PauseFlag,
    emitted: u64,
    dropped: u64,
}

impl FeedbackThrottler {
    pub fn new(interval: Duration, pause: PauseFlag) -> Self {
        Self {
            interval,
            last_emission: None,
            pause,
            emitted: 0,
            dropped: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a result arriving at `now` would be emitted.  Never while
    /// paused, whatever the elapsed time.
    pub fn should_emit(&self, now: Instant) -> bool {
        if self.pause.is_paused() {
            return false;
        }
        match self.last_emission {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Decide for a result arriving at `now`.  On `true` the emission time is
    /// recorded immediately; the outcome of the request does not matter.
    pub fn try_emit(&mut self, now: Instant) -> bool {
        if self.should_emit(now) {
            self.last_emission = Some(now);
            self.emitted += 1;
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    pub fn last_emission(&self) -> Option<Instant> {
        self.last_emission
    }

    /// `(emitted, dropped)` since construction.
    pub fn counts(&self) -> (u64, u64) {
        (self.emitted, self.dropped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
