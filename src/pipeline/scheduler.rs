//! Display-refresh scheduling seam.
//!
//! Loops never sleep or spawn timers; at the end of each tick they ask the
//! host for another one.  In the app the host is the egui context
//! (`request_repaint_after`); tests use [`ManualScheduler`] and call `tick`
//! themselves.

use std::time::Duration;

/// Requests the next display tick.
pub trait FrameScheduler {
    /// Ask for a tick no later than `after` from now.  `Duration::ZERO` means
    /// the next display refresh.
    fn request_tick(&self, after: Duration);
}

impl FrameScheduler for eframe::egui::Context {
    fn request_tick(&self, after: Duration) {
        if after.is_zero() {
            self.request_repaint();
        } else {
            self.request_repaint_after(after);
        }
    }
}

/// Records tick requests instead of acting on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualScheduler {
    requests: std::cell::RefCell<Vec<Duration>>,
}

#[cfg(test)]
impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<Duration> {
        self.requests.borrow().last().copied()
    }

    pub fn reset(&self) {
        self.requests.borrow_mut().clear();
    }
}

#[cfg(test)]
impl FrameScheduler for ManualScheduler {
    fn request_tick(&self, after: Duration) {
        self.requests.borrow_mut().push(after);
    }
}
