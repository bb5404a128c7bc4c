//! Loop lifecycle and the shared pause flag.
//!
//! [`LoopState`] is the lifecycle of both per-display-tick loops (capture and
//! reference animation).  [`PauseSwitch`] is the single writer of the session
//! pause state; every loop holds a read-only [`PauseFlag`] clone of it, so
//! one toggle reaches all of them before their next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// LoopState
// ---------------------------------------------------------------------------

/// Lifecycle of a tick-driven loop.
///
/// ```text
/// Idle ──start──▶ Running ──stop──▶ Stopped
/// Idle ──────────stop─────────────▶ Stopped
/// ```
///
/// `Stopped` is terminal: a tick observed in that state does nothing and
/// does not reschedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Constructed but not started (or refused to start).
    #[default]
    Idle,
    /// Ticking on every display refresh.
    Running,
    /// Torn down; resources released.
    Stopped,
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running)
    }

    /// A short human-readable label suitable for display in the UI status bar.
    pub fn label(&self) -> &'static str {
        match self {
            LoopState::Idle => "Idle",
            LoopState::Running => "Live",
            LoopState::Stopped => "Stopped",
        }
    }
}

// ---------------------------------------------------------------------------
// Pause state
// ---------------------------------------------------------------------------

/// Owner of the session pause state.  Only the UI (pause button, hotkey)
/// holds one.
#[derive(Debug, Default)]
pub struct PauseSwitch {
    paused: Arc<AtomicBool>,
}

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&self, paused: bool) {
        let was = self.paused.swap(paused, Ordering::SeqCst);
        if was != paused {
            log::info!("session {}", if paused { "paused" } else { "resumed" });
        }
    }

    /// Flip the state; returns the new value.
    pub fn toggle(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::SeqCst);
        log::info!("session {}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Read-only view for a loop.
    pub fn flag(&self) -> PauseFlag {
        PauseFlag {
            paused: Arc::clone(&self.paused),
        }
    }
}

/// Read-only view of a [`PauseSwitch`].  Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag {
    paused: Arc<AtomicBool>,
}

impl PauseFlag {
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_loop_state_is_idle() {
        assert_eq!(LoopState::default(), LoopState::Idle);
        assert!(!LoopState::Idle.is_running());
    }

    #[test]
    fn only_running_is_running() {
        assert!(LoopState::Running.is_running());
        assert!(!LoopState::Stopped.is_running());
    }

    #[test]
    fn labels() {
        assert_eq!(LoopState::Idle.label(), "Idle");
        assert_eq!(LoopState::Running.label(), "Live");
        assert_eq!(LoopState::Stopped.label(), "Stopped");
    }

    #[test]
    fn flag_observes_switch() {
        let switch = PauseSwitch::new();
        let a = switch.flag();
        let b = a.clone();
        assert!(!a.is_paused());

        switch.set_paused(true);
        assert!(a.is_paused());
        assert!(b.is_paused());

        switch.set_paused(false);
        assert!(!b.is_paused());
    }

    #[test]
    fn toggle_returns_new_state() {
        let switch = PauseSwitch::new();
        assert!(switch.toggle());
        assert!(switch.is_paused());
        assert!(!switch.toggle());
        assert!(!switch.flag().is_paused());
    }

    #[test]
    fn pause_flag_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PauseFlag>();
        assert_send_sync::<PauseSwitch>();
    }
}
