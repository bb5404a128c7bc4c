//! Reference animation playback on its own fixed cadence.
//!
//! The player shares the display tick with the capture loop but advances by
//! elapsed time, one keyframe per interval (~30 fps), looping.  While paused
//! it keeps ticking, draws the "Paused" overlay once over the frozen frame,
//! and does not advance.

use std::time::{Duration, Instant};

use crate::pose::Animation;
use crate::render::{SkeletonRenderer, Surface};

use super::scheduler::FrameScheduler;
use super::state::{LoopState, PauseFlag};

/// Caption drawn over the reference surface while paused.
pub const PAUSED_CAPTION: &str = "Paused";

pub struct AnimationPlayer {
    animation: Option<Animation>,
    renderer: SkeletonRenderer,
    pause: PauseFlag,
    frame_interval: Duration,
    /// Next keyframe to show.
    index: usize,
    /// Keyframe currently on the surface.
    displayed: Option<usize>,
    next_due: Option<Instant>,
    overlay_drawn: bool,
    state: LoopState,
}

impl AnimationPlayer {
    pub fn new(
        animation: Option<Animation>,
        frame_interval: Duration,
        renderer: SkeletonRenderer,
        pause: PauseFlag,
    ) -> Self {
        Self {
            animation,
            renderer,
            pause,
            frame_interval,
            index: 0,
            displayed: None,
            next_due: None,
            overlay_drawn: false,
            state: LoopState::Idle,
        }
    }

    /// Begin playback from the first keyframe.  Returns `false`, leaving the
    /// player idle, when there is no animation or it has no keyframes.
    pub fn start(&mut self, now: Instant, scheduler: &dyn FrameScheduler) -> bool {
        if self.state != LoopState::Idle {
            return self.state.is_running();
        }
        let len = self.len();
        if len == 0 {
            log::info!("animation: no reference animation, playback disabled");
            return false;
        }
        self.index = 0;
        self.next_due = Some(now);
        self.state = LoopState::Running;
        log::info!(
            "animation: playing {len} keyframes every {} ms",
            self.frame_interval.as_millis()
        );
        scheduler.request_tick(Duration::ZERO);
        true
    }

    /// Run one step.  Returns `false` when the player is not running.
    pub fn tick(
        &mut self,
        now: Instant,
        surface: &mut dyn Surface,
        scheduler: &dyn FrameScheduler,
    ) -> bool {
        if !self.state.is_running() {
            return false;
        }

        if self.pause.is_paused() {
            if !self.overlay_drawn {
                surface.draw_overlay(PAUSED_CAPTION);
                self.overlay_drawn = true;
            }
            scheduler.request_tick(self.frame_interval);
            return true;
        }

        let due = self.next_due.unwrap_or(now);
        if now >= due {
            self.advance(surface);
            // Keep the cadence, but never try to catch up after a stall.
            let next = due + self.frame_interval;
            self.next_due = Some(if next <= now { now + self.frame_interval } else { next });
        }

        let wait = self
            .next_due
            .map_or(Duration::ZERO, |d| d.saturating_duration_since(now));
        scheduler.request_tick(wait);
        true
    }

    /// Stop playback.  Ticks observed afterwards draw nothing and do not
    /// reschedule.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            self.state = LoopState::Stopped;
            self.next_due = None;
            log::debug!("animation: stopped");
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Keyframe that the next advance will draw.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Keyframe currently shown, if any has been drawn.
    pub fn displayed_index(&self) -> Option<usize> {
        self.displayed
    }

    pub fn len(&self) -> usize {
        self.animation.as_ref().map_or(0, Animation::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn advance(&mut self, surface: &mut dyn Surface) {
        let Some(animation) = self.animation.as_ref() else {
            return;
        };
        if let Some(keyframe) = animation.get(self.index) {
            self.renderer.draw(surface, &keyframe.pose_landmarks);
        }
        self.displayed = Some(self.index);
        self.overlay_drawn = false;
        self.index = (self.index + 1) % animation.len();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
