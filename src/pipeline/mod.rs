//! Per-display-tick session loops and the feedback path.
//!
//! Everything here runs on the UI thread, driven by the egui update tick.
//! Long-running work happens elsewhere and reports back over channels that
//! the loops poll without blocking.
//!
//! # Architecture
//!
//! ```text
//! egui update()  (one call per display refresh)
//!        │
//!        ├─ CaptureLoop::tick()
//!        │     ├─ InferencePort::poll()      ◀── pose-inference thread
//!        │     │     ├─ SkeletonRenderer::draw(live surface)
//!        │     │     └─ FeedbackThrottler::try_emit()
//!        │     │           └─ FeedbackSink::emit()  ──▶ tokio task ──▶ HTTP
//!        │     └─ InferencePort::submit(latest frame)   (gate Idle only)
//!        │
//!        ├─ AnimationPlayer::tick()   (own ~30 fps cadence, reference surface)
//!        │
//!        └─ FeedbackState::poll()     ◀── completed analysis results
//!
//! PauseSwitch (UI) ──▶ PauseFlag (read by every loop and the throttler)
//! ```
//!
//! Loops request their next tick through [`FrameScheduler`], implemented by
//! `egui::Context`.

pub mod animation;
pub mod controller;
pub mod feedback;
pub mod inference;
pub mod scheduler;
pub mod state;
pub mod throttle;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use animation::{AnimationPlayer, PAUSED_CAPTION};
pub use controller::{CaptureLoop, LoopSettings, LoopStats, PipelineError};
pub use feedback::{FeedbackDispatcher, FeedbackSink, FeedbackState};
pub use inference::{InferenceGate, InferenceOutcome, InferencePort, InferenceWorker};
pub use scheduler::FrameScheduler;
pub use state::{LoopState, PauseFlag, PauseSwitch};
pub use throttle::{FeedbackThrottler, DEFAULT_EMIT_INTERVAL};
