//! Capture loop: one step per display tick.
//!
//! Each [`CaptureLoop::tick`]:
//!
//! 1. returns without rescheduling once the loop is stopped, or stops it
//!    when the source reports a fault;
//! 2. completes the outstanding inference if its outcome has arrived:
//!    unless paused, draws the skeleton (or clears the surface when no
//!    person was found) and offers the pose to the throttler;
//! 3. when paused, reschedules and returns;
//! 4. when no inference is outstanding and the source has a new valid frame,
//!    submits it;
//! 5. reschedules.
//!
//! At most one inference call is ever outstanding.  An outcome that arrives
//! while paused frees the gate but is neither drawn nor emitted.  Losing the
//! engine or the camera stops the loop and leaves the cause in
//! [`CaptureLoop::fault`].

use std::time::{Duration, Instant};

use crate::api::AnalysisRequest;
use crate::capture::{CaptureError, FrameSource, VideoFrame};
use crate::config::CaptureConfig;
use crate::pose::EngineError;
use crate::render::{SkeletonRenderer, SkeletonStyle, Surface};

use super::feedback::FeedbackSink;
use super::inference::{InferenceGate, InferenceOutcome, InferencePort, InferenceWorker};
use super::scheduler::FrameScheduler;
use super::state::{LoopState, PauseFlag};
use super::throttle::FeedbackThrottler;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Failures that prevent live analysis from starting or end it early.
///
/// All variants carry a human-readable description so the UI can display them
/// without knowing the internal cause.
#[derive(Debug)]
pub enum PipelineError {
    /// Camera could not be acquired.
    Capture(CaptureError),
    /// Pose engine could not be initialised.
    Engine(EngineError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Capture(CaptureError::PermissionDenied) => {
                write!(f, "Camera access was denied. Allow camera access and restart.")
            }
            PipelineError::Capture(e) => write!(f, "Camera unavailable: {e}"),
            PipelineError::Engine(e) => write!(f, "Pose detection unavailable: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CaptureError> for PipelineError {
    fn from(e: CaptureError) -> Self {
        PipelineError::Capture(e)
    }
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        PipelineError::Engine(e)
    }
}

// ---------------------------------------------------------------------------
// LoopSettings / LoopStats
// ---------------------------------------------------------------------------

/// Tunables of a capture loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub emit_interval: Duration,
    pub visibility_threshold: f32,
    pub style: SkeletonStyle,
}

impl LoopSettings {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            emit_interval: config.emit_interval(),
            visibility_threshold: config.visibility_threshold,
            style: SkeletonStyle::LIVE,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

/// Counters for the status bar and the shutdown log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub submitted: u64,
    pub detections: u64,
    pub empty: u64,
    pub failures: u64,
    pub emitted: u64,
    pub last_latency: Option<Duration>,
}

// ---------------------------------------------------------------------------
// CaptureLoop
// ---------------------------------------------------------------------------

/// Drives frame capture, inference, live skeleton drawing and feedback
/// emission.
///
/// Create with [`CaptureLoop::start`]; call [`tick`](Self::tick) on every
/// display refresh; call [`stop`](Self::stop) (or drop) to tear down.
pub struct CaptureLoop<P: InferencePort = InferenceWorker> {
    source: Box<dyn FrameSource>,
    port: P,
    gate: InferenceGate,
    renderer: SkeletonRenderer,
    throttler: FeedbackThrottler,
    sink: Box<dyn FeedbackSink>,
    pause: PauseFlag,
    state: LoopState,
    last_submitted: Option<u64>,
    stats: LoopStats,
    fault: Option<PipelineError>,
}

impl<P: InferencePort> CaptureLoop<P> {
    /// Take ownership of an acquired source and a ready inference port and
    /// begin running.
    pub fn start(
        source: Box<dyn FrameSource>,
        port: P,
        sink: Box<dyn FeedbackSink>,
        pause: PauseFlag,
        settings: LoopSettings,
    ) -> Self {
        let (width, height) = source.dimensions();
        log::info!(
            "capture: started at {width}x{height}, feedback every {} ms",
            settings.emit_interval.as_millis()
        );
        Self {
            source,
            port,
            gate: InferenceGate::Idle,
            renderer: SkeletonRenderer::new(settings.visibility_threshold, settings.style),
            throttler: FeedbackThrottler::new(settings.emit_interval, pause.clone()),
            sink,
            pause,
            state: LoopState::Running,
            last_submitted: None,
            stats: LoopStats::default(),
            fault: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn gate(&self) -> InferenceGate {
        self.gate
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Why the loop stopped on its own, if it did.
    pub fn fault(&self) -> Option<&PipelineError> {
        self.fault.as_ref()
    }

    /// Run one step.  Returns `false` once the loop is stopped.
    pub fn tick(
        &mut self,
        now: Instant,
        surface: &mut dyn Surface,
        scheduler: &dyn FrameScheduler,
    ) -> bool {
        if !self.state.is_running() {
            return false;
        }

        if let Some(err) = self.source.take_fault() {
            self.halt(err.into());
            return false;
        }

        if !self.gate.is_idle() {
            if let Some(outcome) = self.port.poll() {
                self.on_outcome(outcome, now, surface);
                if !self.state.is_running() {
                    return false;
                }
            }
        }

        if self.pause.is_paused() {
            scheduler.request_tick(Duration::ZERO);
            return true;
        }

        if self.gate.is_idle() {
            if let Some(frame) = self.next_frame() {
                self.submit(frame, now);
            }
        }

        scheduler.request_tick(Duration::ZERO);
        true
    }

    /// Tear down: release the engine and the camera.  Idempotent; an
    /// outstanding inference outcome is discarded.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        self.gate = InferenceGate::Idle;
        self.port.close();
        self.source.release();

        let (_, dropped) = self.throttler.counts();
        log::info!(
            "capture: stopped after {} frames ({} poses, {} empty, {} failed), {} requests sent, {} results throttled",
            self.stats.submitted,
            self.stats.detections,
            self.stats.empty,
            self.stats.failures,
            self.stats.emitted,
            dropped
        );
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn halt(&mut self, fault: PipelineError) {
        log::error!("capture: live analysis stopped: {fault}");
        self.fault = Some(fault);
        self.stop();
    }

    /// The source's frame if it is valid and not the one last submitted.
    fn next_frame(&self) -> Option<VideoFrame> {
        let frame = self.source.current_frame()?;
        if !frame.is_valid() || self.last_submitted == Some(frame.sequence) {
            return None;
        }
        Some(frame)
    }

    fn submit(&mut self, frame: VideoFrame, now: Instant) {
        let sequence = frame.sequence;
        match self.port.submit(frame) {
            Ok(()) => {
                self.gate.begin(sequence, now);
                self.last_submitted = Some(sequence);
                self.stats.submitted += 1;
            }
            Err(e) => log::warn!("capture: frame {sequence} not submitted: {e}"),
        }
    }

    fn on_outcome(&mut self, outcome: InferenceOutcome, now: Instant, surface: &mut dyn Surface) {
        self.stats.last_latency = self.gate.complete(now);
        let paused = self.pause.is_paused();

        match outcome {
            InferenceOutcome::Detected(pose) => {
                self.stats.detections += 1;
                if paused {
                    return;
                }
                self.renderer.draw(surface, pose.landmarks());
                if self.throttler.try_emit(now) {
                    self.stats.emitted += 1;
                    self.sink.emit(AnalysisRequest::from_pose(&pose));
                }
            }
            InferenceOutcome::NoPose { .. } => {
                self.stats.empty += 1;
                if !paused {
                    surface.clear();
                }
            }
            InferenceOutcome::Failed {
                error: EngineError::Closed,
                ..
            } => {
                self.stats.failures += 1;
                self.halt(PipelineError::Engine(EngineError::Closed));
            }
            InferenceOutcome::Failed {
                frame_sequence,
                error,
            } => {
                self.stats.failures += 1;
                log::warn!("capture: inference failed on frame {frame_sequence}: {error}");
            }
        }
    }
}

impl<P: InferencePort> Drop for CaptureLoop<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::feedback::RecordingSink;
    use crate::pipeline::inference::ManualPort;
    use crate::pipeline::scheduler::ManualScheduler;
    use crate::pipeline::state::PauseSwitch;
    use crate::pose::{Landmark, MockPoseEngine, PoseResult, NUM_LANDMARKS};
    use crate::render::DisplayList;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Hands out a fresh frame on every read until released.
    #[derive(Clone, Default)]
    struct CountingSource {
        next: Arc<AtomicU64>,
        releases: Arc<AtomicUsize>,
        not_ready: Arc<AtomicBool>,
    }

    impl FrameSource for CountingSource {
        fn current_frame(&self) -> Option<VideoFrame> {
            if self.releases.load(Ordering::SeqCst) > 0 || self.not_ready.load(Ordering::SeqCst) {
                return None;
            }
            let seq = self.next.fetch_add(1, Ordering::SeqCst);
            Some(VideoFrame::blank(4, 4, seq))
        }

        fn dimensions(&self) -> (u32, u32) {
            (4, 4)
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Always returns the same frame.
    struct FrozenSource;

    impl FrameSource for FrozenSource {
        fn current_frame(&self) -> Option<VideoFrame> {
            Some(VideoFrame::blank(4, 4, 42))
        }

        fn dimensions(&self) -> (u32, u32) {
            (4, 4)
        }

        fn release(&mut self) {}
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Harness {
        capture: CaptureLoop<ManualPort>,
        port: ManualPort,
        source: CountingSource,
        sink: RecordingSink,
        pause: PauseSwitch,
        surface: DisplayList,
        scheduler: ManualScheduler,
    }

    fn harness() -> Harness {
        let port = ManualPort::new();
        let source = CountingSource::default();
        let sink = RecordingSink::new();
        let pause = PauseSwitch::new();
        let capture = CaptureLoop::start(
            Box::new(source.clone()),
            port.clone(),
            Box::new(sink.clone()),
            pause.flag(),
            LoopSettings::default(),
        );
        Harness {
            capture,
            port,
            source,
            sink,
            pause,
            surface: DisplayList::new(640.0, 480.0),
            scheduler: ManualScheduler::new(),
        }
    }

    impl Harness {
        fn tick(&mut self, now: Instant) -> bool {
            self.capture.tick(now, &mut self.surface, &self.scheduler)
        }
    }

    fn pose(seq: u64) -> InferenceOutcome {
        let landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); NUM_LANDMARKS];
        InferenceOutcome::Detected(PoseResult::new(seq, landmarks).unwrap())
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn one_inference_outstanding_across_many_ticks() {
        let mut h = harness();
        let t0 = Instant::now();

        for i in 0..100 {
            assert!(h.tick(t0 + Duration::from_millis(i)));
        }

        assert_eq!(h.port.submitted(), vec![0]);
        assert!(!h.capture.gate().is_idle());
        assert_eq!(h.scheduler.request_count(), 100);
    }

    #[test]
    fn next_frame_submitted_after_completion() {
        let mut h = harness();
        let t0 = Instant::now();

        h.tick(t0);
        h.port.complete(pose(0));
        h.tick(t0 + Duration::from_millis(30));

        assert_eq!(h.port.submitted(), vec![0, 1]);
        assert_eq!(h.capture.stats().last_latency, Some(Duration::from_millis(30)));
    }

    #[test]
    fn detection_draws_skeleton_and_emits_first_result() {
        let mut h = harness();
        let t0 = Instant::now();

        h.tick(t0);
        h.port.complete(pose(0));
        h.tick(t0);

        assert_eq!(h.surface.point_count(), NUM_LANDMARKS);
        assert!(h.surface.line_count() > 0);
        assert_eq!(h.sink.count(), 1);
        assert_eq!(h.sink.requests()[0].pose_landmarks.len(), NUM_LANDMARKS);
    }

    #[test]
    fn emissions_are_throttled() {
        let mut h = harness();
        let t0 = Instant::now();

        // 30 fps for 5 s, each inference completing by the next tick.
        for i in 0..150u64 {
            let now = t0 + Duration::from_micros(i * 33_333);
            h.tick(now);
            if let Some(&seq) = h.port.submitted().last() {
                h.port.complete(pose(seq));
            }
        }

        assert_eq!(h.sink.count(), 3);
    }

    #[test]
    fn empty_result_clears_surface() {
        let mut h = harness();
        let t0 = Instant::now();

        h.tick(t0);
        h.port.complete(pose(0));
        h.tick(t0);
        assert!(h.surface.point_count() > 0);

        h.port.complete(InferenceOutcome::NoPose { frame_sequence: 1 });
        h.tick(t0);
        assert!(h.surface.ops().is_empty());
        assert_eq!(h.sink.count(), 1);
    }

    #[test]
    fn failed_inference_keeps_previous_drawing() {
        let mut h = harness();
        let t0 = Instant::now();

        h.tick(t0);
        h.port.complete(pose(0));
        h.tick(t0);
        let drawn = h.surface.ops().to_vec();

        h.port.complete(InferenceOutcome::Failed {
            frame_sequence: 1,
            error: EngineError::Inference("bad frame".into()),
        });
        assert!(h.tick(t0));
        assert_eq!(h.surface.ops(), drawn.as_slice());
        assert_eq!(h.capture.stats().failures, 1);
        assert!(h.capture.state().is_running());
    }

    #[test]
    fn paused_loop_submits_nothing_but_keeps_ticking() {
        let mut h = harness();
        let t0 = Instant::now();
        h.pause.set_paused(true);

        for i in 0..10 {
            assert!(h.tick(t0 + Duration::from_millis(i)));
        }

        assert!(h.port.submitted().is_empty());
        assert_eq!(h.scheduler.request_count(), 10);
    }

    #[test]
    fn result_arriving_while_paused_is_neither_drawn_nor_emitted() {
        let mut h = harness();
        let t0 = Instant::now();

        h.tick(t0);
        h.pause.set_paused(true);
        let revision = h.surface.revision();
        h.port.complete(pose(0));
        h.tick(t0 + Duration::from_secs(10));

        assert_eq!(h.surface.revision(), revision);
        assert_eq!(h.surface.point_count(), 0);
        assert_eq!(h.sink.count(), 0);
        assert!(h.capture.gate().is_idle());
        assert_eq!(h.port.submitted(), vec![0]);

        h.pause.set_paused(false);
        h.tick(t0 + Duration::from_secs(11));
        assert_eq!(h.port.submitted(), vec![0, 1]);
    }

    #[test]
    fn invalid_or_missing_frame_is_skipped() {
        let mut h = harness();
        h.source.not_ready.store(true, Ordering::SeqCst);
        assert!(h.tick(Instant::now()));
        assert!(h.port.submitted().is_empty());
        assert!(h.capture.gate().is_idle());
    }

    #[test]
    fn same_frame_is_not_submitted_twice() {
        let port = ManualPort::new();
        let mut capture = CaptureLoop::start(
            Box::new(FrozenSource),
            port.clone(),
            Box::new(RecordingSink::new()),
            PauseSwitch::new().flag(),
            LoopSettings::default(),
        );
        let mut surface = DisplayList::new(10.0, 10.0);
        let scheduler = ManualScheduler::new();
        let t0 = Instant::now();

        capture.tick(t0, &mut surface, &scheduler);
        port.complete(InferenceOutcome::NoPose { frame_sequence: 42 });
        capture.tick(t0, &mut surface, &scheduler);
        capture.tick(t0, &mut surface, &scheduler);

        assert_eq!(port.submitted(), vec![42]);
    }

    #[test]
    fn stop_releases_everything_once() {
        let mut h = harness();
        h.tick(Instant::now());

        h.capture.stop();
        h.capture.stop();

        assert_eq!(h.port.close_count(), 1);
        assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
        assert_eq!(h.capture.state(), LoopState::Stopped);

        drop(h.capture);
        assert_eq!(h.port.close_count(), 1);
    }

    #[test]
    fn tick_after_stop_is_inert() {
        let mut h = harness();
        let t0 = Instant::now();
        h.tick(t0);
        h.port.complete(pose(0));
        h.capture.stop();
        h.scheduler.reset();
        let revision = h.surface.revision();

        assert!(!h.tick(t0 + Duration::from_secs(1)));
        assert_eq!(h.scheduler.request_count(), 0);
        assert_eq!(h.surface.revision(), revision);
        assert_eq!(h.sink.count(), 0);
    }

    #[test]
    fn drop_releases_engine_through_worker() {
        let engine = MockPoseEngine::empty();
        let closes = engine.close_counter();
        let worker = InferenceWorker::spawn(Box::new(engine)).unwrap();
        let source = CountingSource::default();

        let capture = CaptureLoop::start(
            Box::new(source.clone()),
            worker,
            Box::new(RecordingSink::new()),
            PauseSwitch::new().flag(),
            LoopSettings::default(),
        );
        drop(capture);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(source.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lost_engine_stops_loop_with_fault() {
        let mut h = harness();
        let t0 = Instant::now();
        h.tick(t0);

        h.port.complete(InferenceOutcome::Failed {
            frame_sequence: 0,
            error: EngineError::Closed,
        });
        assert!(!h.tick(t0 + Duration::from_millis(16)));

        assert_eq!(h.capture.state(), LoopState::Stopped);
        assert!(matches!(
            h.capture.fault(),
            Some(PipelineError::Engine(EngineError::Closed))
        ));
        assert_eq!(h.port.close_count(), 1);
        assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_panic_on_one_frame_keeps_loop_running() {
        let mut h = harness();
        let t0 = Instant::now();
        h.tick(t0);

        h.port.complete(InferenceOutcome::Failed {
            frame_sequence: 0,
            error: EngineError::Inference("engine panicked: boom".into()),
        });
        assert!(h.tick(t0 + Duration::from_millis(16)));
        assert!(h.capture.fault().is_none());
        assert_eq!(h.port.submitted(), vec![0, 1]);
    }

    /// Reports a fault after the first frame, like a camera that dies.
    struct DyingSource {
        fault: Option<CaptureError>,
    }

    impl FrameSource for DyingSource {
        fn current_frame(&self) -> Option<VideoFrame> {
            Some(VideoFrame::blank(4, 4, 1))
        }

        fn dimensions(&self) -> (u32, u32) {
            (4, 4)
        }

        fn release(&mut self) {}

        fn take_fault(&mut self) -> Option<CaptureError> {
            self.fault.take()
        }
    }

    #[test]
    fn source_fault_stops_loop_and_is_reported() {
        let port = ManualPort::new();
        let scheduler = ManualScheduler::new();
        let mut surface = DisplayList::new(100.0, 100.0);
        let mut capture = CaptureLoop::start(
            Box::new(DyingSource {
                fault: Some(CaptureError::Open("device unplugged".into())),
            }),
            port.clone(),
            Box::new(RecordingSink::new()),
            PauseSwitch::new().flag(),
            LoopSettings::default(),
        );

        assert!(!capture.tick(Instant::now(), &mut surface, &scheduler));
        assert!(port.submitted().is_empty());
        assert_eq!(port.close_count(), 1);
        let fault = capture.fault().map(ToString::to_string).unwrap_or_default();
        assert!(fault.contains("device unplugged"));
        assert_eq!(scheduler.request_count(), 0);
    }

    #[test]
    fn permission_error_message_is_actionable() {
        let e = PipelineError::from(CaptureError::PermissionDenied);
        assert!(e.to_string().contains("denied"));
        let e = PipelineError::from(EngineError::Init("model missing".into()));
        assert!(e.to_string().contains("model missing"));
    }
}
