//! Single-flight pose inference.
//!
//! The engine runs on a dedicated worker thread so a slow model never stalls
//! the display tick.  The capture loop talks to it through [`InferencePort`]:
//! `submit` hands over one frame, `poll` picks up the outcome without
//! blocking.  [`InferenceGate`] is the loop's record of whether an outcome is
//! still owed; a new frame is only submitted when the gate is idle.
//!
//! ```text
//!  UI thread                         pose-inference thread
//!  ─────────                         ─────────────────────
//!  gate Idle ──submit(frame)──▶ frame_rx ──▶ engine.detect()
//!  gate AwaitingResult                          │
//!  poll() ◀──────────── outcome_rx ◀────────────┘
//!  gate Idle
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::VideoFrame;
use crate::pose::{EngineError, PoseEngine, PoseResult};

// ---------------------------------------------------------------------------
// InferenceGate
// ---------------------------------------------------------------------------

/// Whether an inference call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceGate {
    #[default]
    Idle,
    AwaitingResult { frame_sequence: u64, since: Instant },
}

impl InferenceGate {
    pub fn is_idle(&self) -> bool {
        matches!(self, InferenceGate::Idle)
    }

    /// Mark `frame_sequence` as submitted.  Returns `false`, leaving the gate
    /// untouched, when a call is already outstanding.
    pub fn begin(&mut self, frame_sequence: u64, now: Instant) -> bool {
        if !self.is_idle() {
            return false;
        }
        *self = InferenceGate::AwaitingResult {
            frame_sequence,
            since: now,
        };
        true
    }

    /// Mark the outstanding call as completed; returns its latency.
    pub fn complete(&mut self, now: Instant) -> Option<Duration> {
        match std::mem::take(self) {
            InferenceGate::Idle => None,
            InferenceGate::AwaitingResult { since, .. } => {
                Some(now.saturating_duration_since(since))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// InferenceOutcome / InferencePort
// ---------------------------------------------------------------------------

/// Result of one inference call.
#[derive(Debug, Clone)]
pub enum InferenceOutcome {
    Detected(PoseResult),
    /// The frame contained no person.
    NoPose { frame_sequence: u64 },
    Failed { frame_sequence: u64, error: EngineError },
}

/// Asynchronous, non-blocking access to a pose engine.
pub trait InferencePort {
    /// Hand `frame` to the engine.  Fails with [`EngineError::Closed`] once
    /// the port is closed.
    fn submit(&mut self, frame: VideoFrame) -> Result<(), EngineError>;

    /// Outcome of a previously submitted frame, if it is ready.
    fn poll(&mut self) -> Option<InferenceOutcome>;

    /// Release the engine.  Idempotent.
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// InferenceWorker
// ---------------------------------------------------------------------------

/// [`InferencePort`] backed by a dedicated thread that owns the engine.
///
/// The engine is closed on the worker thread when the frame channel is
/// dropped, exactly once, whichever of `close` or `Drop` happens first.  A
/// panic inside `detect` is reported as a failed outcome for that frame and
/// the worker keeps serving.
pub struct InferenceWorker {
    frame_tx: Option<mpsc::Sender<VideoFrame>>,
    outcome_rx: mpsc::Receiver<InferenceOutcome>,
    handle: Option<JoinHandle<()>>,
    /// Sequence of the frame whose outcome has not been polled yet.
    pending: Option<u64>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}

fn run_detect(engine: &mut dyn PoseEngine, frame: &VideoFrame) -> InferenceOutcome {
    let frame_sequence = frame.sequence;
    match panic::catch_unwind(AssertUnwindSafe(|| engine.detect(frame))) {
        Ok(Ok(Some(pose))) => InferenceOutcome::Detected(pose),
        Ok(Ok(None)) => InferenceOutcome::NoPose { frame_sequence },
        Ok(Err(error)) => InferenceOutcome::Failed {
            frame_sequence,
            error,
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("inference: engine panicked on frame {frame_sequence}: {message}");
            InferenceOutcome::Failed {
                frame_sequence,
                error: EngineError::Inference(format!("engine panicked: {message}")),
            }
        }
    }
}

impl InferenceWorker {
    pub fn spawn(mut engine: Box<dyn PoseEngine>) -> Result<Self, EngineError> {
        let (frame_tx, frame_rx) = mpsc::channel::<VideoFrame>();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("pose-inference".into())
            .spawn(move || {
                for frame in frame_rx {
                    let outcome = run_detect(engine.as_mut(), &frame);
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                engine.close();
                log::debug!("inference: engine closed");
            })
            .map_err(|e| EngineError::Init(format!("failed to start inference thread: {e}")))?;

        Ok(Self {
            frame_tx: Some(frame_tx),
            outcome_rx,
            handle: Some(handle),
            pending: None,
        })
    }
}

impl InferencePort for InferenceWorker {
    fn submit(&mut self, frame: VideoFrame) -> Result<(), EngineError> {
        let tx = self.frame_tx.as_ref().ok_or(EngineError::Closed)?;
        let sequence = frame.sequence;
        tx.send(frame).map_err(|_| EngineError::Closed)?;
        self.pending = Some(sequence);
        Ok(())
    }

    fn poll(&mut self) -> Option<InferenceOutcome> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => {
                self.pending = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            // The worker is gone; the owed outcome will never arrive.
            Err(TryRecvError::Disconnected) => {
                self.pending.take().map(|frame_sequence| InferenceOutcome::Failed {
                    frame_sequence,
                    error: EngineError::Closed,
                })
            }
        }
    }

    fn close(&mut self) {
        // Dropping the sender ends the worker's receive loop.
        self.frame_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("inference: worker thread panicked");
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// ManualPort  (test-only)
// ---------------------------------------------------------------------------

/// Port whose outcomes are delivered by the test, so completion timing is
/// fully controlled.  Clones share state.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualPort {
    inner: std::sync::Arc<std::sync::Mutex<ManualPortInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct ManualPortInner {
    submitted: Vec<u64>,
    ready: std::collections::VecDeque<InferenceOutcome>,
    closes: usize,
}

#[cfg(test)]
impl ManualPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `outcome` available to the next `poll`.
    pub fn complete(&self, outcome: InferenceOutcome) {
        self.inner.lock().unwrap().ready.push_back(outcome);
    }

    /// Sequence numbers of every submitted frame, in order.
    pub fn submitted(&self) -> Vec<u64> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().unwrap().closes
    }
}

#[cfg(test)]
impl InferencePort for ManualPort {
    fn submit(&mut self, frame: VideoFrame) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closes > 0 {
            return Err(EngineError::Closed);
        }
        inner.submitted.push(frame.sequence);
        Ok(())
    }

    fn poll(&mut self) -> Option<InferenceOutcome> {
        self.inner.lock().unwrap().ready.pop_front()
    }

    fn close(&mut self) {
        self.inner.lock().unwrap().closes += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::pose::{Landmark, MockPoseEngine, NUM_LANDMARKS};

    /// Poll until an outcome arrives or two seconds pass.
    fn wait_for(worker: &mut InferenceWorker) -> InferenceOutcome {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(outcome) = worker.poll() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "no inference outcome");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn gate_refuses_second_begin() {
        let t0 = Instant::now();
        let mut gate = InferenceGate::default();
        assert!(gate.begin(1, t0));
        assert!(!gate.begin(2, t0));
        assert_eq!(
            gate,
            InferenceGate::AwaitingResult {
                frame_sequence: 1,
                since: t0
            }
        );
    }

    #[test]
    fn gate_complete_reports_latency_and_idles() {
        let t0 = Instant::now();
        let mut gate = InferenceGate::default();
        gate.begin(7, t0);
        assert_eq!(gate.complete(t0 + Duration::from_millis(40)), Some(Duration::from_millis(40)));
        assert!(gate.is_idle());
        assert_eq!(gate.complete(t0), None);
    }

    #[test]
    fn worker_detects_pose() {
        let engine = MockPoseEngine::detecting(vec![Landmark::new(0.5, 0.5, 0.0, 0.9); NUM_LANDMARKS]);
        let mut worker = InferenceWorker::spawn(Box::new(engine)).unwrap();

        worker.submit(VideoFrame::blank(8, 8, 11)).unwrap();
        match wait_for(&mut worker) {
            InferenceOutcome::Detected(pose) => assert_eq!(pose.frame_sequence(), 11),
            other => panic!("expected a pose, got {other:?}"),
        }
    }

    #[test]
    fn worker_reports_no_pose() {
        let mut worker = InferenceWorker::spawn(Box::new(MockPoseEngine::empty())).unwrap();
        worker.submit(VideoFrame::blank(8, 8, 4)).unwrap();
        assert!(matches!(
            wait_for(&mut worker),
            InferenceOutcome::NoPose { frame_sequence: 4 }
        ));
    }

    #[test]
    fn worker_reports_engine_failure() {
        let engine = MockPoseEngine::failing(EngineError::Inference("model crashed".into()));
        let mut worker = InferenceWorker::spawn(Box::new(engine)).unwrap();
        worker.submit(VideoFrame::blank(8, 8, 2)).unwrap();
        assert!(matches!(
            wait_for(&mut worker),
            InferenceOutcome::Failed { frame_sequence: 2, .. }
        ));
    }

    /// Panics on the first `detect`, then finds nobody.
    struct PanicOnceEngine {
        panicked: bool,
        closes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl PoseEngine for PanicOnceEngine {
        fn detect(&mut self, _frame: &VideoFrame) -> Result<Option<PoseResult>, EngineError> {
            if !self.panicked {
                self.panicked = true;
                panic!("model state corrupted");
            }
            Ok(None)
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn engine_panic_becomes_failure_and_worker_survives() {
        let closes = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let engine = PanicOnceEngine {
            panicked: false,
            closes: std::sync::Arc::clone(&closes),
        };
        let mut worker = InferenceWorker::spawn(Box::new(engine)).unwrap();

        worker.submit(VideoFrame::blank(8, 8, 1)).unwrap();
        match wait_for(&mut worker) {
            InferenceOutcome::Failed {
                frame_sequence: 1,
                error: EngineError::Inference(message),
            } => assert!(message.contains("model state corrupted")),
            other => panic!("expected a failure, got {other:?}"),
        }

        worker.submit(VideoFrame::blank(8, 8, 2)).unwrap();
        assert!(matches!(
            wait_for(&mut worker),
            InferenceOutcome::NoPose { frame_sequence: 2 }
        ));

        worker.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dead_worker_reports_owed_frame_as_closed() {
        let mut worker = InferenceWorker::spawn(Box::new(MockPoseEngine::empty())).unwrap();
        worker.submit(VideoFrame::blank(8, 8, 5)).unwrap();
        assert!(matches!(
            wait_for(&mut worker),
            InferenceOutcome::NoPose { frame_sequence: 5 }
        ));

        // Simulate a worker that vanished with a frame outstanding.
        worker.pending = Some(6);
        let (_tx, rx) = mpsc::channel();
        worker.outcome_rx = rx;
        assert!(worker.poll().is_none());

        let (tx, rx) = mpsc::channel::<InferenceOutcome>();
        drop(tx);
        worker.outcome_rx = rx;
        assert!(matches!(
            worker.poll(),
            Some(InferenceOutcome::Failed {
                frame_sequence: 6,
                error: EngineError::Closed
            })
        ));
        assert!(worker.poll().is_none());
    }

    #[test]
    fn close_releases_engine_once() {
        let engine = MockPoseEngine::empty();
        let closes = engine.close_counter();
        let mut worker = InferenceWorker::spawn(Box::new(engine)).unwrap();

        worker.close();
        worker.close();
        drop(worker);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submit_after_close_fails() {
        let mut worker = InferenceWorker::spawn(Box::new(MockPoseEngine::empty())).unwrap();
        worker.close();
        assert!(matches!(
            worker.submit(VideoFrame::blank(2, 2, 0)),
            Err(EngineError::Closed)
        ));
    }

    #[test]
    fn drop_alone_releases_engine() {
        let engine = MockPoseEngine::empty();
        let closes = engine.close_counter();
        drop(InferenceWorker::spawn(Box::new(engine)).unwrap());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
