//! Fire-and-forget analysis requests and the latest-feedback state.
//!
//! ```text
//!  CaptureLoop ──emit(req)──▶ FeedbackDispatcher ──tokio::spawn──▶ client.analyze()
//!                                                                   │ Ok
//!  FeedbackState::poll() ◀────────── unbounded mpsc ◀───────────────┘
//!                                                                   │ Err
//!                                                     log::warn! ◀──┘
//! ```
//!
//! Requests are never awaited by the capture loop and may overlap.  Each
//! completion overwrites the displayed feedback in the order completions
//! arrive, so a slow early request can replace a faster later one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::api::{AnalysisClient, AnalysisRequest, FeedbackResult};

// ---------------------------------------------------------------------------
// FeedbackSink
// ---------------------------------------------------------------------------

/// Destination of throttled analysis requests.  Must not block.
pub trait FeedbackSink {
    fn emit(&self, request: AnalysisRequest);
}

// ---------------------------------------------------------------------------
// FeedbackDispatcher
// ---------------------------------------------------------------------------

/// Sends each request on the tokio runtime and forwards successful results
/// to a [`FeedbackState`].  Failures are logged and otherwise ignored.
pub struct FeedbackDispatcher {
    client: Arc<dyn AnalysisClient>,
    exercise_id: Arc<str>,
    runtime: Handle,
    results: mpsc::UnboundedSender<FeedbackResult>,
    in_flight: Arc<AtomicUsize>,
}

impl FeedbackDispatcher {
    pub fn new(
        client: Arc<dyn AnalysisClient>,
        exercise_id: &str,
        runtime: Handle,
        results: mpsc::UnboundedSender<FeedbackResult>,
    ) -> Self {
        Self {
            client,
            exercise_id: exercise_id.into(),
            runtime,
            results,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Requests sent but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl FeedbackSink for FeedbackDispatcher {
    fn emit(&self, request: AnalysisRequest) {
        let client = Arc::clone(&self.client);
        let exercise_id = Arc::clone(&self.exercise_id);
        let results = self.results.clone();
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::SeqCst);
        self.runtime.spawn(async move {
            let outcome = client.analyze(&exercise_id, &request).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            match outcome {
                Ok(result) => {
                    log::debug!(
                        "feedback: score {} for request at {}",
                        result.score,
                        request.timestamp_ms
                    );
                    // Receiver gone means the session is over.
                    let _ = results.send(result);
                }
                Err(e) => log::warn!("feedback: analysis request failed: {e}"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// FeedbackState
// ---------------------------------------------------------------------------

/// Most recent feedback, read by the UI every frame.
pub struct FeedbackState {
    latest: Option<FeedbackResult>,
    inbox: mpsc::UnboundedReceiver<FeedbackResult>,
    received: u64,
}

impl FeedbackState {
    /// New empty state and the sender completions are delivered through.
    pub fn channel() -> (Self, mpsc::UnboundedSender<FeedbackResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Self {
            latest: None,
            inbox: rx,
            received: 0,
        };
        (state, tx)
    }

    /// Apply every completion delivered since the last call, in arrival
    /// order, and return them.
    pub fn poll(&mut self) -> Vec<FeedbackResult> {
        let mut arrived = Vec::new();
        while let Ok(result) = self.inbox.try_recv() {
            self.latest = Some(result.clone());
            self.received += 1;
            arrived.push(result);
        }
        arrived
    }

    pub fn latest(&self) -> Option<&FeedbackResult> {
        self.latest.as_ref()
    }

    /// Completions applied so far.
    pub fn received(&self) -> u64 {
        self.received
    }
}

// ---------------------------------------------------------------------------
// RecordingSink  (test-only)
// ---------------------------------------------------------------------------

/// Sink that keeps every emitted request.  Clones share the record.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingSink {
    requests: Arc<std::sync::Mutex<Vec<AnalysisRequest>>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[cfg(test)]
impl FeedbackSink for RecordingSink {
    fn emit(&self, request: AnalysisRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::api::{ApiError, CompletionRequest, ExerciseInfo};

    fn result(score: u8) -> FeedbackResult {
        FeedbackResult {
            score,
            is_correct: score >= 80,
            critical_error: false,
            feedback: None,
            angle_errors: BTreeMap::new(),
        }
    }

    fn request(timestamp_ms: u64) -> AnalysisRequest {
        AnalysisRequest {
            pose_landmarks: Vec::new(),
            timestamp_ms,
        }
    }

    /// Answers each request after a per-timestamp delay with
    /// `score = timestamp_ms`; timestamp 0 fails.
    struct DelayedClient {
        delays: HashMap<u64, Duration>,
    }

    #[async_trait]
    impl AnalysisClient for DelayedClient {
        async fn analyze(
            &self,
            _exercise_id: &str,
            request: &AnalysisRequest,
        ) -> Result<FeedbackResult, ApiError> {
            let delay = self.delays.get(&request.timestamp_ms).copied().unwrap_or_default();
            tokio::time::sleep(delay).await;
            if request.timestamp_ms == 0 {
                return Err(ApiError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(result(request.timestamp_ms as u8))
        }

        async fn complete_session(
            &self,
            _exercise_id: &str,
            _request: &CompletionRequest,
        ) -> Result<(), ApiError> {
            Ok(())
        }

        async fn fetch_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, ApiError> {
            Ok(ExerciseInfo::offline(exercise_id))
        }
    }

    fn dispatcher(
        delays: &[(u64, u64)],
    ) -> (FeedbackDispatcher, FeedbackState) {
        let client = DelayedClient {
            delays: delays
                .iter()
                .map(|&(ts, ms)| (ts, Duration::from_millis(ms)))
                .collect(),
        };
        let (state, tx) = FeedbackState::channel();
        let dispatcher = FeedbackDispatcher::new(Arc::new(client), "1", Handle::current(), tx);
        (dispatcher, state)
    }

    #[test]
    fn state_starts_empty() {
        let (mut state, _tx) = FeedbackState::channel();
        assert!(state.latest().is_none());
        assert!(state.poll().is_empty());
    }

    #[test]
    fn later_completion_replaces_earlier() {
        let (mut state, tx) = FeedbackState::channel();
        tx.send(result(40)).unwrap();
        tx.send(result(90)).unwrap();

        let arrived = state.poll();
        assert_eq!(arrived.len(), 2);
        assert_eq!(state.latest().map(|r| r.score), Some(90));
        assert_eq!(state.received(), 2);
    }

    #[tokio::test]
    async fn completions_apply_in_arrival_order() {
        // Request 1 is slow, request 2 fast: 2 lands first, 1 overwrites it.
        let (dispatcher, mut state) = dispatcher(&[(1, 150), (2, 10)]);

        dispatcher.emit(request(1));
        dispatcher.emit(request(2));
        assert_eq!(dispatcher.in_flight(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        state.poll();
        assert_eq!(state.latest().map(|r| r.score), Some(2));

        tokio::time::sleep(Duration::from_millis(200)).await;
        state.poll();
        assert_eq!(state.latest().map(|r| r.score), Some(1));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_request_leaves_feedback_untouched() {
        let (dispatcher, mut state) = dispatcher(&[]);

        dispatcher.emit(request(55));
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.poll();

        dispatcher.emit(request(0));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.poll().is_empty());
        assert_eq!(state.latest().map(|r| r.score), Some(55));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn completion_after_state_dropped_is_ignored() {
        let (dispatcher, state) = dispatcher(&[(3, 20)]);
        dispatcher.emit(request(3));
        drop(state);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[test]
    fn recording_sink_keeps_requests() {
        let sink = RecordingSink::new();
        let view = sink.clone();
        sink.emit(request(9));
        assert_eq!(view.count(), 1);
        assert_eq!(view.requests()[0].timestamp_ms, 9);
    }
}
