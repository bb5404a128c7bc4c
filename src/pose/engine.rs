//! Core pose-engine trait and its configuration.
//!
//! [`PoseEngine`] is the interface the inference worker drives.  It is
//! object-safe and `Send` so a `Box<dyn PoseEngine>` can be moved onto the
//! worker thread that owns it for the lifetime of a capture session.
//!
//! The model behind an engine is opaque to this crate: an engine receives one
//! [`VideoFrame`] per call and answers with zero or one [`PoseResult`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::VideoFrame;
use crate::pose::PoseResult;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors raised by pose engines.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be constructed (missing model, bad data …).
    /// Fatal to live analysis for the session.
    #[error("pose engine failed to initialise: {0}")]
    Init(String),

    /// A single inference call failed.  The next frame is the retry.
    #[error("pose inference failed: {0}")]
    Inference(String),

    /// The engine was used after [`PoseEngine::close`].
    #[error("pose engine is closed")]
    Closed,

    /// A result did not carry the full joint topology.
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// EngineOptions
// ---------------------------------------------------------------------------

/// Settings applied once when an engine is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Model size/accuracy trade-off (0 = lite, 1 = full, 2 = heavy).
    pub model_complexity: u8,
    /// Temporal smoothing of landmarks across frames.
    pub smooth_landmarks: bool,
    /// Produce a segmentation mask alongside the landmarks.
    pub enable_segmentation: bool,
    /// Minimum confidence for a person to count as detected.
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking between frames.
    pub min_tracking_confidence: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            model_complexity: 1,
            smooth_landmarks: true,
            enable_segmentation: false,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// PoseEngine trait
// ---------------------------------------------------------------------------

/// Frame-in, pose-out inference backend.
///
/// # Contract
///
/// - `detect` is called with at most one frame outstanding; the worker never
///   overlaps calls.
/// - `Ok(None)` means no person was found; it is not an error.
/// - `close` releases the model.  It is called exactly once per engine, and
///   every `detect` after it returns [`EngineError::Closed`].
pub trait PoseEngine: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<PoseResult>, EngineError>;

    fn close(&mut self);
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn PoseEngine>) {}
};

// ---------------------------------------------------------------------------
// MockPoseEngine  (test-only)
// ---------------------------------------------------------------------------

/// Scripted engine that answers every frame with the configured response and
/// counts how often it was closed.
#[cfg(test)]
pub struct MockPoseEngine {
    response: Result<Option<Vec<crate::pose::Landmark>>, EngineError>,
    closes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    closed: bool,
}

#[cfg(test)]
impl MockPoseEngine {
    /// Detects `landmarks` in every frame.
    pub fn detecting(landmarks: Vec<crate::pose::Landmark>) -> Self {
        Self::with_response(Ok(Some(landmarks)))
    }

    /// Never finds a person.
    pub fn empty() -> Self {
        Self::with_response(Ok(None))
    }

    /// Fails every call with `error`.
    pub fn failing(error: EngineError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Option<Vec<crate::pose::Landmark>>, EngineError>) -> Self {
        Self {
            response,
            closes: Default::default(),
            closed: false,
        }
    }

    /// Shared counter incremented by every `close` call.
    pub fn close_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        std::sync::Arc::clone(&self.closes)
    }
}

#[cfg(test)]
impl PoseEngine for MockPoseEngine {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<PoseResult>, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        match &self.response {
            Ok(Some(landmarks)) => PoseResult::new(frame.sequence, landmarks.clone()).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e.clone()),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.closes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
