//! Replay engine: answers each frame with the next pose of a recording.
//!
//! Lets a session run end to end without a model: the recording is either a
//! JSON file of keyframes (the same format as reference animations) or the
//! exercise's own animation.  Frames are ignored apart from their sequence
//! number.

use std::path::Path;

use crate::capture::VideoFrame;
use crate::pose::{Animation, EngineError, EngineOptions, Landmark, PoseEngine, PoseResult};

/// Cycles through a recorded landmark sequence, one pose per `detect` call.
pub struct ReplayEngine {
    poses: Vec<Vec<Landmark>>,
    cursor: usize,
    options: EngineOptions,
    closed: bool,
}

impl ReplayEngine {
    /// Build from an animation's keyframes.
    ///
    /// # Errors
    ///
    /// [`EngineError::Init`] when the animation is empty, and
    /// [`EngineError::LandmarkCount`] when a keyframe does not carry the full
    /// joint topology.
    pub fn from_animation(animation: &Animation, options: EngineOptions) -> Result<Self, EngineError> {
        if animation.is_empty() {
            return Err(EngineError::Init("recording has no frames".into()));
        }

        let mut poses = Vec::with_capacity(animation.len());
        for keyframe in animation.keyframes() {
            // Validate once here so detect() can never fail on length.
            PoseResult::new(0, keyframe.pose_landmarks.clone())?;
            poses.push(keyframe.pose_landmarks.clone());
        }

        log::info!(
            "replay engine ready ({} poses, detection ≥ {:.2})",
            poses.len(),
            options.min_detection_confidence
        );

        Ok(Self {
            poses,
            cursor: 0,
            options,
            closed: false,
        })
    }

    /// Load a recording from a JSON keyframe file.
    pub fn load(path: impl AsRef<Path>, options: EngineOptions) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let animation = Animation::load(path)
            .map_err(|e| EngineError::Init(format!("{}: {e}", path.display())))?;
        Self::from_animation(&animation, options)
    }

    /// Mean visibility of a pose, used as its detection confidence.
    fn confidence(pose: &[Landmark]) -> f32 {
        if pose.is_empty() {
            return 0.0;
        }
        pose.iter().map(|lm| lm.visibility).sum::<f32>() / pose.len() as f32
    }
}

impl PoseEngine for ReplayEngine {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<PoseResult>, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }

        let pose = &self.poses[self.cursor];
        self.cursor = (self.cursor + 1) % self.poses.len();

        if Self::confidence(pose) < self.options.min_detection_confidence {
            return Ok(None);
        }
        PoseResult::new(frame.sequence, pose.clone()).map(Some)
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("replay engine closed");
        }
        self.closed = true;
        self.poses.clear();
        self.poses.shrink_to_fit();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keyframe, NUM_LANDMARKS};

    fn keyframe(x: f32, visibility: f32) -> Keyframe {
        Keyframe {
            pose_landmarks: vec![Landmark::new(x, 0.5, 0.0, visibility); NUM_LANDMARKS],
        }
    }

    fn frame(seq: u64) -> VideoFrame {
        VideoFrame::blank(8, 8, seq)
    }

    #[test]
    fn cycles_through_recording() {
        let anim = Animation::new(vec![keyframe(0.1, 0.9), keyframe(0.2, 0.9)]);
        let mut engine = ReplayEngine::from_animation(&anim, EngineOptions::default()).unwrap();

        let xs: Vec<f32> = (0..3)
            .map(|i| engine.detect(&frame(i)).unwrap().unwrap().landmarks()[0].x)
            .collect();
        assert_eq!(xs, vec![0.1, 0.2, 0.1]);
    }

    #[test]
    fn result_carries_frame_sequence() {
        let anim = Animation::new(vec![keyframe(0.1, 0.9)]);
        let mut engine = ReplayEngine::from_animation(&anim, EngineOptions::default()).unwrap();
        let pose = engine.detect(&frame(42)).unwrap().unwrap();
        assert_eq!(pose.frame_sequence(), 42);
    }

    #[test]
    fn low_confidence_pose_is_no_detection() {
        let anim = Animation::new(vec![keyframe(0.1, 0.2)]);
        let mut engine = ReplayEngine::from_animation(&anim, EngineOptions::default()).unwrap();
        assert!(engine.detect(&frame(0)).unwrap().is_none());
    }

    #[test]
    fn empty_recording_fails_init() {
        let result = ReplayEngine::from_animation(&Animation::default(), EngineOptions::default());
        assert!(matches!(result, Err(EngineError::Init(_))));
    }

    #[test]
    fn partial_topology_is_rejected() {
        let anim = Animation::new(vec![Keyframe {
            pose_landmarks: vec![Landmark::default(); 3],
        }]);
        let result = ReplayEngine::from_animation(&anim, EngineOptions::default());
        assert!(matches!(result, Err(EngineError::LandmarkCount { .. })));
    }

    #[test]
    fn load_missing_file_is_init_error() {
        let result = ReplayEngine::load("/nonexistent/recording.json", EngineOptions::default());
        assert!(matches!(result, Err(EngineError::Init(_))));
    }

    #[test]
    fn detect_after_close_fails() {
        let anim = Animation::new(vec![keyframe(0.1, 0.9)]);
        let mut engine = ReplayEngine::from_animation(&anim, EngineOptions::default()).unwrap();
        engine.close();
        assert!(matches!(engine.detect(&frame(0)), Err(EngineError::Closed)));
    }
}
