//! Landmarks, pose results and reference animations.

use serde::{Deserialize, Serialize};

use super::engine::EngineError;

/// Number of joints tracked by the body pose topology.
pub const NUM_LANDMARKS: usize = 33;

fn default_visibility() -> f32 {
    1.0
}

// ---------------------------------------------------------------------------
// Landmark
// ---------------------------------------------------------------------------

/// One tracked body joint.
///
/// `x` and `y` are normalised to `[0, 1]` relative to the frame size, `z` is
/// relative depth on the same scale.  `visibility` is the detector's
/// confidence in `[0, 1]`.  Precomputed animation data often omits it, in
/// which case the joint is treated as fully visible.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// `true` when the joint's confidence is strictly above `threshold`.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }
}

// ---------------------------------------------------------------------------
// PoseResult
// ---------------------------------------------------------------------------

/// The full set of landmarks detected in one video frame.
///
/// Always holds exactly [`NUM_LANDMARKS`] entries; construct through
/// [`PoseResult::new`] so the length is checked once at the engine boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseResult {
    landmarks: Vec<Landmark>,
    frame_sequence: u64,
}

impl PoseResult {
    /// Wrap `landmarks` detected in the frame numbered `frame_sequence`.
    ///
    /// # Errors
    ///
    /// [`EngineError::LandmarkCount`] when the sequence is not exactly
    /// [`NUM_LANDMARKS`] long.
    pub fn new(frame_sequence: u64, landmarks: Vec<Landmark>) -> Result<Self, EngineError> {
        if landmarks.len() != NUM_LANDMARKS {
            return Err(EngineError::LandmarkCount {
                expected: NUM_LANDMARKS,
                actual: landmarks.len(),
            });
        }
        Ok(Self {
            landmarks,
            frame_sequence,
        })
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Sequence number of the frame this result was detected in.
    pub fn frame_sequence(&self) -> u64 {
        self.frame_sequence
    }

    /// Plain numeric copy of the landmarks for the analysis request body.
    pub fn to_payload(&self) -> Vec<Landmark> {
        self.landmarks.clone()
    }
}

// ---------------------------------------------------------------------------
// Keyframe / Animation
// ---------------------------------------------------------------------------

/// One frame of a precomputed reference animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub pose_landmarks: Vec<Landmark>,
}

/// Ordered keyframes played cyclically by the animation player.
///
/// Serialised as a bare JSON array of keyframes.  An empty animation is
/// representable (the service may send one) and is simply never played.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Animation {
    keyframes: Vec<Keyframe>,
}

impl Animation {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Self { keyframes }
    }

    /// Parse an animation from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load an animation from a JSON file on disk.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
