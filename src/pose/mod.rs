//! Pose data model and the inference-engine contract.
//!
//! * [`Landmark`] / [`PoseResult`]: per-frame detections.
//! * [`Keyframe`] / [`Animation`]: precomputed reference movement.
//! * [`POSE_CONNECTIONS`]: the static edge set shared by every skeleton.
//! * [`PoseEngine`]: object-safe trait implemented by inference backends.
//! * [`ReplayEngine`]: backend that replays recorded landmark sequences.

pub mod connections;
pub mod engine;
pub mod landmark;
pub mod replay;

pub use connections::{Connection, POSE_CONNECTIONS};
pub use engine::{EngineError, EngineOptions, PoseEngine};
pub use landmark::{Animation, Keyframe, Landmark, PoseResult, NUM_LANDMARKS};
pub use replay::ReplayEngine;

#[cfg(test)]
pub use engine::MockPoseEngine;
