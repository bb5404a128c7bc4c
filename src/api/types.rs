//! Request and response bodies exchanged with the analysis service.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::pose::{Animation, Landmark, PoseResult};

// ---------------------------------------------------------------------------
// Realtime analysis
// ---------------------------------------------------------------------------

/// Body of one throttled realtime-analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub pose_landmarks: Vec<Landmark>,
    /// Wall-clock time of the emission, milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,
}

impl AnalysisRequest {
    /// Strip `pose` to plain landmark fields and stamp it with the current
    /// wall-clock time.
    pub fn from_pose(pose: &PoseResult) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            pose_landmarks: pose.to_payload(),
            timestamp_ms,
        }
    }
}

/// Deviation of one joint angle from its target, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleError {
    pub current: f32,
    pub target: f32,
    pub diff: f32,
}

/// Correctness feedback for one analysed pose.
///
/// Superseded wholesale by the next result; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// 0–100.
    pub score: u8,
    pub is_correct: bool,
    #[serde(default)]
    pub critical_error: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    /// Joint name → angle deviation.  Ordered so the UI lists joints stably.
    #[serde(default)]
    pub angle_errors: BTreeMap<String, AngleError>,
}

impl FeedbackResult {
    /// Joints sorted by absolute deviation, worst first.
    pub fn worst_joints(&self) -> Vec<(&str, &AngleError)> {
        let mut joints: Vec<_> = self
            .angle_errors
            .iter()
            .map(|(name, err)| (name.as_str(), err))
            .collect();
        joints.sort_by(|a, b| b.1.diff.abs().total_cmp(&a.1.diff.abs()));
        joints
    }
}

// ---------------------------------------------------------------------------
// Session completion
// ---------------------------------------------------------------------------

/// One-shot summary posted when the user finishes the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub completed_sets: u32,
    pub completed_reps: u32,
    /// Rounded mean of all scores received; `None` when no feedback arrived.
    pub average_score: Option<u32>,
    /// Self-reported pain after the exercise, 0–10.
    pub pain_level: u8,
    pub duration_minutes: u32,
}

// ---------------------------------------------------------------------------
// Exercise metadata
// ---------------------------------------------------------------------------

/// Exercise description fetched before the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_sets: u32,
    #[serde(default)]
    pub target_reps: u32,
    #[serde(default, alias = "animation_data")]
    pub animation: Option<Animation>,
}

impl ExerciseInfo {
    /// Stand-in used when the service is unreachable.
    pub fn offline(exercise_id: &str) -> Self {
        Self {
            name: exercise_id.to_string(),
            description: None,
            target_sets: 0,
            target_reps: 0,
            animation: None,
        }
    }

    pub fn keyframe_count(&self) -> usize {
        self.animation.as_ref().map_or(0, Animation::len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::NUM_LANDMARKS;

    #[test]
    fn feedback_parses_full_body() {
        let json = r#"{
            "score": 82,
            "is_correct": true,
            "critical_error": false,
            "feedback": "Raise your left arm higher",
            "angle_errors": {
                "left_shoulder": {"current": 70.0, "target": 90.0, "diff": -20.0},
                "right_elbow":   {"current": 165.0, "target": 170.0, "diff": -5.0}
            }
        }"#;
        let result: FeedbackResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.score, 82);
        assert!(result.is_correct);
        assert_eq!(result.angle_errors.len(), 2);
        assert_eq!(result.angle_errors["left_shoulder"].target, 90.0);
    }

    #[test]
    fn feedback_optional_fields_default() {
        let result: FeedbackResult =
            serde_json::from_str(r#"{"score": 10, "is_correct": false}"#).unwrap();
        assert!(!result.critical_error);
        assert!(result.feedback.is_none());
        assert!(result.angle_errors.is_empty());
    }

    #[test]
    fn worst_joints_sorted_by_absolute_diff() {
        let mut angle_errors = BTreeMap::new();
        angle_errors.insert("a".into(), AngleError { current: 0.0, target: 0.0, diff: 3.0 });
        angle_errors.insert("b".into(), AngleError { current: 0.0, target: 0.0, diff: -12.0 });
        angle_errors.insert("c".into(), AngleError { current: 0.0, target: 0.0, diff: 7.0 });
        let result = FeedbackResult {
            score: 50,
            is_correct: false,
            critical_error: false,
            feedback: None,
            angle_errors,
        };
        let names: Vec<&str> = result.worst_joints().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn analysis_request_body_shape() {
        let pose = PoseResult::new(3, vec![Landmark::new(0.1, 0.2, 0.3, 0.9); NUM_LANDMARKS])
            .unwrap();
        let request = AnalysisRequest::from_pose(&pose);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["pose_landmarks"].as_array().unwrap().len(), NUM_LANDMARKS);
        assert!(json["timestamp_ms"].as_u64().unwrap() > 0);
        assert!(json.get("frame_sequence").is_none());
    }

    #[test]
    fn exercise_accepts_animation_data_alias() {
        let json = r#"{
            "name": "Shoulder raise",
            "target_sets": 3,
            "target_reps": 10,
            "animation_data": [{"pose_landmarks": []}, {"pose_landmarks": []}]
        }"#;
        let info: ExerciseInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.keyframe_count(), 2);
        assert_eq!(info.target_reps, 10);
    }

    #[test]
    fn offline_exercise_has_no_animation() {
        let info = ExerciseInfo::offline("42");
        assert_eq!(info.name, "42");
        assert_eq!(info.keyframe_count(), 0);
    }
}
