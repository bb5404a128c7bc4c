use std::time::{Duration, Instant};

use thiserror::Error;

use crate::api::{CompletionRequest, ExerciseInfo, FeedbackResult};

/// Upper bound of the self-reported pain scale.
pub const MAX_PAIN_LEVEL: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("pain level must be between 0 and 10, got {0}")]
    InvalidPainLevel(u8),

    #[error("session already completed")]
    AlreadyCompleted,
}

/// Running totals for one exercise session.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    started: Instant,
    scores: Vec<u8>,
    critical_errors: u32,
    completed_sets: u32,
    completed_reps: u32,
    target_sets: u32,
    target_reps: u32,
    completed: bool,
}

impl SessionTracker {
    pub fn new(exercise: &ExerciseInfo, started: Instant) -> Self {
        Self {
            started,
            scores: Vec::new(),
            critical_errors: 0,
            completed_sets: 0,
            completed_reps: 0,
            target_sets: exercise.target_sets,
            target_reps: exercise.target_reps,
            completed: false,
        }
    }

    /// Count one received feedback result.
    pub fn record(&mut self, result: &FeedbackResult) {
        self.scores.push(result.score);
        if result.critical_error {
            self.critical_errors += 1;
        }
    }

    pub fn feedback_count(&self) -> usize {
        self.scores.len()
    }

    pub fn critical_errors(&self) -> u32 {
        self.critical_errors
    }

    /// Mean score rounded to the nearest integer; `None` before any feedback.
    pub fn average_score(&self) -> Option<u32> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: u32 = self.scores.iter().map(|&s| u32::from(s)).sum();
        let n = self.scores.len() as f64;
        Some((f64::from(sum) / n).round() as u32)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Whole minutes, rounded; a started session counts as at least one.
    pub fn duration_minutes(&self, now: Instant) -> u32 {
        let minutes = (self.elapsed(now).as_secs_f64() / 60.0).round() as u32;
        minutes.max(1)
    }

    pub fn add_rep(&mut self) {
        self.completed_reps += 1;
    }

    pub fn finish_set(&mut self) {
        self.completed_sets += 1;
    }

    /// Overwrite the counters with what the user entered in the finish dialog.
    pub fn set_counts(&mut self, sets: u32, reps: u32) {
        self.completed_sets = sets;
        self.completed_reps = reps;
    }

    pub fn completed_sets(&self) -> u32 {
        self.completed_sets
    }

    pub fn completed_reps(&self) -> u32 {
        self.completed_reps
    }

    /// `(sets, reps)` targets of the exercise; zero when unknown.
    pub fn targets(&self) -> (u32, u32) {
        (self.target_sets, self.target_reps)
    }

    /// Build the completion report.  Does not change any state, so a failed
    /// submission can simply be retried.
    pub fn completion_request(
        &self,
        pain_level: u8,
        now: Instant,
    ) -> Result<CompletionRequest, SessionError> {
        if self.completed {
            return Err(SessionError::AlreadyCompleted);
        }
        if pain_level > MAX_PAIN_LEVEL {
            return Err(SessionError::InvalidPainLevel(pain_level));
        }
        Ok(CompletionRequest {
            completed_sets: self.completed_sets,
            completed_reps: self.completed_reps,
            average_score: self.average_score(),
            pain_level,
            duration_minutes: self.duration_minutes(now),
        })
    }

    /// Record that the service accepted the report.
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
