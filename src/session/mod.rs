//! Session bookkeeping for the end-of-session report.
//!
//! [`SessionTracker`] collects every feedback score, counts sets and reps,
//! and turns them into the [`CompletionRequest`](crate::api::CompletionRequest)
//! posted when the user finishes.

pub mod tracker;

pub use tracker::{SessionError, SessionTracker, MAX_PAIN_LEVEL};
