//! Guided rehabilitation exercise sessions: live pose capture, reference
//! skeleton playback and throttled correctness feedback.
//!
//! The crate is split the same way the session window is wired:
//!
//! ```text
//! capture::FrameSource ─▶ pipeline::InferenceWorker (pose::PoseEngine)
//!                                │
//!                                ▼
//!                   pipeline::CaptureLoop ──▶ render::SkeletonRenderer
//!                                │
//!                                ▼
//!                   pipeline::FeedbackThrottler ─▶ pipeline::FeedbackDispatcher
//!                                                        │ (api::AnalysisClient)
//!                                                        ▼
//!                                               pipeline::FeedbackState ─▶ UI
//!
//! pipeline::AnimationPlayer ──▶ render::SkeletonRenderer (own surface)
//! ```

pub mod api;
pub mod app;
pub mod capture;
pub mod config;
pub mod hotkey;
pub mod pipeline;
pub mod pose;
pub mod render;
pub mod session;
