//! Remote analysis service: wire types and the async client.
//!
//! * [`AnalysisClient`]: async trait implemented by all backends.
//! * [`HttpAnalysisClient`]: `reqwest` implementation talking JSON over HTTP.
//! * [`FeedbackResult`], [`AnalysisRequest`], [`CompletionRequest`],
//!   [`ExerciseInfo`]: request and response bodies.
//! * [`ApiError`]: error variants for service calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pose_coach::api::{AnalysisClient, HttpAnalysisClient};
//! use pose_coach::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = HttpAnalysisClient::from_config(&config.analysis);
//!     let exercise = client.fetch_exercise("shoulder-raise").await.unwrap();
//!     println!("{} ({} keyframes)", exercise.name, exercise.keyframe_count());
//! }
//! ```

pub mod client;
pub mod types;

pub use client::{AnalysisClient, ApiError, HttpAnalysisClient};
pub use types::{AnalysisRequest, AngleError, CompletionRequest, ExerciseInfo, FeedbackResult};
