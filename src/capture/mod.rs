//! Video frame sources.
//!
//! A [`FrameSource`] always exposes the *latest* frame and never blocks: the
//! capture thread (if any) overwrites a single [`FrameSlot`] and the capture
//! loop clones whatever is there when it ticks.
//!
//! * [`SyntheticSource`]: blank frames at a fixed size, no hardware.
//! * `CameraSource`: webcam capture via `nokhwa` (cargo feature `camera`).

#[cfg(feature = "camera")]
pub mod camera;
pub mod frame;
pub mod synthetic;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use frame::{CaptureError, FrameSlot, FrameSource, VideoFrame};
pub use synthetic::SyntheticSource;
