//! Frame type, the frame-source trait and the shared latest-frame slot.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;

// ---------------------------------------------------------------------------
// VideoFrame
// ---------------------------------------------------------------------------

/// One decoded RGB video frame.
///
/// Pixel data is reference counted so handing a frame to the inference
/// worker never copies the image.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB, `width * height * 3` bytes.
    pub rgb: Arc<[u8]>,
    /// Monotonic frame counter assigned by the source.
    pub sequence: u64,
    pub captured_at: Instant,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            rgb: rgb.into(),
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Mid-grey frame of the given size.
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        let len = width as usize * height as usize * 3;
        Self::new(width, height, vec![128; len], sequence)
    }

    /// Non-zero dimensions and a pixel buffer that matches them.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgb.len() == self.width as usize * self.height as usize * 3
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring a frame source.
///
/// All of them are fatal to live analysis for the session.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera found at index {0}")]
    NoDevice(u32),

    #[error("failed to open camera stream: {0}")]
    Open(String),

    #[error("invalid frame size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

// ---------------------------------------------------------------------------
// FrameSource
// ---------------------------------------------------------------------------

/// A continuously updating live video frame.
///
/// Dimensions are fixed when the source is acquired.
pub trait FrameSource: Send {
    /// The latest frame, or `None` while the stream is not ready (or after
    /// [`release`](Self::release)).  Never blocks.
    fn current_frame(&self) -> Option<VideoFrame>;

    /// `(width, height)` negotiated at acquisition.
    fn dimensions(&self) -> (u32, u32);

    /// Stop the stream and free the device.  Idempotent.
    fn release(&mut self);

    /// A failure that ended the stream after acquisition.  Returned once.
    fn take_fault(&mut self) -> Option<CaptureError> {
        None
    }
}

// ---------------------------------------------------------------------------
// FrameSlot
// ---------------------------------------------------------------------------

/// Single-entry frame buffer shared between a capture thread (writer) and the
/// capture loop (reader).  Each publish replaces the previous frame.  The
/// writer can also leave a fault for the reader when the stream dies.
#[derive(Debug, Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<VideoFrame>>>,
    fault: Arc<Mutex<Option<CaptureError>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held frame.
    pub fn publish(&self, frame: VideoFrame) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(frame);
        }
    }

    /// Clone of the latest frame, if any.
    pub fn latest(&self) -> Option<VideoFrame> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    /// Drop the held frame so readers see "not ready".
    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
    }

    /// Clear the frame and record why the stream ended.
    pub fn fail(&self, err: CaptureError) {
        self.clear();
        if let Ok(mut fault) = self.fault.lock() {
            *fault = Some(err);
        }
    }

    pub fn take_fault(&self) -> Option<CaptureError> {
        self.fault.lock().ok().and_then(|mut fault| fault.take())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
