//! Hardware-free frame source producing blank frames at a fixed rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::frame::{CaptureError, FrameSource, VideoFrame};

/// Yields a new blank frame every `interval`, numbered by elapsed time.
///
/// Pair it with a replay engine to run a session without a camera.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    started: Instant,
    interval: Duration,
    released: bool,
}

impl SyntheticSource {
    /// # Errors
    ///
    /// [`CaptureError::InvalidSize`] for a zero width or height, or a zero
    /// frame rate.
    pub fn new(width: u32, height: u32, fps: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 || fps == 0 {
            return Err(CaptureError::InvalidSize { width, height });
        }
        let pixels = VideoFrame::blank(width, height, 0).rgb;
        Ok(Self {
            width,
            height,
            pixels,
            started: Instant::now(),
            interval: Duration::from_secs(1) / fps,
            released: false,
        })
    }
}

impl FrameSource for SyntheticSource {
    fn current_frame(&self) -> Option<VideoFrame> {
        if self.released {
            return None;
        }
        let now = Instant::now();
        let sequence = (now.duration_since(self.started).as_nanos() / self.interval.as_nanos()) as u64;
        Some(VideoFrame {
            width: self.width,
            height: self.height,
            rgb: Arc::clone(&self.pixels),
            sequence,
            captured_at: now,
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_valid_frames_of_fixed_size() {
        let source = SyntheticSource::new(64, 48, 30).unwrap();
        let frame = source.current_frame().unwrap();
        assert!(frame.is_valid());
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(source.dimensions(), (64, 48));
    }

    #[test]
    fn rejects_zero_size() {
        assert!(matches!(
            SyntheticSource::new(0, 48, 30),
            Err(CaptureError::InvalidSize { .. })
        ));
    }

    #[test]
    fn released_source_is_not_ready() {
        let mut source = SyntheticSource::new(8, 8, 30).unwrap();
        source.release();
        source.release();
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn sequence_never_goes_backwards() {
        let source = SyntheticSource::new(8, 8, 1000).unwrap();
        let a = source.current_frame().unwrap().sequence;
        std::thread::sleep(Duration::from_millis(3));
        let b = source.current_frame().unwrap().sequence;
        assert!(b >= a);
    }
}
