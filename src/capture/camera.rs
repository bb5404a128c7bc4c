//! Webcam frame source backed by `nokhwa`.
//!
//! The device is probed once on the calling thread so permission and
//! device errors surface before any thread is spawned.  A background thread
//! then owns the `Camera`, decodes every frame to RGB and publishes it into
//! a [`FrameSlot`].  [`CameraSource::release`] (or drop) stops the thread and
//! joins it, which closes the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use super::frame::{CaptureError, FrameSlot, FrameSource, VideoFrame};

fn map_open_error(index: u32, err: NokhwaError) -> CaptureError {
    let message = err.to_string();
    if message.to_lowercase().contains("permission") {
        CaptureError::PermissionDenied
    } else if message.to_lowercase().contains("not found") {
        CaptureError::NoDevice(index)
    } else {
        CaptureError::Open(message)
    }
}

fn build_camera(index: u32) -> Result<Camera, CaptureError> {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera =
        Camera::new(CameraIndex::Index(index), requested).map_err(|e| map_open_error(index, e))?;
    camera.open_stream().map_err(|e| map_open_error(index, e))?;
    Ok(camera)
}

/// Live camera stream writing into a single latest-frame slot.
pub struct CameraSource {
    slot: FrameSlot,
    width: u32,
    height: u32,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraSource {
    /// Open camera `index` and start streaming.
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        // Fail fast before spawning the capture thread.
        let (width, height) = {
            let probe = build_camera(index)?;
            let resolution = probe.resolution();
            (resolution.width(), resolution.height())
        };
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidSize { width, height });
        }

        let slot = FrameSlot::new();
        let stop = Arc::new(AtomicBool::new(false));

        let writer = slot.clone();
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || {
                let mut camera = match build_camera(index) {
                    Ok(cam) => cam,
                    Err(err) => {
                        log::error!("capture: failed to reopen camera {index}: {err}");
                        writer.fail(err);
                        return;
                    }
                };

                let mut sequence = 0u64;
                while !stop_flag.load(Ordering::Relaxed) {
                    let buffer = match camera.frame() {
                        Ok(buffer) => buffer,
                        Err(err) => {
                            log::warn!("capture: frame read failed: {err}");
                            continue;
                        }
                    };
                    let decoded = match buffer.decode_image::<RgbFormat>() {
                        Ok(img) => img,
                        Err(err) => {
                            log::warn!("capture: failed to decode frame: {err}");
                            continue;
                        }
                    };

                    let (w, h) = decoded.dimensions();
                    if (w, h) != (width, height) {
                        log::trace!("capture: skipping {w}x{h} frame");
                        continue;
                    }

                    sequence += 1;
                    writer.publish(VideoFrame::new(w, h, decoded.into_raw(), sequence));
                }

                if let Err(err) = camera.stop_stream() {
                    log::warn!("capture: failed to stop stream cleanly: {err}");
                }
                writer.clear();
                log::debug!("capture: camera thread exited after {sequence} frames");
            })
            .map_err(|e| CaptureError::Open(e.to_string()))?;

        log::info!("capture: camera {index} streaming at {width}x{height}");

        Ok(Self {
            slot,
            width,
            height,
            stop,
            handle: Some(handle),
        })
    }
}

impl FrameSource for CameraSource {
    fn current_frame(&self) -> Option<VideoFrame> {
        self.slot.latest().filter(VideoFrame::is_valid)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn take_fault(&mut self) -> Option<CaptureError> {
        self.slot.take_fault()
    }

    fn release(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::info!("capture: camera released");
        }
        self.slot.clear();
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
