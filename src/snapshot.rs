//! One-shot camera capture to PNG
//!
//! Useful for checking the camera path without a tracking client.

use crate::config::CameraConfig;
use crate::core::driver::Camera;
use crate::core::types::{CameraHandle, ColorSpace, ImageFrame};
use crate::error::{Error, Result};
use image::{GrayImage, ImageFormat, RgbImage};
use log::{info, warn};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// How long to wait for the first frame
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

const FRAME_POLL: Duration = Duration::from_millis(10);

/// Capture one frame from `camera` and write it to `path` as PNG
pub fn capture(camera: &mut dyn Camera, config: &CameraConfig, path: &Path) -> Result<()> {
    let handle = camera.subscribe(config.resolution, config.color_space, config.fps)?;

    let result = wait_for_frame(camera, handle).and_then(|frame| {
        let written = save_png(&frame, path);
        if let Err(e) = camera.release_frame(handle) {
            warn!("Frame release failed: {}", e);
        }
        written
    });

    if let Err(e) = camera.unsubscribe(handle) {
        warn!("Camera unsubscribe failed: {}", e);
    }
    result
}

fn wait_for_frame(camera: &mut dyn Camera, handle: CameraHandle) -> Result<ImageFrame> {
    let deadline = Instant::now() + FRAME_TIMEOUT;
    loop {
        if let Some(frame) = camera.get_frame(handle)? {
            return Ok(frame);
        }
        if Instant::now() >= deadline {
            return Err(Error::Camera(format!(
                "no frame within {:?}",
                FRAME_TIMEOUT
            )));
        }
        thread::sleep(FRAME_POLL);
    }
}

/// Write a raw frame as PNG
pub fn save_png(frame: &ImageFrame, path: &Path) -> Result<()> {
    if frame.len() != frame.expected_len() {
        return Err(Error::Camera(format!(
            "frame is {} bytes, expected {}",
            frame.len(),
            frame.expected_len()
        )));
    }

    match frame.color_space {
        ColorSpace::Rgb => {
            let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(|| Error::Camera("buffer does not fit dimensions".into()))?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
        ColorSpace::Bgr => {
            let mut data = frame.data.clone();
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
            let img = RgbImage::from_raw(frame.width, frame.height, data)
                .ok_or_else(|| Error::Camera("buffer does not fit dimensions".into()))?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
        ColorSpace::Y => {
            let img = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(|| Error::Camera("buffer does not fit dimensions".into()))?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
        ColorSpace::Yuv422 => {
            return Err(Error::NotSupported(
                "PNG snapshot of yuv422 frames".to_string(),
            ));
        }
    }

    info!(
        "Snapshot {}x{} {:?} written to {}",
        frame.width,
        frame.height,
        frame.color_space,
        path.display()
    );
    Ok(())
}
