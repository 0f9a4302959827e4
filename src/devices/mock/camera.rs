//! Simulated camera
//!
//! Each subscription runs a capture thread producing synthetic frames (a
//! moving diagonal gradient with per-byte noise) at the subscribed rate.
//! Frames pass through a one-slot channel; the producer evicts an unread
//! frame before pushing, so `get_frame` always sees the freshest capture.
//!
//! Like a real camera SDK, a frame handed out by `get_frame` must be
//! released before the next one can be fetched.

use super::noise::NoiseGenerator;
use crate::core::driver::Camera;
use crate::core::types::{CameraHandle, ColorSpace, ImageFrame, Resolution};
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on simulated frame rate
const MAX_FPS: u32 = 120;

struct Subscription {
    frames: Receiver<ImageFrame>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    outstanding: bool,
}

impl Subscription {
    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Camera backed by synthetic frame generators
pub struct MockCamera {
    pixel_noise: u8,
    seed: u64,
    next_handle: u32,
    subscriptions: HashMap<CameraHandle, Subscription>,
}

impl MockCamera {
    pub fn new(pixel_noise: u8, seed: u64) -> Self {
        Self {
            pixel_noise,
            seed,
            next_handle: 1,
            subscriptions: HashMap::new(),
        }
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    fn subscription(&mut self, handle: CameraHandle) -> Result<&mut Subscription> {
        self.subscriptions
            .get_mut(&handle)
            .ok_or_else(|| Error::Camera(format!("unknown subscription {:?}", handle)))
    }
}

impl Camera for MockCamera {
    fn subscribe(
        &mut self,
        resolution: Resolution,
        color_space: ColorSpace,
        fps: u32,
    ) -> Result<CameraHandle> {
        if fps == 0 || fps > MAX_FPS {
            return Err(Error::InvalidParameter(format!(
                "fps must be in 1..={}, got {}",
                MAX_FPS, fps
            )));
        }

        let handle = CameraHandle(self.next_handle);
        self.next_handle += 1;

        // Distinct but reproducible noise per subscription
        let seed = if self.seed == 0 {
            0
        } else {
            self.seed.wrapping_add(handle.0 as u64)
        };
        let generator = FrameGenerator::new(resolution, color_space, self.pixel_noise, seed);

        let (tx, rx) = bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let evict = rx.clone();
        let interval = Duration::from_secs_f64(1.0 / fps as f64);

        let thread = thread::Builder::new()
            .name(format!("mock-camera-{}", handle.0))
            .spawn(move || capture_loop(generator, interval, tx, evict, thread_shutdown))
            .map_err(|e| Error::Other(format!("Failed to spawn camera thread: {}", e)))?;

        log::debug!(
            "Mock camera subscription {:?}: {:?} {:?} @ {} fps",
            handle,
            resolution,
            color_space,
            fps
        );

        self.subscriptions.insert(
            handle,
            Subscription {
                frames: rx,
                shutdown,
                thread: Some(thread),
                outstanding: false,
            },
        );
        Ok(handle)
    }

    fn get_frame(&mut self, handle: CameraHandle) -> Result<Option<ImageFrame>> {
        let sub = self.subscription(handle)?;
        if sub.outstanding {
            return Err(Error::Camera("previous frame not released".to_string()));
        }
        match sub.frames.try_recv() {
            Ok(frame) => {
                sub.outstanding = true;
                Ok(Some(frame))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(Error::Camera("capture thread stopped".to_string()))
            }
        }
    }

    fn release_frame(&mut self, handle: CameraHandle) -> Result<()> {
        self.subscription(handle)?.outstanding = false;
        Ok(())
    }

    fn unsubscribe(&mut self, handle: CameraHandle) -> Result<()> {
        let mut sub = self
            .subscriptions
            .remove(&handle)
            .ok_or_else(|| Error::Camera(format!("unknown subscription {:?}", handle)))?;
        sub.stop();
        log::debug!("Mock camera subscription {:?} closed", handle);
        Ok(())
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        for (_, mut sub) in self.subscriptions.drain() {
            sub.stop();
        }
    }
}

fn capture_loop(
    mut generator: FrameGenerator,
    interval: Duration,
    tx: Sender<ImageFrame>,
    evict: Receiver<ImageFrame>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let loop_start = Instant::now();

        let frame = generator.next_frame();
        if tx.is_full() {
            let _ = evict.try_recv();
        }
        let _ = tx.try_send(frame);

        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

/// Synthetic image source
pub struct FrameGenerator {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    pixel_noise: u8,
    noise: NoiseGenerator,
    frame_index: u32,
}

impl FrameGenerator {
    pub fn new(
        resolution: Resolution,
        color_space: ColorSpace,
        pixel_noise: u8,
        seed: u64,
    ) -> Self {
        let (width, height) = resolution.dimensions();
        Self {
            width,
            height,
            color_space,
            pixel_noise,
            noise: NoiseGenerator::new(seed),
            frame_index: 0,
        }
    }

    /// Render the next frame; the gradient shifts 4 px per frame
    pub fn next_frame(&mut self) -> ImageFrame {
        let channels = self.color_space.bytes_per_pixel();
        let shift = self.frame_index.wrapping_mul(4);
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * channels);

        for y in 0..self.height {
            for x in 0..self.width {
                let base = (x.wrapping_add(y).wrapping_add(shift) % 256) as u8;
                for c in 0..channels {
                    let value = base.wrapping_add((c as u8).wrapping_mul(85));
                    data.push(value.saturating_add(self.noise.byte(self.pixel_noise)));
                }
            }
        }

        self.frame_index = self.frame_index.wrapping_add(1);
        ImageFrame {
            width: self.width,
            height: self.height,
            color_space: self.color_space,
            data,
        }
    }
}
