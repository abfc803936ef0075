//! File-backed camera provider.
//!
//! [`StillCamera`] serves still pictures in rotation as if they came from a
//! live device. It backs the demos and the crate's own tests, and stands in
//! wherever a real device negotiation is not available.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::device::{CameraProvider, CaptureDevice, MediaConstraints, MediaTrack};
use super::sample::{VideoSample, VideoSource};

// ============================================================================
// StillCamera
// ============================================================================

/// Camera provider backed by in-memory still images.
pub struct StillCamera {
    frames: Arc<[VideoSample]>,
    warmup: u32,
    denial: Option<String>,
    issued: Mutex<Vec<MediaTrack>>,
}

impl StillCamera {
    /// Creates a provider cycling through `images`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `images` is empty.
    pub fn from_images(images: impl IntoIterator<Item = RgbImage>) -> Result<Self> {
        let frames: Vec<VideoSample> = images.into_iter().map(|i| VideoSample::from_image(&i)).collect();
        if frames.is_empty() {
            return Err(Error::config("StillCamera needs at least one image"));
        }

        Ok(Self {
            frames: frames.into(),
            warmup: 0,
            denial: None,
            issued: Mutex::new(Vec::new()),
        })
    }

    /// Loads images from disk (PNG or JPEG).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if any file cannot be decoded.
    pub fn open<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let mut images = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let image = image::open(path)?.to_rgb8();
            debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded still frame");
            images.push(image);
        }
        Self::from_images(images)
    }

    /// A single synthetic gradient frame of the given size.
    #[must_use]
    pub fn test_pattern(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x ^ y) & 0xFF) as u8,
            ])
        });

        Self {
            frames: vec![VideoSample::from_image(&image)].into(),
            warmup: 0,
            denial: None,
            issued: Mutex::new(Vec::new()),
        }
    }

    /// Reports `0x0` for the first `snapshots` reads of each acquired device.
    #[must_use]
    pub fn with_warmup(mut self, snapshots: u32) -> Self {
        self.warmup = snapshots;
        self
    }

    /// Makes every acquisition fail with a capability error.
    #[must_use]
    pub fn denied(mut self, reason: impl Into<String>) -> Self {
        self.denial = Some(reason.into());
        self
    }

    /// Tracks handed out so far, in acquisition order.
    #[must_use]
    pub fn issued_tracks(&self) -> Vec<MediaTrack> {
        self.issued.lock().clone()
    }

    /// Returns `true` if any issued track is still running.
    #[must_use]
    pub fn any_live(&self) -> bool {
        self.issued.lock().iter().any(MediaTrack::is_live)
    }
}

#[async_trait]
impl CameraProvider for StillCamera {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<CaptureDevice> {
        if let Some(reason) = &self.denial {
            return Err(Error::capability(reason.clone()));
        }

        let first = &self.frames[0];
        let resolution = (first.width(), first.height());
        let track = MediaTrack::new(format!("still-camera ({:?})", constraints.facing));
        self.issued.lock().push(track.clone());

        info!(
            ideal_width = constraints.ideal_width,
            ideal_height = constraints.ideal_height,
            width = resolution.0,
            height = resolution.1,
            "Still camera acquired"
        );

        let source = StillSource {
            frames: Arc::clone(&self.frames),
            cursor: AtomicUsize::new(0),
            warmup_left: AtomicU32::new(self.warmup),
        };

        Ok(CaptureDevice::new(vec![track], Arc::new(source), resolution))
    }
}

// ============================================================================
// StillSource
// ============================================================================

/// The readable feed of one acquired [`StillCamera`] device.
struct StillSource {
    frames: Arc<[VideoSample]>,
    cursor: AtomicUsize,
    warmup_left: AtomicU32,
}

impl VideoSource for StillSource {
    fn snapshot(&self) -> VideoSample {
        let warming = self
            .warmup_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if warming {
            return VideoSample::empty();
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        self.frames[index].clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_images_rejects_empty() {
        let result = StillCamera::from_images(Vec::new());
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_acquire_yields_live_track() {
        let camera = StillCamera::test_pattern(16, 9);
        let device = camera.acquire(&MediaConstraints::default()).await.unwrap();

        assert_eq!(device.resolution(), (16, 9));
        assert!(device.is_live());
        assert!(camera.any_live());

        device.stop_all();
        assert!(!camera.any_live());
    }

    #[tokio::test]
    async fn test_denied_is_capability_error() {
        let camera = StillCamera::test_pattern(4, 4).denied("permission denied");
        let err = camera.acquire(&MediaConstraints::default()).await.unwrap_err();

        assert!(err.is_capability_error());
        assert!(camera.issued_tracks().is_empty());
    }

    #[tokio::test]
    async fn test_warmup_reports_zero_dimensions() {
        let camera = StillCamera::test_pattern(8, 8).with_warmup(2);
        let device = camera.acquire(&MediaConstraints::default()).await.unwrap();
        let source = device.source();

        assert!(!source.snapshot().is_ready());
        assert!(!source.snapshot().is_ready());
        assert!(source.snapshot().is_ready());
    }

    #[tokio::test]
    async fn test_frames_rotate() {
        let red = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let blue = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        let camera = StillCamera::from_images([red, blue]).unwrap();
        let device = camera.acquire(&MediaConstraints::default()).await.unwrap();
        let source = device.source();

        assert_eq!(&source.snapshot().pixels()[..3], &[255, 0, 0]);
        assert_eq!(&source.snapshot().pixels()[..3], &[0, 0, 255]);
        assert_eq!(&source.snapshot().pixels()[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_open_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(3, 5, Rgb([1, 2, 3])).save(&path).unwrap();

        let camera = StillCamera::open([&path]).unwrap();
        assert_eq!(camera.frames[0].width(), 3);
        assert_eq!(camera.frames[0].height(), 5);
    }
}
