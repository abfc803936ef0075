//! Video samples and the sources that produce them.

use std::fmt;
use std::sync::Arc;

use image::RgbImage;

// ============================================================================
// VideoSample
// ============================================================================

/// One readable picture from a video source, RGB8 packed.
///
/// A source that has not painted its first frame yet reports `0x0`; callers
/// check [`VideoSample::is_ready`] before encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoSample {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl VideoSample {
    /// Creates a sample from raw RGB8 pixels.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// A sample with no dimensions (device warming up).
    #[must_use]
    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }

    /// Creates a sample by copying an RGB image.
    #[must_use]
    pub fn from_image(image: &RgbImage) -> Self {
        Self::new(image.width(), image.height(), image.as_raw().as_slice())
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB8 pixel data, row-major.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns `true` once both dimensions are nonzero.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns the byte length a well-formed RGB8 buffer must have.
    #[inline]
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl fmt::Debug for VideoSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSample")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

// ============================================================================
// VideoSource
// ============================================================================

/// A continuously readable video feed.
///
/// `snapshot` must not block; it returns whatever the device currently shows.
pub trait VideoSource: Send + Sync {
    /// Returns the current picture.
    fn snapshot(&self) -> VideoSample;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_not_ready() {
        let sample = VideoSample::empty();
        assert!(!sample.is_ready());
        assert_eq!(sample.expected_len(), 0);
    }

    #[test]
    fn test_zero_width_is_not_ready() {
        let sample = VideoSample::new(0, 480, Vec::new());
        assert!(!sample.is_ready());
    }

    #[test]
    fn test_from_image() {
        let image = RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        let sample = VideoSample::from_image(&image);

        assert!(sample.is_ready());
        assert_eq!(sample.pixels().len(), sample.expected_len());
        assert_eq!(&sample.pixels()[..3], &[10, 20, 30]);
    }
}
