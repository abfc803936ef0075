//! Frame compression.
//!
//! Turns a [`VideoSample`] into a [`FramePayload`] ready for the socket.
//! The default policy is lossy JPEG at a reduced quality so one payload per
//! round trip stays small.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::trace;

use crate::error::{Error, Result};

use super::sample::VideoSample;

// ============================================================================
// Constants
// ============================================================================

/// Default JPEG quality (0.7 on the unit scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

// ============================================================================
// ImageFormat
// ============================================================================

/// Compression format for frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless, larger payloads).
    Png,
    /// JPEG format with quality (1-100).
    Jpeg(u8),
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Jpeg(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality clamped to 1-100.
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.clamp(1, 100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    #[must_use]
    pub fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }
}

// ============================================================================
// FramePayload
// ============================================================================

/// One compressed frame.
///
/// Not `Clone`: a payload is produced once and handed to the transport once.
#[derive(PartialEq, Eq)]
pub struct FramePayload {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl FramePayload {
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Source dimensions (width, height).
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the payload into its wire form: bare standard base64.
    #[must_use]
    pub fn into_base64(self) -> String {
        Base64Standard.encode(&self.bytes)
    }
}

impl fmt::Debug for FramePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePayload")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ============================================================================
// FrameEncoder
// ============================================================================

/// Compresses video samples at a fixed format and quality.
///
/// Deterministic: identical pixels and quality yield identical bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEncoder {
    format: ImageFormat,
}

impl FrameEncoder {
    /// Creates an encoder for `format`.
    #[inline]
    #[must_use]
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Encodes one sample.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSample`] if the sample has a zero dimension or its
    ///   buffer does not match its dimensions
    /// - [`Error::Image`] if the codec fails
    pub fn encode(&self, sample: &VideoSample) -> Result<FramePayload> {
        let (width, height) = (sample.width(), sample.height());

        if !sample.is_ready() || sample.pixels().len() != sample.expected_len() {
            return Err(Error::invalid_sample(width, height, sample.pixels().len()));
        }

        let mut bytes = Vec::with_capacity(sample.expected_len() / 8);

        match self.format {
            ImageFormat::Jpeg(quality) => {
                JpegEncoder::new_with_quality(&mut bytes, quality).write_image(
                    sample.pixels(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            ImageFormat::Png => {
                PngEncoder::new(&mut bytes).write_image(
                    sample.pixels(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
        }

        trace!(width, height, bytes = bytes.len(), format = ?self.format, "Frame encoded");

        Ok(FramePayload {
            bytes,
            format: self.format,
            width,
            height,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> VideoSample {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        });
        VideoSample::from_image(&image)
    }

    #[test]
    fn test_default_format_is_reduced_quality_jpeg() {
        assert_eq!(ImageFormat::default(), ImageFormat::Jpeg(70));
        assert_eq!(FrameEncoder::default().format().quality(), Some(70));
    }

    #[test]
    fn test_jpeg_quality_clamped() {
        assert_eq!(ImageFormat::jpeg(0), ImageFormat::Jpeg(1));
        assert_eq!(ImageFormat::jpeg(250), ImageFormat::Jpeg(100));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let payload = FrameEncoder::default().encode(&gradient(32, 24)).unwrap();

        assert_eq!(&payload.bytes()[..2], &[0xFF, 0xD8]);
        assert_eq!(payload.dimensions(), (32, 24));
        assert_eq!(payload.format().mime_type(), "image/jpeg");
    }

    #[test]
    fn test_encode_png_produces_png_magic() {
        let payload = FrameEncoder::new(ImageFormat::png()).encode(&gradient(8, 8)).unwrap();
        assert_eq!(&payload.bytes()[1..4], b"PNG");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = FrameEncoder::new(ImageFormat::jpeg(70));
        let sample = gradient(40, 30);

        let a = encoder.encode(&sample).unwrap();
        let b = encoder.encode(&sample).unwrap();
        assert_eq!(a.bytes(), b.bytes());
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let sample = gradient(64, 64);
        let low = FrameEncoder::new(ImageFormat::jpeg(20)).encode(&sample).unwrap();
        let high = FrameEncoder::new(ImageFormat::jpeg(95)).encode(&sample).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = FrameEncoder::default().encode(&VideoSample::empty()).unwrap_err();
        assert!(matches!(err, Error::InvalidSample { width: 0, height: 0, .. }));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let sample = VideoSample::new(4, 4, vec![0u8; 10]);
        let err = FrameEncoder::default().encode(&sample).unwrap_err();
        assert!(matches!(err, Error::InvalidSample { len: 10, .. }));
    }

    #[test]
    fn test_into_base64_roundtrips_bytes() {
        let payload = FrameEncoder::default().encode(&gradient(8, 8)).unwrap();
        let raw = payload.bytes().to_vec();
        let text = payload.into_base64();

        assert!(!text.contains(','));
        assert_eq!(Base64Standard.decode(text).unwrap(), raw);
    }
}
