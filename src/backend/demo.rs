//! Demo-mode responder.
//!
//! Answers every frame with a `Demo Mode` verdict and the frame itself,
//! marked with a banner strip, as the annotated image. No detection runs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb};
use tracing::warn;

use crate::error::Result;
use crate::protocol::{Verdict, VerdictStatus};

use super::server::{FrameReceipt, Reply};

/// Message carried by every demo verdict.
pub const DEMO_MESSAGE: &str = "Backend is connected! AI models will be loaded next.";

/// Banner height in pixels.
const BANNER_HEIGHT: u32 = 36;

/// Accent line along the top of the banner.
const ACCENT: Rgb<u8> = Rgb([0, 255, 0]);

/// Builds the demo reply for one frame.
#[must_use]
pub fn demo_reply(frame: &FrameReceipt) -> Reply {
    let annotated_frame = match annotate(&frame.bytes) {
        Ok(bytes) => Some(Base64Standard.encode(bytes)),
        Err(e) => {
            warn!(error = %e, index = frame.index, "Demo annotation failed");
            None
        }
    };

    let verdict = Verdict {
        status: VerdictStatus::DemoMode,
        message: DEMO_MESSAGE.to_string(),
        user: None,
        missing_ppe: Vec::new(),
        annotated_frame,
    };

    Reply::verdict(&verdict).unwrap_or(Reply::Silence)
}

/// Darkens the top band of the frame and re-encodes it as JPEG.
fn annotate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut frame = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = frame.dimensions();

    for y in 0..BANNER_HEIGHT.min(height) {
        for x in 0..width {
            let pixel = frame.get_pixel_mut(x, y);
            if y < 3 {
                *pixel = ACCENT;
            } else {
                pixel.0 = pixel.0.map(|c| c / 4);
            }
        }
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 80).write_image(
        frame.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capture::{FrameEncoder, VideoSample};

    fn receipt() -> FrameReceipt {
        let sample = VideoSample::new(48, 48, vec![200u8; 48 * 48 * 3]);
        let payload = FrameEncoder::default().encode(&sample).unwrap();
        FrameReceipt {
            connection: 1,
            index: 1,
            bytes: payload.bytes().to_vec(),
            dimensions: (48, 48),
        }
    }

    #[test]
    fn test_demo_reply_is_demo_verdict() {
        let Reply::Text(body) = demo_reply(&receipt()) else {
            panic!("expected text reply");
        };
        let verdict: Verdict = serde_json::from_str(&body).unwrap();

        assert_eq!(verdict.status, VerdictStatus::DemoMode);
        assert_eq!(verdict.message, DEMO_MESSAGE);
        assert!(verdict.user.is_none());
        assert!(verdict.is_compliant());
    }

    #[test]
    fn test_annotated_frame_is_jpeg_with_banner() {
        let Reply::Text(body) = demo_reply(&receipt()) else {
            panic!("expected text reply");
        };
        let verdict: Verdict = serde_json::from_str(&body).unwrap();
        let bytes = verdict.annotated_image().unwrap().unwrap();

        let image = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (48, 48));
        // banner body is much darker than the untouched area
        assert!(image.get_pixel(10, 20).0[0] < 120);
        assert!(image.get_pixel(10, 44).0[0] > 150);
    }

    #[test]
    fn test_garbage_frame_still_answers() {
        let frame = FrameReceipt {
            connection: 1,
            index: 2,
            bytes: vec![1, 2, 3],
            dimensions: (0, 0),
        };
        let Reply::Text(body) = demo_reply(&frame) else {
            panic!("expected text reply");
        };
        let verdict: Verdict = serde_json::from_str(&body).unwrap();
        assert!(verdict.annotated_frame.is_none());
    }
}
