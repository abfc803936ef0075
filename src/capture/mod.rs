//! Camera capture and frame encoding.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CameraProvider`] | Camera negotiation seam |
//! | [`CaptureDevice`] | Acquired camera, owns its tracks |
//! | [`VideoSource`] | Readable feed of a device |
//! | [`FrameEncoder`] | Sample to compressed payload |
//! | [`FrameClock`] | Display refresh tick |
//! | [`StillCamera`] | Provider backed by still images |

// ============================================================================
// Submodules
// ============================================================================

/// Display refresh tick.
pub mod clock;

/// Capture devices and camera negotiation.
pub mod device;

/// Frame compression.
pub mod encoder;

/// Video samples and sources.
pub mod sample;

/// File-backed camera provider.
pub mod still;

// ============================================================================
// Re-exports
// ============================================================================

pub use clock::{DEFAULT_REFRESH_INTERVAL, FrameClock};
pub use device::{CameraProvider, CaptureDevice, FacingMode, MediaConstraints, MediaTrack};
pub use encoder::{DEFAULT_JPEG_QUALITY, FrameEncoder, FramePayload, ImageFormat};
pub use sample::{VideoSample, VideoSource};
pub use still::StillCamera;
