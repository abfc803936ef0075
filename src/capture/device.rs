//! Capture devices, their tracks, and the camera negotiation seam.
//!
//! A [`CaptureDevice`] is the exclusive handle a session holds on the camera.
//! Every device owns one or more [`MediaTrack`]s; stopping the device stops
//! every track, and dropping it does the same.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

use super::sample::VideoSource;

// ============================================================================
// MediaConstraints
// ============================================================================

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, toward the operator.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

/// Capability request passed to a [`CameraProvider`].
///
/// Width and height are hints; the provider may deliver another size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Preferred frame width.
    pub ideal_width: u32,
    /// Preferred frame height.
    pub ideal_height: u32,
    /// Preferred facing.
    pub facing: FacingMode,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: FacingMode::User,
        }
    }
}

// ============================================================================
// MediaTrack
// ============================================================================

/// A running track of a capture device.
///
/// Clones share the same liveness flag, so a provider can hand one clone to
/// the device and keep another to observe release.
#[derive(Clone)]
pub struct MediaTrack {
    id: Uuid,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    /// Creates a live track.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` until the track is stopped.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stops the track. Idempotent.
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            debug!(track = %self.id, label = %self.label, "Track stopped");
        }
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("live", &self.is_live())
            .finish()
    }
}

// ============================================================================
// CaptureDevice
// ============================================================================

/// An acquired camera.
pub struct CaptureDevice {
    tracks: Vec<MediaTrack>,
    source: Arc<dyn VideoSource>,
    resolution: (u32, u32),
}

impl CaptureDevice {
    /// Wraps acquired tracks and the source they feed.
    #[must_use]
    pub fn new(tracks: Vec<MediaTrack>, source: Arc<dyn VideoSource>, resolution: (u32, u32)) -> Self {
        Self {
            tracks,
            source,
            resolution,
        }
    }

    /// Returns the readable video feed.
    #[inline]
    #[must_use]
    pub fn source(&self) -> Arc<dyn VideoSource> {
        Arc::clone(&self.source)
    }

    /// Nominal resolution the provider granted.
    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Returns `true` if any track is still running.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Stops every track. Idempotent.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl fmt::Debug for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureDevice")
            .field("tracks", &self.tracks)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        self.stop_all();
    }
}

// ============================================================================
// CameraProvider
// ============================================================================

/// Platform camera negotiation.
///
/// Implementations must report denial or missing hardware as
/// [`Error::Capability`](crate::Error::Capability).
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Requests a device matching `constraints` as closely as possible.
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<CaptureDevice>;
}

// ============================================================================
// Tests
// ============================================================================
