//! Builder pattern for session manager configuration.
//!
//! Provides a fluent API for configuring and creating [`SessionManager`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use safety_stream::{SessionManager, StillCamera};
//!
//! # fn example() -> safety_stream::Result<()> {
//! let manager = SessionManager::builder()
//!     .camera(StillCamera::test_pattern(1280, 720))
//!     .endpoint("ws://localhost:8000/ws")
//!     .jpeg_quality(70)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::capture::{CameraProvider, FacingMode, ImageFormat};
use crate::error::{Error, Result};

use super::lifecycle::SessionManager;
use super::options::StreamOptions;

// ============================================================================
// SessionManagerBuilder
// ============================================================================

/// Builder for configuring a [`SessionManager`].
///
/// Use [`SessionManager::builder()`] to create a new builder.
#[derive(Default)]
pub struct SessionManagerBuilder {
    /// Camera negotiation.
    camera: Option<Arc<dyn CameraProvider>>,
    /// Streaming options.
    options: StreamOptions,
}

// ============================================================================
// SessionManagerBuilder Implementation
// ============================================================================

impl SessionManagerBuilder {
    /// Creates a builder with default options and no camera.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the camera provider.
    #[inline]
    #[must_use]
    pub fn camera(mut self, camera: impl CameraProvider + 'static) -> Self {
        self.camera = Some(Arc::new(camera));
        self
    }

    /// Sets a shared camera provider.
    #[inline]
    #[must_use]
    pub fn camera_arc(mut self, camera: Arc<dyn CameraProvider>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Replaces all streaming options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the backend WebSocket URL.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    /// Sets the frame format.
    #[inline]
    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.options.format = format;
        self
    }

    /// Uses JPEG at `quality` (1-100).
    #[inline]
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.options.format = ImageFormat::Jpeg(quality);
        self
    }

    /// Sets the preferred capture resolution.
    #[inline]
    #[must_use]
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.options.resolution = (width, height);
        self
    }

    #[inline]
    #[must_use]
    pub fn facing(mut self, facing: FacingMode) -> Self {
        self.options.facing = facing;
        self
    }

    /// Sets the display refresh tick; zero yields between cycles.
    #[inline]
    #[must_use]
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.options.refresh_interval = interval;
        self
    }

    /// Bounds how long the transport may take to open.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Ends the session when one frame stays unanswered for `timeout`.
    #[inline]
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.options.response_timeout = Some(timeout);
        self
    }

    /// Builds the manager with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no camera is set
    /// - [`Error::Config`] if the options are invalid
    pub fn build(self) -> Result<SessionManager> {
        let camera = self.validate_camera()?;
        let endpoint = self.options.validate()?;

        Ok(SessionManager::from_parts(camera, self.options, endpoint))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionManagerBuilder {
    /// Validates the camera configuration.
    fn validate_camera(&self) -> Result<Arc<dyn CameraProvider>> {
        self.camera.clone().ok_or_else(|| {
            Error::config(
                "Camera provider is required. Use .camera() to set it.\n\
                 Example: SessionManager::builder().camera(StillCamera::test_pattern(1280, 720))",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
