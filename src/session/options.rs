//! Streaming options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use safety_stream::StreamOptions;
//!
//! let options = StreamOptions::new()
//!     .with_endpoint("ws://10.0.0.5:8000/ws")
//!     .with_jpeg_quality(60)
//!     .with_resolution(640, 480)
//!     .with_response_timeout(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::time::Duration;

use url::Url;

use crate::capture::{DEFAULT_REFRESH_INTERVAL, FacingMode, ImageFormat, MediaConstraints};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Backend endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Default bound on reaching `OPEN`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding the endpoint.
pub const ENV_ENDPOINT: &str = "SAFETY_STREAM_ENDPOINT";

/// Environment variable overriding the JPEG quality.
pub const ENV_QUALITY: &str = "SAFETY_STREAM_QUALITY";

// ============================================================================
// StreamOptions
// ============================================================================

/// Configuration for one [`SessionManager`](super::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Backend WebSocket URL.
    pub endpoint: String,

    /// Frame compression.
    pub format: ImageFormat,

    /// Preferred capture resolution (width, height).
    pub resolution: (u32, u32),

    /// Preferred camera facing.
    pub facing: FacingMode,

    /// Display refresh tick; zero means cooperative yield.
    pub refresh_interval: Duration,

    /// Bound on the transport reaching `OPEN`.
    pub connect_timeout: Duration,

    /// Bound on one frame staying in flight; `None` waits forever.
    pub response_timeout: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl StreamOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            format: ImageFormat::default(),
            resolution: (1280, 720),
            facing: FacingMode::User,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: None,
        }
    }

    /// Creates default options with environment overrides applied.
    ///
    /// Reads `SAFETY_STREAM_ENDPOINT` and `SAFETY_STREAM_QUALITY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the quality is not a number.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::new();

        if let Ok(endpoint) = env::var(ENV_ENDPOINT) {
            options.endpoint = endpoint;
        }

        if let Ok(quality) = env::var(ENV_QUALITY) {
            let quality: u8 = quality.trim().parse().map_err(|_| {
                Error::config(format!("{ENV_QUALITY} must be 1-100, got {quality:?}"))
            })?;
            options.format = ImageFormat::Jpeg(quality);
        }

        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl StreamOptions {
    /// Sets the backend endpoint.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the frame format.
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Uses JPEG at `quality`.
    #[inline]
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.format = ImageFormat::Jpeg(quality);
        self
    }

    /// Sets the preferred capture resolution.
    #[inline]
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Sets the preferred camera facing.
    #[inline]
    #[must_use]
    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    /// Sets the display refresh tick.
    #[inline]
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Ends the session if a frame stays unanswered for `timeout`.
    #[inline]
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl StreamOptions {
    /// Capability request for the camera.
    #[must_use]
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            ideal_width: self.resolution.0,
            ideal_height: self.resolution.1,
            facing: self.facing,
        }
    }

    /// Validates the options and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not a `ws`/`wss` URL,
    /// the JPEG quality is outside 1-100, the resolution has a zero
    /// dimension, or the connect timeout is zero.
    pub fn validate(&self) -> Result<Url> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            Error::config(format!(
                "Invalid endpoint {:?}: {e}\n\
                 Example: StreamOptions::new().with_endpoint(\"ws://localhost:8000/ws\")",
                self.endpoint
            ))
        })?;

        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Endpoint must use ws:// or wss://, got {}://",
                endpoint.scheme()
            )));
        }

        if let ImageFormat::Jpeg(quality) = self.format
            && !(1..=100).contains(&quality)
        {
            return Err(Error::config(format!("JPEG quality must be 1-100, got {quality}")));
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(Error::config(format!(
                "Resolution must be nonzero, got {}x{}",
                self.resolution.0, self.resolution.1
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be nonzero"));
        }

        Ok(endpoint)
    }
}

// ============================================================================
// Tests
// ============================================================================
