//! Error types for the streaming client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use safety_stream::{Result, SessionManager};
//!
//! async fn example(manager: &SessionManager) -> Result<()> {
//!     manager.start().await?;
//!     manager.stop();
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Capability | [`Error::Capability`] |
//! | Lifecycle | [`Error::InvalidState`], [`Error::SessionAborted`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::ResponseTimeout`] |
//! | Capture | [`Error::InvalidSample`] |
//! | Decode | [`Error::Decode`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Image`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use base64::DecodeError as Base64Error;
use image::ImageError;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options fail validation.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// Camera access was denied or the device is unavailable.
    ///
    /// Never retried automatically; the operator must restart.
    #[error("Camera unavailable: {message}")]
    Capability {
        /// Description of the capability failure.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation not valid in the current lifecycle phase.
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        /// Phase the operation requires.
        expected: &'static str,
        /// Phase the manager was in.
        actual: &'static str,
    },

    /// A start was abandoned because `stop()` ran before it completed.
    #[error("Session aborted before it became active")]
    SessionAborted,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection to the backend failed or dropped.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed before the operation completed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A frame stayed in flight longer than the configured bound.
    #[error("No response within {timeout_ms}ms")]
    ResponseTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    // ========================================================================
    // Capture Errors
    // ========================================================================
    /// Video sample cannot be encoded as given.
    ///
    /// Zero dimensions are a scheduling retry for the pacing loop, not a
    /// reason to call the encoder.
    #[error("Invalid sample: {width}x{height} with {len} bytes")]
    InvalidSample {
        /// Reported sample width.
        width: u32,
        /// Reported sample height.
        height: u32,
        /// Pixel buffer length.
        len: usize,
    },

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// Backend message is not a verdict record.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the malformed message.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Image codec error.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Base64 decode error.
    #[error("Base64 error: {0}")]
    Base64(#[from] Base64Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a capability error.
    #[inline]
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(expected: &'static str, actual: &'static str) -> Self {
        Self::InvalidState { expected, actual }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a response timeout error.
    #[inline]
    pub fn response_timeout(timeout_ms: u64) -> Self {
        Self::ResponseTimeout { timeout_ms }
    }

    /// Creates an invalid sample error.
    #[inline]
    pub fn invalid_sample(width: u32, height: u32, len: usize) -> Self {
        Self::InvalidSample { width, height, len }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::ResponseTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the camera could not be acquired.
    #[inline]
    #[must_use]
    pub fn is_capability_error(&self) -> bool {
        matches!(self, Self::Capability { .. })
    }

    /// Returns `true` if a backend message could not be decoded.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Json(_) | Self::Base64(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_capability_display() {
        let err = Error::capability("permission denied");
        assert_eq!(err.to_string(), "Camera unavailable: permission denied");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::invalid_state("idle", "active");
        assert_eq!(err.to_string(), "Invalid state: expected idle, found active");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::response_timeout(10).is_connection_error());
        assert!(!Error::decode("x").is_connection_error());
    }

    #[test]
    fn test_decode_error_is_not_connection_error() {
        let err = Error::decode("missing status");
        assert!(err.is_decode_error());
        assert!(!err.is_connection_error());
        assert!(!Error::invalid_sample(0, 0, 0).is_decode_error());
    }

    #[test]
    fn test_websocket_error_is_connection_error() {
        let err: Error = WsError::ConnectionClosed.into();
        assert!(err.is_connection_error());
        assert!(err.to_string().starts_with("WebSocket error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_decode_error());
    }
}
