//! Verdict record returned by the backend for each frame.
//!
//! # Format
//!
//! ```json
//! {
//!   "status": "Access Denied",
//!   "message": "Hi Dana, missing: helmet",
//!   "user": "Dana",
//!   "missing_ppe": ["helmet"],
//!   "annotated_frame": "/9j/4AAQ..."
//! }
//! ```
//!
//! Only `status` and `message` are required. `user`, `missing_ppe` and
//! `annotated_frame` may be omitted or `null`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

// ============================================================================
// VerdictStatus
// ============================================================================

/// Status category of a verdict.
///
/// The literal labels are a backend contract; unknown labels are kept
/// verbatim in [`VerdictStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerdictStatus {
    /// Standby, nothing evaluated yet.
    #[default]
    Idle,
    /// Subject identified and fully compliant.
    AccessGranted,
    /// Subject identified, equipment missing.
    AccessDenied,
    /// No face, or face not recognized.
    UnknownUser,
    /// Backend running without models.
    DemoMode,
    /// Any other label.
    Other(String),
}

impl VerdictStatus {
    /// Returns the wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::AccessGranted => "Access Granted",
            Self::AccessDenied => "Access Denied",
            Self::UnknownUser => "Unknown User",
            Self::DemoMode => "Demo Mode",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for VerdictStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "idle" => Self::Idle,
            "Access Granted" => Self::AccessGranted,
            "Access Denied" => Self::AccessDenied,
            "Unknown User" => Self::UnknownUser,
            "Demo Mode" => Self::DemoMode,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for VerdictStatus {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<VerdictStatus> for String {
    fn from(status: VerdictStatus) -> Self {
        match status {
            VerdictStatus::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Decoded result of one backend response.
///
/// Each verdict replaces the previous one in full.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verdict {
    /// Status category.
    pub status: VerdictStatus,

    /// Human-readable message.
    pub message: String,

    /// Identified subject, absent when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Missing equipment labels in backend order; empty means compliant.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub missing_ppe: Vec<String>,

    /// Base64 image with detection overlays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_frame: Option<String>,
}

impl Verdict {
    /// An idle verdict carrying only a message.
    #[must_use]
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Idle,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Returns `true` if no equipment is reported missing.
    #[inline]
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.missing_ppe.is_empty()
    }

    /// Decodes the annotated frame, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`](crate::Error::Base64) if the payload is not
    /// valid base64.
    pub fn annotated_image(&self) -> Result<Option<Vec<u8>>> {
        match &self.annotated_frame {
            Some(data) => Ok(Some(Base64Standard.decode(data)?)),
            None => Ok(None),
        }
    }

    /// Renders the annotated frame as a `data:` URL for display.
    #[must_use]
    pub fn annotated_data_url(&self) -> Option<String> {
        self.annotated_frame
            .as_ref()
            .map(|data| format!("data:image/jpeg;base64,{data}"))
    }
}

/// Treats an explicit `null` list the same as an omitted one.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
