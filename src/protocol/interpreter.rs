//! Decoding of inbound backend messages.
//!
//! A malformed message is rejected on its own; the caller still advances
//! the pacing loop.

// ============================================================================
// Imports
// ============================================================================

use serde_json::from_slice;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::verdict::Verdict;

// ============================================================================
// InboundMessage
// ============================================================================

/// One whole message received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Text frame.
    Text(String),
    /// Binary frame (accepted when it holds UTF-8 JSON).
    Binary(Vec<u8>),
}

impl InboundMessage {
    /// Raw bytes of the message body.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

// ============================================================================
// ResponseInterpreter
// ============================================================================

/// Turns backend messages into [`Verdict`]s.
///
/// Keeps counters so callers can report how many replies were dropped.
#[derive(Debug, Default)]
pub struct ResponseInterpreter {
    decoded: u64,
    rejected: u64,
}

impl ResponseInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is not JSON or lacks `status`
    /// or `message`.
    pub fn interpret(&mut self, message: &InboundMessage) -> Result<Verdict> {
        match from_slice::<Verdict>(message.as_bytes()) {
            Ok(verdict) => {
                self.decoded += 1;
                debug!(
                    status = %verdict.status,
                    user = verdict.user.as_deref().unwrap_or("-"),
                    missing = verdict.missing_ppe.len(),
                    "Verdict decoded"
                );
                Ok(verdict)
            }
            Err(e) => {
                self.rejected += 1;
                warn!(error = %e, len = message.as_bytes().len(), "Discarding malformed backend message");
                Err(Error::decode(format!("invalid verdict: {e}")))
            }
        }
    }

    /// Messages decoded successfully.
    #[inline]
    #[must_use]
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Messages rejected as malformed.
    #[inline]
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::VerdictStatus;

    fn text(body: &str) -> InboundMessage {
        InboundMessage::Text(body.to_string())
    }

    #[test]
    fn test_access_denied_verdict() {
        let mut interpreter = ResponseInterpreter::new();
        let verdict = interpreter
            .interpret(&text(
                r#"{"status": "Access Denied", "message": "PPE missing", "missing_ppe": ["helmet"]}"#,
            ))
            .unwrap();

        assert_eq!(verdict.status, VerdictStatus::AccessDenied);
        assert_eq!(verdict.message, "PPE missing");
        assert_eq!(verdict.missing_ppe, vec!["helmet".to_string()]);
        assert!(verdict.user.is_none());
        assert_eq!(interpreter.decoded(), 1);
    }

    #[test]
    fn test_granted_with_user() {
        let mut interpreter = ResponseInterpreter::new();
        let verdict = interpreter
            .interpret(&text(
                r#"{"status": "Access Granted", "message": "Welcome, Dana. Safety Clear.", "user": "Dana", "missing_ppe": []}"#,
            ))
            .unwrap();

        assert_eq!(verdict.user.as_deref(), Some("Dana"));
        assert!(verdict.is_compliant());
    }

    #[test]
    fn test_binary_json_accepted() {
        let mut interpreter = ResponseInterpreter::new();
        let message = InboundMessage::Binary(br#"{"status": "idle", "message": "ready"}"#.to_vec());
        let verdict = interpreter.interpret(&message).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Idle);
    }

    #[test]
    fn test_not_json_rejected() {
        let mut interpreter = ResponseInterpreter::new();
        let err = interpreter.interpret(&text("<html>502</html>")).unwrap_err();

        assert!(err.is_decode_error());
        assert_eq!(interpreter.rejected(), 1);
        assert_eq!(interpreter.decoded(), 0);
    }

    #[test]
    fn test_missing_message_rejected() {
        let mut interpreter = ResponseInterpreter::new();
        let err = interpreter.interpret(&text(r#"{"status": "idle"}"#)).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut interpreter = ResponseInterpreter::new();
        let result = interpreter.interpret(&text(r#"{"status": 3, "message": "x"}"#));
        assert!(result.is_err());
    }
}
