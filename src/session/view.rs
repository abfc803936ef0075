//! Lifecycle phase and the published session view.
//!
//! Presentation layers observe a [`SessionView`] through a
//! `tokio::sync::watch` receiver instead of being called from network
//! code. The view changes only at lifecycle transitions and on each
//! verdict.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::SessionId;
use crate::protocol::Verdict;

// ============================================================================
// Notices
// ============================================================================

/// Shown while the camera and transport come up.
pub const NOTICE_STARTING: &str = "Starting camera...";

/// Shown when the camera could not be acquired.
pub const NOTICE_CAMERA_ERROR: &str = "Unable to access camera. Please check permissions.";

/// Shown once the transport is open.
pub const NOTICE_READY: &str = "System ready. Please look at the camera.";

/// Shown after a transport failure.
pub const NOTICE_CONNECTION_ERROR: &str = "Connection error. Please restart and try again.";

/// Idle verdict message after a stop.
pub const NOTICE_STOPPED: &str = "Camera stopped";

// ============================================================================
// LifecyclePhase
// ============================================================================

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecyclePhase {
    /// No session.
    #[default]
    Idle,
    /// Acquiring the camera or waiting for the transport.
    Starting,
    /// Streaming frames.
    Active,
}

/// Input to the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `start()` was called.
    StartRequested,
    /// Camera acquired and transport reached `OPEN`.
    Activated,
    /// Explicit stop.
    Stopped,
    /// Camera denied, transport error or close.
    Failed,
}

impl LifecyclePhase {
    /// Returns the next phase, or `None` if `event` is not valid here.
    #[must_use]
    pub const fn next(self, event: LifecycleEvent) -> Option<Self> {
        use LifecycleEvent as E;

        match (self, event) {
            (Self::Idle, E::StartRequested) => Some(Self::Starting),
            (Self::Starting, E::Activated) => Some(Self::Active),
            (Self::Starting | Self::Active, E::Stopped | E::Failed) => Some(Self::Idle),
            _ => None,
        }
    }

    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Starting => "STARTING",
            Self::Active => "ACTIVE",
        }
    }

    /// Returns `true` in `Idle`.
    #[inline]
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SessionView
// ============================================================================

/// Snapshot published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    /// Lifecycle phase.
    pub phase: LifecyclePhase,
    /// Current session, if any.
    pub session_id: Option<SessionId>,
    /// Latest verdict; replaced in full on each arrival.
    pub verdict: Verdict,
    /// Operator-facing status line.
    pub notice: Option<String>,
    /// Frames sent in the current session.
    pub frames_sent: u64,
    /// Responses received in the current session.
    pub responses: u64,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            session_id: None,
            verdict: Verdict::idle(""),
            notice: None,
            frames_sent: 0,
            responses: 0,
        }
    }
}

impl SessionView {
    /// View after a stop or teardown.
    #[must_use]
    pub fn stopped(notice: Option<String>) -> Self {
        Self {
            verdict: Verdict::idle(NOTICE_STOPPED),
            notice,
            ..Self::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::VerdictStatus;

    #[test]
    fn test_happy_path() {
        let phase = LifecyclePhase::Idle;
        let phase = phase.next(LifecycleEvent::StartRequested).unwrap();
        assert_eq!(phase, LifecyclePhase::Starting);
        let phase = phase.next(LifecycleEvent::Activated).unwrap();
        assert_eq!(phase, LifecyclePhase::Active);
        assert_eq!(phase.next(LifecycleEvent::Stopped), Some(LifecyclePhase::Idle));
    }

    #[test]
    fn test_start_only_from_idle() {
        assert!(LifecyclePhase::Starting.next(LifecycleEvent::StartRequested).is_none());
        assert!(LifecyclePhase::Active.next(LifecycleEvent::StartRequested).is_none());
    }

    #[test]
    fn test_failure_returns_to_idle() {
        assert_eq!(
            LifecyclePhase::Starting.next(LifecycleEvent::Failed),
            Some(LifecyclePhase::Idle)
        );
        assert_eq!(LifecyclePhase::Active.next(LifecycleEvent::Failed), Some(LifecyclePhase::Idle));
    }

    #[test]
    fn test_stop_from_idle_is_not_a_transition() {
        assert!(LifecyclePhase::Idle.next(LifecycleEvent::Stopped).is_none());
        assert!(LifecyclePhase::Idle.next(LifecycleEvent::Activated).is_none());
    }

    #[test]
    fn test_stopped_view_resets_verdict() {
        let view = SessionView::stopped(Some(NOTICE_CONNECTION_ERROR.into()));
        assert!(view.phase.is_idle());
        assert!(view.session_id.is_none());
        assert_eq!(view.verdict.status, VerdictStatus::Idle);
        assert_eq!(view.verdict.message, NOTICE_STOPPED);
        assert_eq!(view.frames_sent, 0);
    }
}
