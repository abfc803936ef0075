//! Transport state machine.
//!
//! ```text
//! CONNECTING ──connected──► OPEN
//!     │                      │
//!     └──failed / close──────┴──► CLOSED (terminal)
//! ```

use std::fmt;

// ============================================================================
// TransportState
// ============================================================================

/// Lifecycle state of a [`TransportSession`](super::TransportSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// Handshake in progress.
    Connecting,
    /// Frames may be sent.
    Open,
    /// Terminal; the socket is released.
    Closed,
}

/// Inputs driving [`TransportState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportInput {
    /// Handshake completed.
    Connected,
    /// Handshake or I/O failed.
    Failed,
    /// Local `close()`.
    CloseRequested,
    /// Remote end closed or the stream ended.
    RemoteClosed,
}

impl TransportState {
    /// Returns the state after `input`.
    ///
    /// `Closed` absorbs every input; `Connected` only moves `Connecting`.
    #[must_use]
    pub const fn next(self, input: TransportInput) -> Self {
        match (self, input) {
            (Self::Closed, _) => Self::Closed,
            (Self::Connecting, TransportInput::Connected) => Self::Open,
            (Self::Open, TransportInput::Connected) => Self::Open,
            (_, TransportInput::Failed | TransportInput::CloseRequested | TransportInput::RemoteClosed) => {
                Self::Closed
            }
        }
    }

    /// Returns `true` in the terminal state.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn input() -> impl Strategy<Value = TransportInput> {
        prop_oneof![
            Just(TransportInput::Connected),
            Just(TransportInput::Failed),
            Just(TransportInput::CloseRequested),
            Just(TransportInput::RemoteClosed),
        ]
    }

    #[test]
    fn test_happy_path() {
        let state = TransportState::Connecting.next(TransportInput::Connected);
        assert_eq!(state, TransportState::Open);
        assert_eq!(state.next(TransportInput::CloseRequested), TransportState::Closed);
    }

    #[test]
    fn test_failure_while_connecting() {
        let state = TransportState::Connecting.next(TransportInput::Failed);
        assert!(state.is_closed());
    }

    #[test]
    fn test_closed_cannot_reopen() {
        let state = TransportState::Closed.next(TransportInput::Connected);
        assert_eq!(state, TransportState::Closed);
    }

    proptest! {
        #[test]
        fn closed_is_terminal(inputs in prop::collection::vec(input(), 0..32)) {
            let mut state = TransportState::Closed;
            for i in inputs {
                state = state.next(i);
                prop_assert_eq!(state, TransportState::Closed);
            }
        }

        #[test]
        fn never_returns_to_connecting(inputs in prop::collection::vec(input(), 1..32)) {
            let mut state = TransportState::Connecting;
            let mut left = false;
            for i in inputs {
                state = state.next(i);
                if state != TransportState::Connecting {
                    left = true;
                }
                prop_assert!(!(left && state == TransportState::Connecting));
            }
        }
    }
}
