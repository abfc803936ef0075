//! One-frame-in-flight pacing.
//!
//! [`PacingController`] is a pure state machine: the pump feeds it
//! [`PacingEvent`]s and performs the returned [`PacingAction`]. The
//! outstanding-frame counter is explicit and never exceeds one.
//!
//! # Transitions
//!
//! | Phase | Event | Next | Action |
//! |-------|-------|------|--------|
//! | `Idle` | `TransportOpened` | `CapturePending` | `Capture` |
//! | `CapturePending` | `SampleNotReady` / `CaptureFailed` | `CapturePending` | `Capture` |
//! | `CapturePending` | `FrameSent` | `AwaitingResponse` | `Wait` |
//! | `AwaitingResponse` | `ResponseReceived` (open) | `CapturePending` | `Capture` |
//! | `AwaitingResponse` | `ResponseReceived` (not open) | `Ended` | `Halt` |
//! | any | `SessionEnded` | `Ended` | `Halt` |
//!
//! Any other pair leaves the state unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::FrameSeq;

// ============================================================================
// Types
// ============================================================================

/// Where the pacing loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacingPhase {
    /// Waiting for the transport to open.
    Idle,
    /// A capture should run on the next tick.
    CapturePending,
    /// One frame is in flight.
    AwaitingResponse,
    /// Session is over; nothing more is scheduled.
    Ended,
}

impl PacingPhase {
    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CapturePending => "capture-pending",
            Self::AwaitingResponse => "awaiting-response",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for PacingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingEvent {
    /// Transport reached `OPEN`.
    TransportOpened,
    /// Video sample had a zero dimension.
    SampleNotReady,
    /// Encoding the sample failed; retry on the next tick.
    CaptureFailed,
    /// A frame was handed to the transport.
    FrameSent,
    /// A response arrived, decoded or not.
    ResponseReceived {
        /// Whether the transport was still `OPEN` at arrival.
        transport_open: bool,
    },
    /// Transport errored or closed, or the session was stopped.
    SessionEnded,
}

/// What the pump does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingAction {
    /// Run a capture cycle on the next refresh tick.
    Capture,
    /// Wait for the next transport event.
    Wait,
    /// Stop the pump.
    Halt,
}

// ============================================================================
// PacingController
// ============================================================================

/// Guarded one-frame window.
#[derive(Debug, Clone)]
pub struct PacingController {
    phase: PacingPhase,
    outstanding: u8,
    frames_sent: u64,
    responses: u64,
    seq: FrameSeq,
}

impl Default for PacingController {
    fn default() -> Self {
        Self::new()
    }
}

impl PacingController {
    /// Creates a controller waiting for the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: PacingPhase::Idle,
            outstanding: 0,
            frames_sent: 0,
            responses: 0,
            seq: FrameSeq::ZERO,
        }
    }

    /// Applies one event and returns the action to perform.
    pub fn on_event(&mut self, event: PacingEvent) -> PacingAction {
        use PacingEvent as E;
        use PacingPhase as P;

        let action = match (self.phase, event) {
            (P::Ended, _) => PacingAction::Halt,

            (_, E::SessionEnded) => {
                self.phase = P::Ended;
                self.outstanding = 0;
                PacingAction::Halt
            }

            (P::Idle, E::TransportOpened) => {
                self.phase = P::CapturePending;
                PacingAction::Capture
            }

            (P::CapturePending, E::SampleNotReady | E::CaptureFailed) => PacingAction::Capture,

            (P::CapturePending, E::FrameSent) => {
                self.outstanding += 1;
                self.frames_sent += 1;
                self.seq = self.seq.successor();
                self.phase = P::AwaitingResponse;
                PacingAction::Wait
            }

            (P::AwaitingResponse, E::ResponseReceived { transport_open }) => {
                self.outstanding -= 1;
                self.responses += 1;
                if transport_open {
                    self.phase = P::CapturePending;
                    PacingAction::Capture
                } else {
                    self.phase = P::Ended;
                    PacingAction::Halt
                }
            }

            // Stray or duplicate input
            (P::CapturePending, _) => PacingAction::Capture,
            (P::Idle | P::AwaitingResponse, _) => PacingAction::Wait,
        };

        debug_assert!(self.outstanding <= 1);
        action
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> PacingPhase {
        self.phase
    }

    /// Returns `true` if a capture should run on the next tick.
    #[inline]
    #[must_use]
    pub const fn wants_capture(&self) -> bool {
        matches!(self.phase, PacingPhase::CapturePending)
    }

    /// Returns `true` while a frame is awaiting its response.
    #[inline]
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.outstanding == 1
    }

    /// Frames sent minus responses received: always 0 or 1.
    #[inline]
    #[must_use]
    pub const fn outstanding(&self) -> u8 {
        self.outstanding
    }

    /// Frames sent this session.
    #[inline]
    #[must_use]
    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Responses received this session.
    #[inline]
    #[must_use]
    pub const fn responses(&self) -> u64 {
        self.responses
    }

    /// Sequence number of the most recent frame.
    #[inline]
    #[must_use]
    pub const fn seq(&self) -> FrameSeq {
        self.seq
    }

    /// Returns `true` once the session has ended.
    #[inline]
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        matches!(self.phase, PacingPhase::Ended)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const OPEN: PacingEvent = PacingEvent::ResponseReceived { transport_open: true };
    const CLOSED: PacingEvent = PacingEvent::ResponseReceived { transport_open: false };

    #[test]
    fn test_first_capture_on_open() {
        let mut pacing = PacingController::new();
        assert!(!pacing.wants_capture());
        assert_eq!(pacing.on_event(PacingEvent::TransportOpened), PacingAction::Capture);
        assert!(pacing.wants_capture());
        assert_eq!(pacing.outstanding(), 0);
    }

    #[test]
    fn test_send_then_response_schedules_next() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);

        assert_eq!(pacing.on_event(PacingEvent::FrameSent), PacingAction::Wait);
        assert!(pacing.in_flight());
        assert!(!pacing.wants_capture());
        assert_eq!(pacing.seq().as_u64(), 1);

        assert_eq!(pacing.on_event(OPEN), PacingAction::Capture);
        assert!(!pacing.in_flight());
        assert_eq!(pacing.responses(), 1);
    }

    #[test]
    fn test_second_send_while_in_flight_is_ignored() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);
        pacing.on_event(PacingEvent::FrameSent);

        assert_eq!(pacing.on_event(PacingEvent::FrameSent), PacingAction::Wait);
        assert_eq!(pacing.outstanding(), 1);
        assert_eq!(pacing.frames_sent(), 1);
    }

    #[test]
    fn test_not_ready_keeps_retrying() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);

        for _ in 0..3 {
            assert_eq!(pacing.on_event(PacingEvent::SampleNotReady), PacingAction::Capture);
        }
        assert_eq!(pacing.frames_sent(), 0);
        assert_eq!(pacing.on_event(PacingEvent::FrameSent), PacingAction::Wait);
        assert_eq!(pacing.frames_sent(), 1);
    }

    #[test]
    fn test_response_after_close_halts() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);
        pacing.on_event(PacingEvent::FrameSent);

        assert_eq!(pacing.on_event(CLOSED), PacingAction::Halt);
        assert!(pacing.is_ended());
        assert_eq!(pacing.on_event(PacingEvent::TransportOpened), PacingAction::Halt);
        assert!(!pacing.wants_capture());
    }

    #[test]
    fn test_end_while_in_flight() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);
        pacing.on_event(PacingEvent::FrameSent);

        assert_eq!(pacing.on_event(PacingEvent::SessionEnded), PacingAction::Halt);
        assert_eq!(pacing.outstanding(), 0);
        assert_eq!(pacing.on_event(PacingEvent::FrameSent), PacingAction::Halt);
        assert_eq!(pacing.frames_sent(), 1);
    }

    #[test]
    fn test_stray_response_is_ignored() {
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);

        assert_eq!(pacing.on_event(OPEN), PacingAction::Capture);
        assert_eq!(pacing.responses(), 0);
        assert_eq!(pacing.outstanding(), 0);
    }

    #[test]
    fn test_undecodable_response_still_advances() {
        // the pump reports every response regardless of decode outcome
        let mut pacing = PacingController::new();
        pacing.on_event(PacingEvent::TransportOpened);
        pacing.on_event(PacingEvent::FrameSent);
        assert_eq!(pacing.on_event(OPEN), PacingAction::Capture);
        assert_eq!(pacing.on_event(PacingEvent::FrameSent), PacingAction::Wait);
        assert_eq!(pacing.seq().as_u64(), 2);
    }

    fn event() -> impl Strategy<Value = PacingEvent> {
        prop_oneof![
            Just(PacingEvent::TransportOpened),
            Just(PacingEvent::SampleNotReady),
            Just(PacingEvent::CaptureFailed),
            Just(PacingEvent::FrameSent),
            any::<bool>().prop_map(|transport_open| PacingEvent::ResponseReceived { transport_open }),
            Just(PacingEvent::SessionEnded),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_outstanding(events in proptest::collection::vec(event(), 0..200)) {
            let mut pacing = PacingController::new();
            for event in events {
                pacing.on_event(event);
                prop_assert!(pacing.outstanding() <= 1);
                let unanswered = pacing.frames_sent() - pacing.responses();
                prop_assert!(unanswered <= 1);
                if !pacing.is_ended() {
                    prop_assert_eq!(unanswered, u64::from(pacing.outstanding()));
                }
            }
        }

        #[test]
        fn prop_ended_is_absorbing(events in proptest::collection::vec(event(), 0..50)) {
            let mut pacing = PacingController::new();
            pacing.on_event(PacingEvent::SessionEnded);
            for event in events {
                prop_assert_eq!(pacing.on_event(event), PacingAction::Halt);
                prop_assert!(!pacing.wants_capture());
            }
        }
    }
}
