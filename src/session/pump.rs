//! Per-session frame pump.
//!
//! Drives the [`PacingController`] from transport events and refresh
//! ticks. One pump task runs per active session and exits when the
//! session ends; it then tears the session down through the same path as
//! an explicit stop.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::capture::{FrameClock, FrameEncoder, VideoSource};
use crate::error::Error;
use crate::identifiers::SessionId;
use crate::protocol::{InboundMessage, ResponseInterpreter, Verdict};
use crate::transport::{TransportEvent, TransportEvents, TransportSession};

use super::lifecycle::Shared;
use super::pacing::{PacingAction, PacingController, PacingEvent};
use super::view::{LifecycleEvent, NOTICE_CONNECTION_ERROR};

// ============================================================================
// Types
// ============================================================================

/// Why the pump stopped.
#[derive(Debug)]
enum PumpExit {
    /// Transport closed, locally or by the backend.
    Closed,
    /// Transport reported an error.
    Failed(String),
    /// A frame stayed unanswered too long.
    TimedOut(Error),
}

impl PumpExit {
    fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Closed => None,
            Self::Failed(_) | Self::TimedOut(_) => Some(NOTICE_CONNECTION_ERROR),
        }
    }
}

/// Consecutive failures of one retried step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FailureStreak(u32);

impl FailureStreak {
    /// Counts a failure. Returns `true` for the first of a streak.
    fn record(&mut self) -> bool {
        self.0 = self.0.saturating_add(1);
        self.0 == 1
    }

    /// Ends the streak, returning its length if there was one.
    fn reset(&mut self) -> Option<u32> {
        let failures = std::mem::take(&mut self.0);
        (failures > 0).then_some(failures)
    }
}

// ============================================================================
// Pump
// ============================================================================

/// State owned by one pump task.
pub(crate) struct Pump {
    session_id: SessionId,
    transport: TransportSession,
    source: Arc<dyn VideoSource>,
    encoder: FrameEncoder,
    pacing: PacingController,
    interpreter: ResponseInterpreter,
    shared: Arc<Shared>,
    response_timeout: Option<Duration>,
    sent_at: Option<Instant>,
    encode_failures: FailureStreak,
}

impl Pump {
    pub(crate) fn new(
        session_id: SessionId,
        transport: TransportSession,
        source: Arc<dyn VideoSource>,
        encoder: FrameEncoder,
        shared: Arc<Shared>,
        response_timeout: Option<Duration>,
    ) -> Self {
        Self {
            session_id,
            transport,
            source,
            encoder,
            pacing: PacingController::new(),
            interpreter: ResponseInterpreter::new(),
            shared,
            response_timeout,
            sent_at: None,
            encode_failures: FailureStreak::default(),
        }
    }

    /// Runs until the session ends, then tears it down.
    ///
    /// Must be started after the transport reported `Open`.
    pub(crate) async fn run(mut self, mut events: TransportEvents, mut clock: FrameClock) {
        let session = self.session_id;
        debug!(%session, "Pump started");

        self.pacing.on_event(PacingEvent::TransportOpened);

        let exit = loop {
            let deadline = self.deadline();

            tokio::select! {
                biased;

                event = events.recv() => {
                    if let Some(exit) = self.on_transport_event(event) {
                        break exit;
                    }
                }

                () = clock.tick(), if self.pacing.wants_capture() => {
                    if self.capture() == PacingAction::Halt {
                        break Self::drain(&mut events);
                    }
                }

                () = expire(deadline), if deadline.is_some() => {
                    let timeout_ms = self
                        .response_timeout
                        .map_or(0, |timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
                    warn!(%session, seq = %self.pacing.seq(), timeout_ms, "Backend stalled");
                    self.transport.close();
                    self.pacing.on_event(PacingEvent::SessionEnded);
                    break PumpExit::TimedOut(Error::response_timeout(timeout_ms));
                }
            }
        };

        info!(
            %session,
            frames_sent = self.pacing.frames_sent(),
            responses = self.pacing.responses(),
            decoded = self.interpreter.decoded(),
            rejected = self.interpreter.rejected(),
            ?exit,
            "Pump stopped"
        );

        self.shared
            .teardown(Some(session), LifecycleEvent::Failed, exit.notice());
    }

    /// Handles one transport event; `Some` ends the pump.
    fn on_transport_event(&mut self, event: Option<TransportEvent>) -> Option<PumpExit> {
        match event {
            Some(TransportEvent::Message(message)) => {
                self.on_response(&message);
                None
            }

            // Already open; a duplicate changes nothing
            Some(TransportEvent::Open) => None,

            Some(TransportEvent::Error(reason)) => {
                self.pacing.on_event(PacingEvent::SessionEnded);
                Some(PumpExit::Failed(reason))
            }

            Some(TransportEvent::Close) | None => {
                self.pacing.on_event(PacingEvent::SessionEnded);
                Some(PumpExit::Closed)
            }
        }
    }

    /// Publishes the verdict, if any, and advances the loop either way.
    fn on_response(&mut self, message: &InboundMessage) {
        let verdict: Option<Verdict> = self.interpreter.interpret(message).ok();

        let action = self.pacing.on_event(PacingEvent::ResponseReceived {
            transport_open: self.transport.is_open(),
        });
        self.sent_at = None;

        trace!(
            session = %self.session_id,
            seq = %self.pacing.seq(),
            decoded = verdict.is_some(),
            ?action,
            "Response received"
        );

        self.shared.publish_progress(
            self.session_id,
            verdict,
            self.pacing.frames_sent(),
            self.pacing.responses(),
        );
    }

    /// One capture cycle.
    fn capture(&mut self) -> PacingAction {
        if !self.transport.is_open() {
            trace!(session = %self.session_id, "Capture cancelled, transport not open");
            return self.pacing.on_event(PacingEvent::SessionEnded);
        }

        let sample = self.source.snapshot();
        if !sample.is_ready() {
            trace!(session = %self.session_id, "Sample not ready, retrying next tick");
            return self.pacing.on_event(PacingEvent::SampleNotReady);
        }

        let payload = match self.encoder.encode(&sample) {
            Ok(payload) => payload,
            Err(e) => {
                if self.encode_failures.record() {
                    warn!(session = %self.session_id, error = %e, "Frame encoding failed, retrying");
                } else {
                    trace!(session = %self.session_id, error = %e, "Frame encoding failed");
                }
                return self.pacing.on_event(PacingEvent::CaptureFailed);
            }
        };
        if let Some(failures) = self.encode_failures.reset() {
            debug!(session = %self.session_id, failures, "Frame encoding recovered");
        }

        let bytes = payload.len();
        if !self.transport.send(payload) {
            return self.pacing.on_event(PacingEvent::SessionEnded);
        }

        let action = self.pacing.on_event(PacingEvent::FrameSent);
        self.sent_at = Some(Instant::now());

        trace!(
            session = %self.session_id,
            seq = %self.pacing.seq(),
            bytes,
            "Frame sent"
        );

        self.shared.publish_progress(
            self.session_id,
            None,
            self.pacing.frames_sent(),
            self.pacing.responses(),
        );

        action
    }

    /// Response deadline for the frame in flight, if bounded.
    fn deadline(&self) -> Option<Instant> {
        if !self.pacing.in_flight() {
            return None;
        }
        let timeout = self.response_timeout?;
        self.sent_at.map(|sent_at| sent_at + timeout)
    }

    /// Picks up an error already queued behind a closed transport.
    fn drain(events: &mut TransportEvents) -> PumpExit {
        while let Some(event) = events.try_recv() {
            if let TransportEvent::Error(reason) = event {
                return PumpExit::Failed(reason);
            }
        }
        PumpExit::Closed
    }
}

/// Sleeps until `deadline`, or forever without one.
async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
