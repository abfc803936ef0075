//! WebSocket transport session and its event loop.
//!
//! # Event Loop
//!
//! [`TransportSession::open`] spawns a tokio task that:
//!
//! - Connects to the backend (bounded by the connect timeout)
//! - Forwards outbound frames queued by [`TransportSession::send`]
//! - Emits [`TransportEvent`]s: `Open`, one `Message` per inbound frame,
//!   `Error` on failure, and exactly one final `Close`
//!
//! The session handle is cheap to clone; all clones share one state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::capture::FramePayload;
use crate::error::Error;
use crate::protocol::InboundMessage;

use super::state::{TransportInput, TransportState};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle notifications from the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection reached `OPEN`.
    Open,
    /// One whole inbound message.
    Message(InboundMessage),
    /// Connection failed or dropped. Always followed by `Close`.
    Error(String),
    /// Connection reached `CLOSED`. Always the last event.
    Close,
}

/// Receiving half of a session's event stream.
#[derive(Debug)]
pub struct TransportEvents {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportEvents {
    /// Waits for the next event; `None` once the loop is gone.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }

    /// Returns an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<TransportEvent> {
        self.rx.try_recv().ok()
    }
}

/// Internal commands for the event loop.
enum TransportCommand {
    /// Send one text frame.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// TransportSession
// ============================================================================

/// One duplex connection to the inference backend.
#[derive(Clone)]
pub struct TransportSession {
    /// Shared state, also written by the event loop.
    state: Arc<Mutex<TransportState>>,
    /// Channel to the event loop.
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    /// Frames accepted by `send`.
    sent: Arc<AtomicU64>,
}

impl TransportSession {
    /// Starts connecting to `endpoint`.
    ///
    /// Returns immediately in `CONNECTING`; completion arrives as an
    /// [`TransportEvent::Open`] or [`TransportEvent::Error`] event. Must be
    /// called inside a tokio runtime.
    #[must_use]
    pub fn open(endpoint: &Url, connect_timeout: Duration) -> (Self, TransportEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(TransportState::Connecting));

        debug!(endpoint = %endpoint, "Opening transport");

        tokio::spawn(Self::run_event_loop(
            endpoint.to_string(),
            connect_timeout,
            Arc::clone(&state),
            command_rx,
            event_tx,
        ));

        let session = Self {
            state,
            command_tx,
            sent: Arc::new(AtomicU64::new(0)),
        };

        (session, TransportEvents { rx: event_rx })
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TransportState {
        *self.state.lock()
    }

    /// Returns `true` while frames may be sent.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    /// Queues one frame as bare base64 text.
    ///
    /// Outside `OPEN` this is a silent no-op and returns `false`.
    pub fn send(&self, payload: FramePayload) -> bool {
        let state = self.state();
        if state != TransportState::Open {
            trace!(%state, "Send ignored, transport not open");
            return false;
        }

        let bytes = payload.len();
        if self
            .command_tx
            .send(TransportCommand::Send(payload.into_base64()))
            .is_err()
        {
            trace!("Send ignored, event loop gone");
            return false;
        }

        self.sent.fetch_add(1, Ordering::Relaxed);
        trace!(bytes, "Frame queued");
        true
    }

    /// Frames accepted by [`send`](Self::send) so far.
    #[inline]
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Closes the connection. Idempotent.
    pub fn close(&self) {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            *state = previous.next(TransportInput::CloseRequested);
            previous
        };

        if !previous.is_closed() {
            debug!(from = %previous, "Closing transport");
            let _ = self.command_tx.send(TransportCommand::Close);
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        endpoint: String,
        connect_timeout: Duration,
        state: Arc<Mutex<TransportState>>,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) {
        let emit = |event: TransportEvent| {
            let _ = event_tx.send(event);
        };

        // Phase 1: connect, unless closed first
        let connecting = timeout(connect_timeout, connect_async(endpoint.as_str()));
        tokio::pin!(connecting);

        let ws_stream = loop {
            tokio::select! {
                result = &mut connecting => match result {
                    Ok(Ok((stream, _))) => break stream,
                    Ok(Err(e)) => {
                        let error = Error::from(e);
                        Self::fail(&state, &emit, format!("connect to {endpoint} failed: {error}"));
                        return;
                    }
                    Err(_) => {
                        let ms = connect_timeout.as_millis();
                        Self::fail(&state, &emit, format!("connect to {endpoint} timed out after {ms}ms"));
                        return;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(TransportCommand::Send(_)) => {
                        trace!("Dropping frame queued before open");
                    }
                    Some(TransportCommand::Close) | None => {
                        debug!("Transport closed while connecting");
                        Self::finish(&state, &emit, TransportInput::CloseRequested);
                        return;
                    }
                },
            }
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let opened = {
            let mut state = state.lock();
            *state = state.next(TransportInput::Connected);
            *state == TransportState::Open
        };

        if !opened {
            // close() won the race with the handshake
            let _ = ws_write.close().await;
            Self::finish(&state, &emit, TransportInput::CloseRequested);
            return;
        }

        debug!(endpoint = %endpoint, "Transport open");
        emit(TransportEvent::Open);

        // Phase 2: duplex
        let end = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            emit(TransportEvent::Message(InboundMessage::Text(text.as_str().to_owned())));
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            emit(TransportEvent::Message(InboundMessage::Binary(bytes.to_vec())));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "Transport closed by remote");
                            break TransportInput::RemoteClosed;
                        }

                        Some(Err(e)) => {
                            let error = Error::from(e);
                            warn!(%error, "Transport error");
                            emit(TransportEvent::Error(error.to_string()));
                            break TransportInput::Failed;
                        }

                        None => {
                            debug!("Transport stream ended");
                            break TransportInput::RemoteClosed;
                        }

                        // Ignore Ping, Pong, raw frames
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                let error = Error::from(e);
                                warn!(%error, "Failed to send frame");
                                emit(TransportEvent::Error(error.to_string()));
                                break TransportInput::Failed;
                            }
                        }

                        Some(TransportCommand::Close) => {
                            let _ = ws_write.close().await;
                            break TransportInput::CloseRequested;
                        }

                        None => {
                            debug!("All transport handles dropped");
                            let _ = ws_write.close().await;
                            break TransportInput::CloseRequested;
                        }
                    }
                }
            }
        };

        Self::finish(&state, &emit, end);
    }

    /// Reports a failure, then closes.
    fn fail(state: &Mutex<TransportState>, emit: &impl Fn(TransportEvent), reason: String) {
        warn!(%reason, "Transport failed");
        emit(TransportEvent::Error(reason));
        Self::finish(state, emit, TransportInput::Failed);
    }

    /// Moves to `CLOSED` and emits the final event.
    fn finish(state: &Mutex<TransportState>, emit: &impl Fn(TransportEvent), input: TransportInput) {
        {
            let mut state = state.lock();
            *state = state.next(input);
        }
        debug!("Transport event loop terminated");
        emit(TransportEvent::Close);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backend::{LoopbackBackend, Reply};
    use crate::capture::{CameraProvider, FrameEncoder, MediaConstraints, StillCamera, VideoSource};

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    async fn payload() -> FramePayload {
        let camera = StillCamera::test_pattern(16, 16);
        let device = camera.acquire(&MediaConstraints::default()).await.unwrap();
        let source: Arc<dyn VideoSource> = device.source();
        FrameEncoder::default().encode(&source.snapshot()).unwrap()
    }

    async fn next_event(events: &mut TransportEvents) -> TransportEvent {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within timeout")
            .expect("event loop alive")
    }

    #[tokio::test]
    async fn test_open_then_message() {
        let backend = LoopbackBackend::bind(|_| {
            Reply::Text(r#"{"status": "idle", "message": "ok"}"#.into())
        })
        .await
        .unwrap();

        let (session, mut events) = TransportSession::open(&backend.url().unwrap(), CONNECT_TIMEOUT);
        assert_eq!(session.state(), TransportState::Connecting);

        assert_eq!(next_event(&mut events).await, TransportEvent::Open);
        assert!(session.is_open());

        assert!(session.send(payload().await));
        assert_eq!(session.frames_sent(), 1);

        match next_event(&mut events).await {
            TransportEvent::Message(InboundMessage::Text(text)) => assert!(text.contains("\"ok\"")),
            other => panic!("unexpected event: {other:?}"),
        }

        session.close();
        assert_eq!(next_event(&mut events).await, TransportEvent::Close);
    }

    #[tokio::test]
    async fn test_send_before_open_is_noop() {
        let backend = LoopbackBackend::bind(|_| Reply::Silence).await.unwrap();
        let (session, mut events) = TransportSession::open(&backend.url().unwrap(), CONNECT_TIMEOUT);

        assert!(!session.send(payload().await));
        assert_eq!(session.frames_sent(), 0);

        assert_eq!(next_event(&mut events).await, TransportEvent::Open);
        session.close();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = LoopbackBackend::bind(|_| Reply::Silence).await.unwrap();
        let (session, mut events) = TransportSession::open(&backend.url().unwrap(), CONNECT_TIMEOUT);
        assert_eq!(next_event(&mut events).await, TransportEvent::Open);

        session.close();
        session.close();
        session.clone().close();

        assert_eq!(session.state(), TransportState::Closed);
        assert_eq!(next_event(&mut events).await, TransportEvent::Close);
        assert!(events.recv().await.is_none());

        assert!(!session.send(payload().await));
    }

    #[tokio::test]
    async fn test_close_while_connecting() {
        let backend = LoopbackBackend::bind(|_| Reply::Silence).await.unwrap();
        let (session, mut events) = TransportSession::open(&backend.url().unwrap(), CONNECT_TIMEOUT);

        session.close();

        assert_eq!(session.state(), TransportState::Closed);
        assert_eq!(next_event(&mut events).await, TransportEvent::Close);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_close() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/ws")).unwrap();

        let (session, mut events) = TransportSession::open(&url, CONNECT_TIMEOUT);

        assert!(matches!(next_event(&mut events).await, TransportEvent::Error(_)));
        assert_eq!(next_event(&mut events).await, TransportEvent::Close);
        assert_eq!(session.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn test_remote_close_ends_session() {
        let backend = LoopbackBackend::bind(|_| Reply::Close).await.unwrap();
        let (session, mut events) = TransportSession::open(&backend.url().unwrap(), CONNECT_TIMEOUT);
        assert_eq!(next_event(&mut events).await, TransportEvent::Open);

        assert!(session.send(payload().await));

        let mut ended = false;
        while let Some(event) = events.recv().await {
            if event == TransportEvent::Close {
                ended = true;
            }
        }
        assert!(ended);
        assert!(session.state().is_closed());
    }
}
