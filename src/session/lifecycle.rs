//! Session lifecycle manager.
//!
//! [`SessionManager`] owns the camera and the transport for the duration
//! of one session and tears both down on stop, error or close.
//!
//! # Lifecycle
//!
//! ```text
//! IDLE ──start()──► STARTING ──transport OPEN──► ACTIVE
//!  ▲                    │                          │
//!  └── stop() / camera error / transport error ────┘
//! ```
//!
//! Every path back to `IDLE` goes through one teardown, guarded by the
//! session id so a stale pump can never end a newer session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::capture::{CameraProvider, CaptureDevice, FrameClock, FrameEncoder};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::Verdict;
use crate::transport::{TransportEvent, TransportSession};

use super::builder::SessionManagerBuilder;
use super::options::StreamOptions;
use super::pump::Pump;
use super::view::{
    LifecycleEvent, LifecyclePhase, NOTICE_CAMERA_ERROR, NOTICE_CONNECTION_ERROR, NOTICE_READY,
    NOTICE_STARTING, SessionView,
};

// ============================================================================
// Session
// ============================================================================

/// Resources of one start cycle. Never reused.
struct Session {
    id: SessionId,
    device: Option<CaptureDevice>,
    transport: Option<TransportSession>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            device: None,
            transport: None,
        }
    }

    /// Closes the transport and stops every track.
    fn release(self) {
        if let Some(transport) = &self.transport {
            transport.close();
        }
        if let Some(device) = &self.device {
            device.stop_all();
        }
    }
}

// ============================================================================
// Shared
// ============================================================================

struct Inner {
    phase: LifecyclePhase,
    session: Option<Session>,
}

/// State shared by the manager and its pump.
///
/// The view is published while the state lock is held, so observers see
/// updates in transition order.
pub(crate) struct Shared {
    state: Mutex<Inner>,
    view: watch::Sender<SessionView>,
}

impl Shared {
    fn new() -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            state: Mutex::new(Inner {
                phase: LifecyclePhase::Idle,
                session: None,
            }),
            view,
        }
    }

    fn phase(&self) -> LifecyclePhase {
        self.state.lock().phase
    }

    fn current(&self) -> Option<SessionId> {
        self.state.lock().session.as_ref().map(|session| session.id)
    }

    /// `IDLE → STARTING` with a fresh session.
    fn begin(&self) -> Result<SessionId> {
        let mut inner = self.state.lock();
        let Some(next) = inner.phase.next(LifecycleEvent::StartRequested) else {
            return Err(Error::invalid_state(
                LifecyclePhase::Idle.as_str(),
                inner.phase.as_str(),
            ));
        };

        let id = SessionId::next();
        inner.phase = next;
        inner.session = Some(Session::new(id));

        self.view.send_replace(SessionView {
            phase: next,
            session_id: Some(id),
            verdict: Verdict::idle(NOTICE_STARTING),
            notice: Some(NOTICE_STARTING.to_string()),
            frames_sent: 0,
            responses: 0,
        });

        Ok(id)
    }

    /// Hands the device to session `id`; stops it if that session is gone.
    fn attach_device(&self, id: SessionId, device: CaptureDevice) -> Result<()> {
        let mut inner = self.state.lock();
        match inner.session.as_mut() {
            Some(session) if session.id == id => {
                session.device = Some(device);
                Ok(())
            }
            _ => {
                device.stop_all();
                Err(Error::SessionAborted)
            }
        }
    }

    /// Hands the transport to session `id`; closes it if that session is gone.
    fn attach_transport(&self, id: SessionId, transport: TransportSession) -> Result<()> {
        let mut inner = self.state.lock();
        match inner.session.as_mut() {
            Some(session) if session.id == id => {
                session.transport = Some(transport);
                Ok(())
            }
            _ => {
                transport.close();
                Err(Error::SessionAborted)
            }
        }
    }

    /// `STARTING → ACTIVE` for session `id`.
    fn activate(&self, id: SessionId) -> Result<()> {
        let mut inner = self.state.lock();
        if inner.session.as_ref().map(|session| session.id) != Some(id) {
            return Err(Error::SessionAborted);
        }
        let Some(next) = inner.phase.next(LifecycleEvent::Activated) else {
            return Err(Error::invalid_state(
                LifecyclePhase::Starting.as_str(),
                inner.phase.as_str(),
            ));
        };
        inner.phase = next;

        self.view.send_modify(|view| {
            view.phase = next;
            view.verdict = Verdict::idle(NOTICE_READY);
            view.notice = Some(NOTICE_READY.to_string());
        });

        Ok(())
    }

    /// Publishes counters and, when decoded, the latest verdict.
    pub(crate) fn publish_progress(
        &self,
        id: SessionId,
        verdict: Option<Verdict>,
        frames_sent: u64,
        responses: u64,
    ) {
        let inner = self.state.lock();
        if inner.session.as_ref().map(|session| session.id) != Some(id) {
            return;
        }

        self.view.send_modify(|view| {
            view.frames_sent = frames_sent;
            view.responses = responses;
            if let Some(verdict) = verdict {
                view.notice = Some(verdict.message.clone());
                view.verdict = verdict;
            }
        });
    }

    /// Releases the session and returns to `IDLE`.
    ///
    /// With `Some(id)` only that session is torn down. Returns `false` if
    /// there was nothing to tear down.
    pub(crate) fn teardown(
        &self,
        id: Option<SessionId>,
        event: LifecycleEvent,
        notice: Option<&str>,
    ) -> bool {
        let mut inner = self.state.lock();

        let current = match &inner.session {
            Some(session) => session.id,
            None => return false,
        };
        if id.is_some_and(|id| id != current) {
            return false;
        }

        let from = inner.phase;
        inner.phase = from.next(event).unwrap_or(LifecyclePhase::Idle);
        if let Some(session) = inner.session.take() {
            session.release();
        }

        self.view
            .send_replace(SessionView::stopped(notice.map(str::to_owned)));

        info!(session = %current, %from, ?event, "Session torn down");
        true
    }
}

// ============================================================================
// StartGuard
// ============================================================================

/// Tears a half-started session down if `start()` is dropped mid-way.
struct StartGuard {
    shared: Arc<Shared>,
    id: SessionId,
    armed: bool,
}

impl StartGuard {
    fn new(shared: Arc<Shared>, id: SessionId) -> Self {
        Self {
            shared,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        if self.armed && self.shared.teardown(Some(self.id), LifecycleEvent::Stopped, None) {
            debug!(session = %self.id, "Start cancelled");
        }
    }
}

// ============================================================================
// SessionManager
// ============================================================================

struct ManagerInner {
    camera: Arc<dyn CameraProvider>,
    options: StreamOptions,
    endpoint: Url,
    shared: Arc<Shared>,
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.shared.teardown(None, LifecycleEvent::Stopped, None);
    }
}

/// Orchestrates camera, transport and pump across start/stop cycles.
///
/// Cheap to clone; clones control the same session. Dropping the last
/// clone stops any running session.
///
/// # Example
///
/// ```ignore
/// use safety_stream::{SessionManager, StillCamera};
///
/// let manager = SessionManager::builder()
///     .camera(StillCamera::test_pattern(1280, 720))
///     .endpoint("ws://localhost:8000/ws")
///     .build()?;
///
/// let mut view = manager.subscribe();
/// manager.start().await?;
///
/// while view.changed().await.is_ok() {
///     let snapshot = view.borrow().clone();
///     println!("{}: {}", snapshot.verdict.status, snapshot.verdict.message);
/// }
/// ```
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Creates a manager from validated parts.
    pub(crate) fn from_parts(
        camera: Arc<dyn CameraProvider>,
        options: StreamOptions,
        endpoint: Url,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                camera,
                options,
                endpoint,
                shared: Arc::new(Shared::new()),
            }),
        }
    }

    /// Starts a session.
    ///
    /// Acquires the camera, opens the transport and returns once it is
    /// `OPEN` and the first capture has been scheduled.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the manager is `IDLE`
    /// - [`Error::Capability`] if the camera is denied or unavailable
    /// - [`Error::Connection`] / [`Error::ConnectionClosed`] if the
    ///   transport fails before `OPEN`
    /// - [`Error::SessionAborted`] if `stop()` ran meanwhile
    ///
    /// Every error leaves the manager `IDLE` with all resources released,
    /// and so does dropping the future before it completes.
    pub async fn start(&self) -> Result<SessionId> {
        let inner = &self.inner;
        let shared = &inner.shared;

        let id = shared.begin()?;
        let mut guard = StartGuard::new(Arc::clone(shared), id);
        info!(session = %id, endpoint = %inner.endpoint, "Starting session");

        let constraints = inner.options.constraints();
        let device = match inner.camera.acquire(&constraints).await {
            Ok(device) => device,
            Err(e) => {
                let error = if e.is_capability_error() {
                    e
                } else {
                    Error::capability(e.to_string())
                };
                warn!(session = %id, %error, "Camera unavailable");
                shared.teardown(Some(id), LifecycleEvent::Failed, Some(NOTICE_CAMERA_ERROR));
                return Err(error);
            }
        };

        let source = device.source();
        debug!(session = %id, resolution = ?device.resolution(), "Camera acquired");
        shared.attach_device(id, device)?;

        let (transport, mut events) =
            TransportSession::open(&inner.endpoint, inner.options.connect_timeout);
        shared.attach_transport(id, transport.clone())?;

        loop {
            match events.recv().await {
                Some(TransportEvent::Open) => break,
                Some(TransportEvent::Message(_)) => {}
                Some(TransportEvent::Error(reason)) => {
                    return Err(self.abort(id, Error::connection(reason)));
                }
                Some(TransportEvent::Close) | None => {
                    return Err(self.abort(id, Error::ConnectionClosed));
                }
            }
        }

        shared.activate(id)?;
        info!(session = %id, "Session active");

        let pump = Pump::new(
            id,
            transport,
            source,
            FrameEncoder::new(inner.options.format),
            Arc::clone(shared),
            inner.options.response_timeout,
        );
        tokio::spawn(pump.run(events, FrameClock::new(inner.options.refresh_interval)));
        guard.disarm();

        Ok(id)
    }

    /// Tears down a session that failed before `OPEN`.
    fn abort(&self, id: SessionId, error: Error) -> Error {
        let torn_down =
            self.inner
                .shared
                .teardown(Some(id), LifecycleEvent::Failed, Some(NOTICE_CONNECTION_ERROR));

        if torn_down {
            warn!(session = %id, %error, "Transport failed before open");
            error
        } else {
            debug!(session = %id, "Start abandoned after stop");
            Error::SessionAborted
        }
    }

    /// Stops the current session. Safe in any phase and idempotent.
    ///
    /// Closes the transport, stops every track, resets the verdict and
    /// returns to `IDLE`. A capture already scheduled never sends.
    pub fn stop(&self) {
        if !self.inner.shared.teardown(None, LifecycleEvent::Stopped, None) {
            debug!("Stop ignored, already idle");
        }
    }

    /// Subscribes to view updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.shared.view.subscribe()
    }

    /// Returns the latest view.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.inner.shared.view.borrow().clone()
    }

    /// Returns the lifecycle phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.inner.shared.phase()
    }

    /// Returns the current session id, if any.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.shared.current()
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &StreamOptions {
        &self.inner.options
    }

    /// Returns the validated backend endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("phase", &self.phase())
            .field("session", &self.session_id())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
