//! Safety Stream - self-paced camera frame streaming for PPE checks.
//!
//! This library streams compressed camera frames to an inference backend
//! over one WebSocket and publishes the backend's per-frame verdict
//! (identity and protective-equipment compliance).
//!
//! # Architecture
//!
//! The client keeps exactly one frame in flight:
//!
//! - **Capture (Rust)**: Reads a sample, encodes it, sends it as base64 text
//! - **Backend (remote)**: Answers every frame with one JSON verdict
//!
//! Key design principles:
//!
//! - The next capture is scheduled only after the previous response, so the
//!   frame rate adapts to backend latency (window size of one)
//! - Explicit state machines for the transport, the pacing loop and the
//!   session lifecycle
//! - Every error or close reaches the same teardown as [`SessionManager::stop`]
//! - Presentation observes a [`SessionView`] over a watch channel
//!
//! # Quick Start
//!
//! ```no_run
//! use safety_stream::{Result, SessionManager, StillCamera};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = SessionManager::builder()
//!         .camera(StillCamera::open(["worker.jpg"])?)
//!         .endpoint("ws://localhost:8000/ws")
//!         .build()?;
//!
//!     let mut view = manager.subscribe();
//!     manager.start().await?;
//!
//!     while view.changed().await.is_ok() {
//!         let snapshot = view.borrow().clone();
//!         println!("{}: {}", snapshot.verdict.status, snapshot.verdict.message);
//!         if snapshot.phase.is_idle() {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`backend`] | Loopback inference backend for demos and tests |
//! | [`capture`] | Camera negotiation, samples, encoding, refresh tick |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Verdict record and response decoding |
//! | [`session`] | Lifecycle manager and pacing controller |
//! | [`transport`] | WebSocket transport session |

// ============================================================================
// Modules
// ============================================================================

/// Loopback inference backend.
///
/// A local server speaking the backend's wire protocol.
pub mod backend;

/// Camera capture and frame encoding.
pub mod capture;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Backend message types.
pub mod protocol;

/// Session lifecycle and frame pacing.
///
/// Use [`SessionManager::builder()`] to create a configured manager.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Backend types
pub use backend::{FrameReceipt, LoopbackBackend, Reply};

// Capture types
pub use capture::{
    CameraProvider, CaptureDevice, FacingMode, FrameEncoder, FramePayload, ImageFormat,
    MediaConstraints, MediaTrack, StillCamera, VideoSample, VideoSource,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameSeq, SessionId};

// Protocol types
pub use protocol::{InboundMessage, ResponseInterpreter, Verdict, VerdictStatus};

// Session types
pub use session::{
    LifecyclePhase, PacingController, SessionManager, SessionManagerBuilder, SessionView,
    StreamOptions,
};

// Transport types
pub use transport::{TransportEvent, TransportSession, TransportState};
