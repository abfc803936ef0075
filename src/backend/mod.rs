//! Loopback inference backend.
//!
//! A local stand-in for the remote service, speaking the same wire
//! protocol. Used by the demos and by the crate's end-to-end tests.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `demo` | Demo-mode responder |
//! | `server` | WebSocket server and frame decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Demo-mode responder.
pub mod demo;

/// WebSocket server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use demo::{DEMO_MESSAGE, demo_reply};
pub use server::{FrameReceipt, LoopbackBackend, Reply};

use crate::error::Result;

impl LoopbackBackend {
    /// Binds a backend answering every frame in demo mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn demo() -> Result<Self> {
        Self::bind(demo_reply).await
    }
}
