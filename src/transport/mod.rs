//! WebSocket transport layer.
//!
//! This module owns the single duplex connection between the capture
//! client and the inference backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                             ┌──────────────────┐
//! │  Client (Rust)   │         WebSocket           │  Inference       │
//! │                  │  base64 frame ──────────►   │  backend         │
//! │ TransportSession │  ◄────────── JSON verdict   │                  │
//! └──────────────────┘                             └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `TransportSession::open` - Spawn the event loop in `CONNECTING`
//! 2. `TransportEvent::Open` - Handshake done, frames may be sent
//! 3. `TransportSession::send` - Queue one frame (no-op unless `OPEN`)
//! 4. `TransportEvent::Message` - One verdict per frame
//! 5. `TransportSession::close` / remote close / error - `CLOSED`, final
//!    `TransportEvent::Close`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `session` | Connection handle and event loop |
//! | `state` | Transport state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle and event loop.
pub mod session;

/// Transport state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use session::{TransportEvent, TransportEvents, TransportSession};
pub use state::{TransportInput, TransportState};
