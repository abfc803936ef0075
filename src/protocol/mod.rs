//! Backend message types.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Body |
//! |---------|-----------|------|
//! | Frame | Client → Backend | Bare base64 of one compressed frame |
//! | Verdict | Backend → Client | JSON record, one per frame |
//!
//! There is no request id: with at most one frame in flight, each verdict
//! answers the most recent frame.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `interpreter` | Inbound message decoding |
//! | `verdict` | Verdict record and status labels |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound message decoding.
pub mod interpreter;

/// Verdict record.
pub mod verdict;

// ============================================================================
// Re-exports
// ============================================================================

pub use interpreter::{InboundMessage, ResponseInterpreter};
pub use verdict::{Verdict, VerdictStatus};
