//! Session lifecycle and frame pacing.
//!
//! # Example
//!
//! ```ignore
//! use safety_stream::{SessionManager, StillCamera};
//!
//! let manager = SessionManager::builder()
//!     .camera(StillCamera::open(["worker.jpg"])?)
//!     .build()?;
//!
//! manager.start().await?;
//! // ...
//! manager.stop();
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent manager configuration |
//! | `lifecycle` | Start/stop orchestration and teardown |
//! | `options` | Streaming options |
//! | `pacing` | One-frame-in-flight state machine |
//! | `pump` | Per-session capture/response loop |
//! | `view` | Lifecycle phase and published view |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for manager configuration.
pub mod builder;

/// Session lifecycle manager.
pub mod lifecycle;

/// Streaming options.
pub mod options;

/// Pacing state machine.
pub mod pacing;

/// Per-session frame pump.
mod pump;

/// Lifecycle phase and published view.
pub mod view;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionManagerBuilder;
pub use lifecycle::SessionManager;
pub use options::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, StreamOptions};
pub use pacing::{PacingAction, PacingController, PacingEvent, PacingPhase};
pub use view::{LifecycleEvent, LifecyclePhase, SessionView};
