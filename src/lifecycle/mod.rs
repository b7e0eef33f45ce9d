//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → start pipeline → spawn heartbeat → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → heartbeat stops
//!     → pipeline flush (bounded) → exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: admission stops first, telemetry flushes last, so
//!   every span ended before the signal reaches the export path
//! - Flush wait is bounded; on timeout the process still exits cleanly

pub mod heartbeat;
pub mod shutdown;
pub mod signals;

pub use heartbeat::HeartbeatEmitter;
pub use shutdown::Shutdown;
