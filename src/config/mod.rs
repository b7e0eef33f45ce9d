//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → loader.rs (environment overrides)
//!     → ServiceConfig (immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no reload path
//! - Every field has a default so an empty environment is a valid setup
//! - The OTLP endpoint follows the standard `OTEL_EXPORTER_OTLP_ENDPOINT`
//!   variable with a documented collector fallback

pub mod loader;
pub mod schema;

pub use loader::load_from_env;
pub use schema::{
    ExporterConfig, HandlerConfig, HeartbeatConfig, IdentityConfig, ListenerConfig, ServiceConfig,
};
