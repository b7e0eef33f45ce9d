//! HTTP surface.
//!
//! One fallback handler wrapped by the span orchestrator; no routing table
//! and no middleware chain beyond that single instrumentation wrapper.

pub mod server;

pub use server::{build_router, AppState, HandlerError, HttpServer};
