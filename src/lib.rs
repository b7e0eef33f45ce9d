//! Traced Service Library
//!
//! A minimal HTTP service instrumented end-to-end with distributed tracing
//! and trace-correlated structured logging.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod telemetry;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
