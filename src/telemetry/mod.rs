//! Telemetry subsystem: spans, correlation, and export.
//!
//! # Data Flow
//! ```text
//! Request handler
//!     → orchestrator.rs (root/child spans, scoped start/end)
//!     → context.rs (task-local active-span stack)
//!     → logger.rs (log records stamped with active trace/span ids)
//!
//! Ended spans:
//!     orchestrator.rs
//!     → pipeline.rs (bounded queue + export worker)
//!     → sink.rs (OTLP/gRPC to the collector; in-memory sink for tests)
//! ```
//!
//! # Design Decisions
//! - The pipeline is an explicitly constructed object with a
//!   start/export/shutdown lifecycle, injected into the orchestrator and the
//!   shutdown path; there is no process-wide SDK singleton
//! - Telemetry loss never fails a request: export enqueue is non-blocking
//!   and sink failures stay inside the pipeline
//! - Ending a span is idempotent; only the first end produces an export

pub mod context;
pub mod logger;
pub mod orchestrator;
pub mod pipeline;
pub mod resource;
pub mod sink;
pub mod span;

pub use logger::{CorrelatedLogger, LogLevel, LogRecord};
pub use orchestrator::SpanOrchestrator;
pub use pipeline::TelemetryPipeline;
pub use resource::ResourceDescriptor;
pub use span::{CompletedSpan, SpanHandle, SpanStatus};

use std::time::Duration;

/// Errors internal to the telemetry subsystem.
///
/// None of these ever propagate into request handling; they surface only
/// through the pipeline's own lifecycle calls and diagnostic logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("exporter initialization failed: {0}")]
    ExporterInit(String),

    #[error("span export failed: {0}")]
    Export(String),

    #[error("log sink failed: {0}")]
    LogSink(String),

    #[error("telemetry flush timed out after {0:?}")]
    FlushTimeout(Duration),
}
