//! Trace-correlated structured logging.
//!
//! # Responsibilities
//! - Build structured log records with ECS-like field names
//! - Stamp records with the active trace/span ids at emission time
//! - Shield request processing from log sink failures
//!
//! # Design Decisions
//! - Records without an active span are emitted uncorrelated; that is a
//!   normal state (heartbeat, startup, shutdown), not an error
//! - Sink failures are swallowed and counted; the logger never returns an
//!   error to its caller

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::context;
use super::TelemetryError;

/// Log severity. The service only distinguishes info and error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
}

/// One structured log record, immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "log.level")]
    pub level: LogLevel,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "trace.id", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(rename = "span.id", skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord) -> Result<(), TelemetryError>;
}

/// Production sink: forwards records as `tracing` events, which the
/// subscriber stack configured in `main` renders and transports.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, record: &LogRecord) -> Result<(), TelemetryError> {
        let fields = Value::Object(record.fields.clone());
        match (record.level, record.trace_id.as_deref()) {
            (LogLevel::Info, Some(trace_id)) => tracing::info!(
                trace.id = trace_id,
                span.id = record.span_id.as_deref().unwrap_or_default(),
                fields = %fields,
                "{}",
                record.message
            ),
            (LogLevel::Info, None) => {
                tracing::info!(fields = %fields, "{}", record.message)
            }
            (LogLevel::Error, Some(trace_id)) => tracing::error!(
                trace.id = trace_id,
                span.id = record.span_id.as_deref().unwrap_or_default(),
                fields = %fields,
                "{}",
                record.message
            ),
            (LogLevel::Error, None) => {
                tracing::error!(fields = %fields, "{}", record.message)
            }
        }
        Ok(())
    }
}

/// In-memory sink recording every emitted record, for tests.
#[derive(Default)]
pub struct RecordingLogSink {
    records: std::sync::Mutex<Vec<LogRecord>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLogSink {
    fn emit(&self, record: &LogRecord) -> Result<(), TelemetryError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Logger that joins every record to the span active when it was emitted.
pub struct CorrelatedLogger {
    sink: Arc<dyn LogSink>,
    sink_errors: AtomicU64,
}

impl CorrelatedLogger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            sink_errors: AtomicU64::new(0),
        }
    }

    pub fn info(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn error(&self, message: &str, fields: Map<String, Value>) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Emit a record, copying the active trace/span ids if a span is active
    /// on this task. Sink failures are counted and otherwise ignored.
    pub fn log(&self, level: LogLevel, message: &str, fields: Map<String, Value>) {
        let (trace_id, span_id) = match context::current_ids() {
            Some((trace_id, span_id)) => (Some(trace_id.to_string()), Some(span_id.to_string())),
            None => (None, None),
        };
        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            fields,
            trace_id,
            span_id,
        };
        if self.sink.emit(&record).is_err() {
            self.sink_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of records the sink failed to accept.
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }
}

/// Build a field map from key/value pairs.
pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::span::SpanHandle;
    use serde_json::json;

    #[tokio::test]
    async fn uncorrelated_without_active_span() {
        let sink = Arc::new(RecordingLogSink::new());
        let logger = CorrelatedLogger::new(sink.clone());
        logger.info("Periodic heartbeat log", Map::new());
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].trace_id.is_none());
        assert!(records[0].span_id.is_none());
    }

    #[tokio::test]
    async fn correlated_with_active_span() {
        let sink = Arc::new(RecordingLogSink::new());
        let logger = CorrelatedLogger::new(sink.clone());
        let logger = &logger;
        context::scope(async {
            let span = SpanHandle::root("GET /");
            context::push(span.clone());
            logger.info("Received request", fields([("path", json!("/"))]));
            context::pop();
            span.trace_id()
        })
        .await;
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].trace_id.is_some());
        assert!(records[0].span_id.is_some());
        assert_eq!(records[0].fields.get("path"), Some(&json!("/")));
    }

    #[test]
    fn serializes_with_ecs_field_names() {
        let record = LogRecord {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: "Error endpoint called".into(),
            fields: fields([("path", json!("/error"))]),
            trace_id: Some("0".repeat(32)),
            span_id: Some("0".repeat(16)),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["log.level"], json!("error"));
        assert_eq!(value["trace.id"], json!("0".repeat(32)));
        assert_eq!(value["path"], json!("/error"));
        assert!(value.get("@timestamp").is_some());
    }
}
