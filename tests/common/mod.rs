//! Shared utilities for integration testing.
//!
//! Builds the full telemetry wiring against in-memory recording sinks so
//! tests can assert on exported spans and emitted log records without a
//! collector.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use traced_service::config::ServiceConfig;
use traced_service::http::{build_router, AppState, HttpServer};
use traced_service::telemetry::logger::RecordingLogSink;
use traced_service::telemetry::sink::RecordingSpanSink;
use traced_service::telemetry::{CorrelatedLogger, SpanOrchestrator, TelemetryPipeline};

/// Fully wired service with recording sinks in place of OTLP and tracing.
pub struct Harness {
    pub spans: Arc<RecordingSpanSink>,
    pub logs: Arc<RecordingLogSink>,
    pub pipeline: Arc<TelemetryPipeline>,
    pub orchestrator: Arc<SpanOrchestrator>,
    pub logger: Arc<CorrelatedLogger>,
    pub config: Arc<ServiceConfig>,
}

impl Harness {
    pub fn new() -> Self {
        let mut config = ServiceConfig::default();
        // Keep the simulated work short so tests stay fast.
        config.handler.processing_delay_ms = 1;
        Self::with_config(config)
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let spans = Arc::new(RecordingSpanSink::new());
        let logs = Arc::new(RecordingLogSink::new());
        let pipeline = Arc::new(TelemetryPipeline::new(
            spans.clone(),
            config.exporter.queue_capacity,
            config.exporter.flush_timeout(),
        ));
        pipeline.start();
        Self {
            spans,
            logs: logs.clone(),
            pipeline: pipeline.clone(),
            orchestrator: Arc::new(SpanOrchestrator::new(pipeline)),
            logger: Arc::new(CorrelatedLogger::new(logs)),
            config: Arc::new(config),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            orchestrator: self.orchestrator.clone(),
            logger: self.logger.clone(),
            config: self.config.clone(),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }

    #[allow(dead_code)]
    pub fn server(&self) -> HttpServer {
        HttpServer::new(self.state())
    }

    /// Drain the pipeline so every ended span has reached the sink.
    #[allow(dead_code)]
    pub async fn flush(&self) {
        self.pipeline.shutdown().await.unwrap();
    }
}

/// Drive one request through the router in-process.
#[allow(dead_code)]
pub async fn send(router: Router, method: &str, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
