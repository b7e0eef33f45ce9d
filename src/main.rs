//! Traced Service
//!
//! A minimal HTTP service instrumented end-to-end with distributed tracing
//! and trace-correlated structured logging.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                TRACED SERVICE                 │
//!                      │                                               │
//!   Client Request     │  ┌─────────┐    ┌──────────────────────────┐ │
//!   ──────────────────────▶│  http   │───▶│      span orchestrator   │ │
//!                      │  │ handler │    │  root span → child span  │ │
//!                      │  └────┬────┘    └────────────┬─────────────┘ │
//!                      │       │                      │               │
//!                      │       ▼                      ▼               │
//!                      │  ┌─────────────┐    ┌──────────────────┐    │
//!   Log records        │  │ correlated  │    │    telemetry     │    │  Spans (OTLP)
//!   ◀──────────────────────│   logger    │    │    pipeline      │─────────▶ collector
//!                      │  └─────────────┘    └──────────────────┘    │
//!                      │                                               │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │           Cross-Cutting Concerns        │  │
//!                      │  │  ┌─────────┐ ┌───────────┐ ┌─────────┐ │  │
//!                      │  │  │ config  │ │ heartbeat │ │shutdown │ │  │
//!                      │  │  └─────────┘ └───────────┘ └─────────┘ │  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde_json::Map;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traced_service::config;
use traced_service::http::{AppState, HttpServer};
use traced_service::lifecycle::{signals, HeartbeatEmitter, Shutdown};
use traced_service::telemetry::logger::TracingLogSink;
use traced_service::telemetry::sink::{OtlpSpanSink, SpanSink};
use traced_service::telemetry::{
    CorrelatedLogger, ResourceDescriptor, SpanOrchestrator, TelemetryPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "traced_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("traced-service v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(config::load_from_env());
    let resource = ResourceDescriptor::from_config(&config.identity);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        otlp_endpoint = %config.exporter.otlp_endpoint,
        heartbeat_period_secs = config.heartbeat.period_secs,
        "Configuration loaded"
    );

    // Telemetry pipeline: OTLP sink behind a bounded queue, explicit
    // lifecycle, injected into everything that produces telemetry.
    let sink: Arc<dyn SpanSink> =
        Arc::new(OtlpSpanSink::new(&resource, &config.exporter.otlp_endpoint)?);
    let pipeline = Arc::new(TelemetryPipeline::new(
        sink,
        config.exporter.queue_capacity,
        config.exporter.flush_timeout(),
    ));
    pipeline.start();

    let orchestrator = Arc::new(SpanOrchestrator::new(pipeline.clone()));
    let logger = Arc::new(CorrelatedLogger::new(Arc::new(TracingLogSink)));

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    // Heartbeat runs for the whole process lifetime until shutdown begins.
    let heartbeat = HeartbeatEmitter::new(logger.clone(), config.heartbeat.period());
    tokio::spawn(heartbeat.run(shutdown.subscribe()));

    // Translate the OS signal into the shutdown broadcast.
    tokio::spawn(async move {
        signals::wait_for_termination().await;
        tracing::info!("Termination signal received");
        shutdown.trigger();
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    logger.info(
        &format!("Server running at http://{local_addr}"),
        Map::new(),
    );

    let state = AppState {
        orchestrator,
        logger: logger.clone(),
        config: config.clone(),
    };
    let server = HttpServer::new(state);
    server.run(listener, server_shutdown).await?;

    // Admission has stopped and in-flight requests have drained; flush
    // everything the pipeline is still holding before exiting.
    logger.info("Shutting down...", Map::new());
    if let Err(error) = pipeline.shutdown().await {
        tracing::warn!(%error, "Telemetry flush incomplete; buffered telemetry may be lost");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
