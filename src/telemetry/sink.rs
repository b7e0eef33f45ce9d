//! Span export sinks.
//!
//! # Responsibilities
//! - Define the exporter seam the pipeline drains into
//! - Bridge completed spans into the OpenTelemetry SDK for OTLP export
//! - Provide an in-memory sink for tests
//!
//! # Design Decisions
//! - Spans cross the seam as [`CompletedSpan`] snapshots, so sinks never
//!   observe a span that is still mutable
//! - The OTLP sink reuses the SDK's batch processor for wire batching and
//!   retry; flush/drain maps onto provider force_flush + shutdown

use async_trait::async_trait;
use opentelemetry::trace::{
    Span as _, SpanBuilder, SpanContext, Status, TraceContextExt, TraceFlags, TraceState, Tracer,
    TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

use super::resource::ResourceDescriptor;
use super::span::{AttributeValue, CompletedSpan, SpanStatus};
use super::TelemetryError;

/// Destination for completed spans.
#[async_trait]
pub trait SpanSink: Send + Sync {
    /// Export a batch of completed spans.
    async fn export(&self, batch: Vec<CompletedSpan>) -> Result<(), TelemetryError>;

    /// Flush any sink-internal buffering and release resources.
    async fn shutdown(&self) -> Result<(), TelemetryError>;
}

/// OTLP/gRPC sink backed by an OpenTelemetry `SdkTracerProvider`.
pub struct OtlpSpanSink {
    provider: SdkTracerProvider,
    scope_name: String,
}

impl OtlpSpanSink {
    /// Build an OTLP exporter targeting `endpoint` and a tracer provider
    /// carrying the service resource identity.
    pub fn new(resource: &ResourceDescriptor, endpoint: &str) -> Result<Self, TelemetryError> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| TelemetryError::ExporterInit(e.to_string()))?;

        let builder = Resource::builder()
            .with_service_name(resource.service_name.clone())
            .with_attribute(KeyValue::new(
                "service.version",
                resource.service_version.clone(),
            ));
        let builder = match &resource.environment {
            Some(env) => builder.with_attribute(KeyValue::new(
                "deployment.environment",
                env.clone(),
            )),
            None => builder,
        };

        let provider = SdkTracerProvider::builder()
            .with_resource(builder.build())
            .with_batch_exporter(exporter)
            .build();

        Ok(Self {
            provider,
            scope_name: resource.service_name.clone(),
        })
    }
}

fn otel_trace_id(span: &CompletedSpan) -> opentelemetry::trace::TraceId {
    opentelemetry::trace::TraceId::from_bytes(span.trace_id.as_u128().to_be_bytes())
}

fn otel_span_id(id: crate::telemetry::span::SpanId) -> opentelemetry::trace::SpanId {
    opentelemetry::trace::SpanId::from_bytes(id.as_u64().to_be_bytes())
}

fn otel_value(value: &AttributeValue) -> opentelemetry::Value {
    match value {
        AttributeValue::String(s) => opentelemetry::Value::String(s.clone().into()),
        AttributeValue::Int(i) => opentelemetry::Value::I64(*i),
        AttributeValue::Bool(b) => opentelemetry::Value::Bool(*b),
    }
}

#[async_trait]
impl SpanSink for OtlpSpanSink {
    async fn export(&self, batch: Vec<CompletedSpan>) -> Result<(), TelemetryError> {
        let tracer = self.provider.tracer(self.scope_name.clone());
        for span in batch {
            // Parent linkage is carried through a remote span context so the
            // SDK preserves our ids instead of minting its own.
            let parent_cx = match span.parent_span_id {
                Some(parent_id) => Context::new().with_remote_span_context(SpanContext::new(
                    otel_trace_id(&span),
                    otel_span_id(parent_id),
                    TraceFlags::SAMPLED,
                    false,
                    TraceState::default(),
                )),
                None => Context::new(),
            };

            let status = match span.status {
                SpanStatus::Unset => Status::Unset,
                SpanStatus::Ok => Status::Ok,
                SpanStatus::Error => Status::error(
                    span.status_message.clone().unwrap_or_default(),
                ),
            };

            let attributes: Vec<KeyValue> = span
                .attributes
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), otel_value(v)))
                .collect();

            let mut builder = SpanBuilder::from_name(span.name.clone())
                .with_trace_id(otel_trace_id(&span))
                .with_span_id(otel_span_id(span.span_id))
                .with_start_time(span.start_time)
                .with_attributes(attributes)
                .with_status(status);

            if let Some(exception) = &span.exception {
                builder = builder.with_events(vec![opentelemetry::trace::Event::new(
                    "exception",
                    span.end_time,
                    vec![KeyValue::new("exception.message", exception.clone())],
                    0,
                )]);
            }

            let mut otel_span = tracer.build_with_context(builder, &parent_cx);
            otel_span.end_with_timestamp(span.end_time);
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TelemetryError> {
        self.provider
            .force_flush()
            .map_err(|e| TelemetryError::Export(e.to_string()))?;
        self.provider
            .shutdown()
            .map_err(|e| TelemetryError::Export(e.to_string()))
    }
}

/// In-memory sink recording everything it receives.
///
/// Used by the test suite to assert on exported spans without a collector.
#[derive(Default)]
pub struct RecordingSpanSink {
    spans: std::sync::Mutex<Vec<CompletedSpan>>,
    shutdowns: std::sync::atomic::AtomicUsize,
}

impl RecordingSpanSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans exported so far, in arrival order.
    pub fn spans(&self) -> Vec<CompletedSpan> {
        self.spans.lock().unwrap().clone()
    }

    /// Number of times `shutdown` was invoked.
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl SpanSink for RecordingSpanSink {
    async fn export(&self, batch: Vec<CompletedSpan>) -> Result<(), TelemetryError> {
        self.spans.lock().unwrap().extend(batch);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TelemetryError> {
        self.shutdowns
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
