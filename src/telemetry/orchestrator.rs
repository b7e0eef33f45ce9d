//! Span orchestration: creation, scoping, and guaranteed end.
//!
//! # Responsibilities
//! - Create root and child spans with correct trace inheritance
//! - Keep the task-local active span consistent across suspension points
//! - Record error status on failure paths
//! - End each span exactly once and hand it to the pipeline
//!
//! # Design Decisions
//! - `run_scoped` restores the previous active span and ends the current one
//!   on every exit path; callers signal failure through their return value,
//!   not unwinding, so the cleanup is a straight-line epilogue
//! - A child's failure never implicitly marks its parent: only an explicit
//!   `record_error` on a span changes that span's status

use std::future::Future;
use std::sync::Arc;

use super::context;
use super::pipeline::TelemetryPipeline;
use super::span::SpanHandle;

/// Creates spans and guarantees their delivery to the pipeline.
pub struct SpanOrchestrator {
    pipeline: Arc<TelemetryPipeline>,
}

impl SpanOrchestrator {
    pub fn new(pipeline: Arc<TelemetryPipeline>) -> Self {
        Self { pipeline }
    }

    /// Start a span. With a parent it joins that trace; without one it
    /// becomes the root of a fresh trace.
    pub fn start_span(&self, name: &str, parent: Option<&SpanHandle>) -> SpanHandle {
        match parent {
            Some(parent) => SpanHandle::child_of(parent, name),
            None => SpanHandle::root(name),
        }
    }

    /// Run `f` inside a new span scoped to the current task.
    ///
    /// The span's parent is whatever span is active on this task (none for
    /// a root). The span is pushed onto the task-local stack for the
    /// duration of `f` and the previous active span is restored afterwards,
    /// success or failure, no matter how often `f` suspends. The span is
    /// ended exactly once before the result is returned.
    pub async fn run_scoped<T, F, Fut>(&self, name: &str, f: F) -> T
    where
        F: FnOnce(SpanHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        let parent = context::current();
        let span = self.start_span(name, parent.as_ref());
        let pushed = context::push(span.clone());
        let output = f(span.clone()).await;
        if pushed {
            context::pop();
        }
        self.end_span(&span);
        output
    }

    /// Mark `span` as failed with `error`'s message and detail.
    pub fn record_error(&self, span: &SpanHandle, error: &dyn std::error::Error) {
        span.record_error(error);
    }

    /// End `span` and export it. No-op if the span already ended.
    pub fn end_span(&self, span: &SpanHandle) {
        if let Some(completed) = span.finish() {
            self.pipeline.export(completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::telemetry::sink::RecordingSpanSink;

    fn orchestrator() -> (SpanOrchestrator, Arc<RecordingSpanSink>, Arc<TelemetryPipeline>) {
        let sink = Arc::new(RecordingSpanSink::new());
        let pipeline = Arc::new(TelemetryPipeline::new(
            sink.clone(),
            128,
            Duration::from_secs(5),
        ));
        pipeline.start();
        (SpanOrchestrator::new(pipeline.clone()), sink, pipeline)
    }

    #[tokio::test]
    async fn run_scoped_nests_and_restores() {
        let (orch, sink, pipeline) = orchestrator();
        let orch = &orch;
        context::scope(async {
            orch.run_scoped("root", |root| async move {
                let outer = context::current().unwrap();
                assert_eq!(outer.span_id(), root.span_id());
                let root_trace = root.trace_id();
                orch.run_scoped("child", |child| async move {
                    assert_eq!(context::current().unwrap().span_id(), child.span_id());
                    assert_eq!(child.trace_id(), root_trace);
                })
                .await;
                // Parent restored after the child scope, across the await.
                assert_eq!(context::current().unwrap().span_id(), root.span_id());
            })
            .await;
            assert!(context::current().is_none());
        })
        .await;

        pipeline.shutdown().await.unwrap();
        let spans = sink.spans();
        assert_eq!(spans.len(), 2);
        // Children end before their parent.
        assert_eq!(spans[0].name, "child");
        assert_eq!(spans[1].name, "root");
        assert_eq!(spans[0].parent_span_id, Some(spans[1].span_id));
    }

    #[tokio::test]
    async fn double_end_exports_once() {
        let (orch, sink, pipeline) = orchestrator();
        let span = orch.start_span("once", None);
        orch.end_span(&span);
        orch.end_span(&span);
        pipeline.shutdown().await.unwrap();
        assert_eq!(sink.spans().len(), 1);
    }

    #[tokio::test]
    async fn run_scoped_without_scope_still_ends_span() {
        let (orch, sink, pipeline) = orchestrator();
        // No context::scope: correlation is unavailable but the span must
        // still be created and exported.
        let value = orch.run_scoped("bare", |_span| async { 7 }).await;
        assert_eq!(value, 7);
        pipeline.shutdown().await.unwrap();
        assert_eq!(sink.spans().len(), 1);
    }

    #[tokio::test]
    async fn child_error_does_not_mark_parent() {
        let (orch, sink, pipeline) = orchestrator();
        let orch = &orch;
        context::scope(async {
            orch.run_scoped("root", |_root| async {
                let failed: Result<(), std::io::Error> = orch
                    .run_scoped("child", |child| async move {
                        let err =
                            std::io::Error::new(std::io::ErrorKind::Other, "downstream failed");
                        orch.record_error(&child, &err);
                        Err(err)
                    })
                    .await;
                assert!(failed.is_err());
            })
            .await;
        })
        .await;

        pipeline.shutdown().await.unwrap();
        let spans = sink.spans();
        let child = spans.iter().find(|s| s.name == "child").unwrap();
        let root = spans.iter().find(|s| s.name == "root").unwrap();
        assert_eq!(child.status, crate::telemetry::SpanStatus::Error);
        assert_eq!(root.status, crate::telemetry::SpanStatus::Unset);
    }
}
