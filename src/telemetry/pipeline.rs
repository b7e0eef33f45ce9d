//! Telemetry pipeline: buffering and export of completed spans.
//!
//! # Data Flow
//! ```text
//! orchestrator.end_span()
//!     → export() (non-blocking try_send into bounded queue)
//!     → worker task (drains queue, batches, hands to SpanSink)
//!     → collector (OTLP) or recording sink (tests)
//!
//! shutdown():
//!     close queue → worker drains remaining spans and exits
//!     → bounded wait for worker → sink flush/shutdown (bounded)
//! ```
//!
//! # Design Decisions
//! - Queue is bounded; when full the newly completed span is dropped and
//!   counted rather than blocking the request path
//! - Sink failures are logged at warn inside the worker and never surface
//!   to callers of export()
//! - Shutdown after a prior shutdown is a benign no-op

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::sink::SpanSink;
use super::span::CompletedSpan;
use super::TelemetryError;

/// Maximum spans handed to the sink in one export call.
const MAX_BATCH: usize = 64;

/// Buffered, bounded export pipeline for completed spans.
pub struct TelemetryPipeline {
    sink: Arc<dyn SpanSink>,
    tx: Mutex<Option<mpsc::Sender<CompletedSpan>>>,
    rx: Mutex<Option<mpsc::Receiver<CompletedSpan>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    dropped: AtomicU64,
    flush_timeout: Duration,
}

impl TelemetryPipeline {
    /// Create a pipeline draining into `sink` with the given queue capacity.
    pub fn new(sink: Arc<dyn SpanSink>, queue_capacity: usize, flush_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        Self {
            sink,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            flush_timeout,
        }
    }

    /// Spawn the export worker. Safe to call more than once; only the first
    /// call spawns anything.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let rx = self.rx.lock().unwrap().take();
        let Some(mut rx) = rx else { return };
        let sink = self.sink.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Some(first) = rx.recv().await else { break };
                let mut batch = vec![first];
                while batch.len() < MAX_BATCH {
                    match rx.try_recv() {
                        Ok(span) => batch.push(span),
                        Err(_) => break,
                    }
                }
                if let Err(error) = sink.export(batch).await {
                    tracing::warn!(%error, "span export failed");
                }
            }
        });
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Enqueue a completed span for export without blocking.
    ///
    /// A full queue or an already-shut-down pipeline drops the span and
    /// bumps the dropped counter; neither condition reaches the caller.
    pub fn export(&self, span: CompletedSpan) {
        let guard = self.tx.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(name = %span.name, "span dropped: pipeline is shut down");
            return;
        };
        if tx.try_send(span).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(dropped_total = total, "span dropped: export queue full");
        }
    }

    /// Spans dropped due to a full queue or post-shutdown export calls.
    pub fn dropped_spans(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drain the queue, flush the sink, and stop the worker.
    ///
    /// The wait is bounded by the configured flush timeout; on timeout the
    /// error is reported but the pipeline is still considered stopped.
    /// Calling again after a completed shutdown is a no-op.
    pub async fn shutdown(&self) -> Result<(), TelemetryError> {
        let tx = self.tx.lock().unwrap().take();
        if tx.is_none() {
            tracing::debug!("telemetry pipeline already shut down");
            return Ok(());
        }
        // Dropping the last sender closes the queue; the worker drains what
        // remains and exits.
        drop(tx);

        let worker = self.worker.lock().unwrap().take();
        match worker {
            Some(handle) => {
                if timeout(self.flush_timeout, handle).await.is_err() {
                    return Err(TelemetryError::FlushTimeout(self.flush_timeout));
                }
            }
            None => {
                // start() was never called: drain inline so queued spans
                // still reach the sink.
                let rx = self.rx.lock().unwrap().take();
                if let Some(mut rx) = rx {
                    let mut batch = Vec::new();
                    while let Ok(span) = rx.try_recv() {
                        batch.push(span);
                    }
                    if !batch.is_empty() {
                        if let Err(error) = self.sink.export(batch).await {
                            tracing::warn!(%error, "span export failed during shutdown");
                        }
                    }
                }
            }
        }

        match timeout(self.flush_timeout, self.sink.shutdown()).await {
            Ok(result) => result,
            Err(_) => Err(TelemetryError::FlushTimeout(self.flush_timeout)),
        }
    }
}
