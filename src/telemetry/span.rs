//! Span data model.
//!
//! A span is mutable only while its operation is in flight; [`SpanHandle`]
//! is the shared handle used during that window. Ending a span snapshots it
//! into an immutable [`CompletedSpan`], which is what the pipeline exports.
//! The first `finish()` call wins; later calls observe the span as already
//! ended and return nothing, which is what makes duplicate export impossible.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use rand::Rng;

/// 128-bit trace identifier shared by every span in one request tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Mint a fresh, non-zero trace identifier.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen::<u128>();
            // Zero is the OTel "invalid" sentinel.
            if id != 0 {
                return Self(id);
            }
        }
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// 64-bit span identifier, unique per span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Mint a fresh, non-zero span identifier.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id = rng.gen::<u64>();
            if id != 0 {
                return Self(id);
            }
        }
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Scalar attribute value attached to a span.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Span completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

#[derive(Default)]
struct SpanState {
    attributes: Vec<(String, AttributeValue)>,
    status: SpanStatus,
    status_message: Option<String>,
    exception: Option<String>,
    end_time: Option<SystemTime>,
}

struct SpanInner {
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    name: String,
    start_time: SystemTime,
    state: Mutex<SpanState>,
}

/// Shared handle to an in-flight span.
///
/// Cloning is cheap; all clones refer to the same span.
#[derive(Clone)]
pub struct SpanHandle {
    inner: Arc<SpanInner>,
}

impl SpanHandle {
    /// Start a new root span with a fresh trace identifier.
    pub fn root(name: &str) -> Self {
        Self::build(TraceId::random(), None, name)
    }

    /// Start a child span inheriting the parent's trace identifier.
    pub fn child_of(parent: &SpanHandle, name: &str) -> Self {
        Self::build(parent.trace_id(), Some(parent.span_id()), name)
    }

    fn build(trace_id: TraceId, parent_span_id: Option<SpanId>, name: &str) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                trace_id,
                span_id: SpanId::random(),
                parent_span_id,
                name: name.to_string(),
                start_time: SystemTime::now(),
                state: Mutex::new(SpanState::default()),
            }),
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.inner.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.inner.span_id
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.inner.parent_span_id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Set or overwrite an attribute on the span.
    pub fn set_attribute(&self, key: &str, value: impl Into<AttributeValue>) {
        let mut state = self.inner.state.lock().unwrap();
        if state.end_time.is_some() {
            return;
        }
        let value = value.into();
        if let Some(entry) = state.attributes.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            state.attributes.push((key.to_string(), value));
        }
    }

    /// Mark the span as failed. Last write wins.
    pub fn record_error(&self, error: &dyn std::error::Error) {
        let mut state = self.inner.state.lock().unwrap();
        if state.end_time.is_some() {
            return;
        }
        state.status = SpanStatus::Error;
        state.status_message = Some(error.to_string());
        state.exception = Some(format!("{error:?}"));
    }

    /// Whether the span has already been ended.
    pub fn has_ended(&self) -> bool {
        self.inner.state.lock().unwrap().end_time.is_some()
    }

    /// End the span, returning its immutable export snapshot.
    ///
    /// Only the first call produces a snapshot; an already-ended span
    /// returns `None` and must not be exported again.
    pub fn finish(&self) -> Option<CompletedSpan> {
        let mut state = self.inner.state.lock().unwrap();
        if state.end_time.is_some() {
            return None;
        }
        let end_time = SystemTime::now();
        state.end_time = Some(end_time);
        Some(CompletedSpan {
            trace_id: self.inner.trace_id,
            span_id: self.inner.span_id,
            parent_span_id: self.inner.parent_span_id,
            name: self.inner.name.clone(),
            start_time: self.inner.start_time,
            end_time,
            attributes: state.attributes.clone(),
            status: state.status,
            status_message: state.status_message.clone(),
            exception: state.exception.clone(),
        })
    }
}

impl fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanHandle")
            .field("trace_id", &self.inner.trace_id)
            .field("span_id", &self.inner.span_id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Immutable snapshot of an ended span, ready for export.
#[derive(Debug, Clone)]
pub struct CompletedSpan {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub name: String,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub attributes: Vec<(String, AttributeValue)>,
    pub status: SpanStatus,
    pub status_message: Option<String>,
    pub exception: Option<String>,
}

impl CompletedSpan {
    /// Look up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}
