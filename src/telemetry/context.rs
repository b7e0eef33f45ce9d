//! Task-local active-span context.
//!
//! # Responsibilities
//! - Track the currently active span for the calling logical task
//! - Survive suspension points without leaking across tasks
//! - Expose the active trace/span ids for log correlation
//!
//! # Design Decisions
//! - One span stack per task via `tokio::task_local!`, never a process-wide
//!   global: concurrent request tasks each get their own stack, so sibling
//!   requests cannot observe or corrupt each other's active span
//! - Reads outside any [`scope`] (heartbeat, startup) see no active span,
//!   which is a valid state, not an error

use std::cell::RefCell;
use std::future::Future;

use super::span::{SpanHandle, SpanId, TraceId};

tokio::task_local! {
    static ACTIVE_SPANS: RefCell<Vec<SpanHandle>>;
}

/// Run `fut` with a fresh, empty span stack bound to the current task.
///
/// Each request task should be wrapped in exactly one `scope` call; spans
/// pushed inside it are invisible to every other task.
pub async fn scope<F>(fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE_SPANS.scope(RefCell::new(Vec::new()), fut).await
}

/// The currently active span for this task, if any.
pub fn current() -> Option<SpanHandle> {
    ACTIVE_SPANS
        .try_with(|stack| stack.borrow().last().cloned())
        .ok()
        .flatten()
}

/// Trace and span ids of the currently active span, for log correlation.
pub fn current_ids() -> Option<(TraceId, SpanId)> {
    current().map(|span| (span.trace_id(), span.span_id()))
}

/// Push a span onto the task's stack. Returns false when the task has no
/// span stack (no enclosing [`scope`]), in which case nothing was pushed.
pub(crate) fn push(span: SpanHandle) -> bool {
    ACTIVE_SPANS
        .try_with(|stack| stack.borrow_mut().push(span))
        .is_ok()
}

/// Pop the most recently pushed span, restoring its parent as active.
pub(crate) fn pop() {
    let _ = ACTIVE_SPANS.try_with(|stack| {
        stack.borrow_mut().pop();
    });
}
