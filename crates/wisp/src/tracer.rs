//! Evaluation tracing (grounded on the teacher's `VmTracer`, `tracer.rs` in
//! `examples/parcadei-ouros/crates/ouros`).
//!
//! The teacher's trait hooks a bytecode dispatch loop: one callback per
//! opcode fetch, per cell load/store, per call/return. `wisp` has no
//! bytecode, so the hook points move to the interpreter-level events that
//! play the same role — a closure call, a `recur` trampoline iteration — but
//! the shape is identical: every method defaults to an empty, `#[inline(always)]`
//! body so a [`NoopTracer`] compiles down to nothing, and a tracer is plugged
//! in by value rather than through dynamic dispatch at the hot call site.

use std::fmt;

/// One observable evaluator event, as handed to a [`RecordingTracer`]-style
/// consumer. Mirrors the teacher's `TraceEvent` shape at the coarser
/// granularity this interpreter actually has events for.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// A closure (or closure arity, after trampoline re-entry) was entered.
    Call { name: Option<String>, depth: usize },
    /// The trampoline re-entered a closure body with fresh `recur` values.
    Recur { name: Option<String>, depth: usize },
}

/// Hook points an evaluation can drive a tracer through. All methods default
/// to a no-op so implementing only the ones you care about costs nothing at
/// the others' call sites.
pub trait VmTracer {
    #[inline(always)]
    fn on_call(&self, name: Option<&str>, depth: usize) {
        let _ = (name, depth);
    }

    #[inline(always)]
    fn on_recur(&self, name: Option<&str>, depth: usize) {
        let _ = (name, depth);
    }
}

/// The default: costs nothing, traces nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Prints one line per event to stderr as it happens, capped at `limit`
/// events if set (mirrors the teacher's `StderrTracer::with_limit`).
#[derive(Debug, Default)]
pub struct StderrTracer {
    limit: Option<usize>,
    count: std::cell::Cell<usize>,
}

impl StderrTracer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), count: std::cell::Cell::new(0) }
    }

    fn tick(&self) -> bool {
        let n = self.count.get() + 1;
        self.count.set(n);
        self.limit.is_none_or(|limit| n <= limit)
    }
}

impl VmTracer for StderrTracer {
    fn on_call(&self, name: Option<&str>, depth: usize) {
        if self.tick() {
            eprintln!("call {} depth={depth}", name.unwrap_or("<anonymous>"));
        }
    }

    fn on_recur(&self, name: Option<&str>, depth: usize) {
        if self.tick() {
            eprintln!("recur {} depth={depth}", name.unwrap_or("<anonymous>"));
        }
    }
}

/// Accumulates every event it sees, for tests and offline inspection.
#[derive(Default)]
pub struct RecordingTracer {
    events: std::cell::RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }
}

impl VmTracer for RecordingTracer {
    fn on_call(&self, name: Option<&str>, depth: usize) {
        self.events.borrow_mut().push(TraceEvent::Call { name: name.map(ToOwned::to_owned), depth });
    }

    fn on_recur(&self, name: Option<&str>, depth: usize) {
        self.events.borrow_mut().push(TraceEvent::Recur { name: name.map(ToOwned::to_owned), depth });
    }
}

impl fmt::Debug for RecordingTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTracer").field("event_count", &self.event_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_accumulates_events_in_order() {
        let tracer = RecordingTracer::new();
        tracer.on_call(Some("f"), 1);
        tracer.on_recur(Some("f"), 1);
        assert_eq!(tracer.event_count(), 2);
        match &tracer.events()[1] {
            TraceEvent::Recur { name, depth } => {
                assert_eq!(name.as_deref(), Some("f"));
                assert_eq!(*depth, 1);
            }
            other => panic!("expected a Recur event, got {other:?}"),
        }
    }

    #[test]
    fn noop_tracer_implements_every_hook_as_a_no_op() {
        let tracer = NoopTracer;
        tracer.on_call(Some("f"), 0);
        tracer.on_recur(None, 0);
    }
}
