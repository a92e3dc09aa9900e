//! Synchronous event dispatch. Free when no handler is registered.

use std::sync::Arc;

use super::handler::EngineEventHandler;
use super::types::*;

/// Synchronous event dispatcher wrapping a list of handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EngineEventHandler>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn EngineEventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Emit an event to all registered handlers.
    /// A panicking handler is logged and does not stop later handlers.
    fn emit<F: Fn(&dyn EngineEventHandler)>(&self, event: &'static str, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::warn!(event, "event handler panicked");
            }
        }
    }

    // ---- Run Lifecycle ----
    pub fn emit_run_started(&self, event: &RunStartedEvent) {
        self.emit("run_started", |h| h.on_run_started(event));
    }

    pub fn emit_run_completed(&self, event: &RunCompletedEvent) {
        self.emit("run_completed", |h| h.on_run_completed(event));
    }

    pub fn emit_run_aborted(&self, event: &RunAbortedEvent) {
        self.emit("run_aborted", |h| h.on_run_aborted(event));
    }

    // ---- Progress ----
    pub fn emit_unit_processed(&self, event: &UnitProcessedEvent) {
        self.emit("unit_processed", |h| h.on_unit_processed(event));
    }

    // ---- Preemption ----
    pub fn emit_preempted(&self, event: &PreemptedEvent) {
        self.emit("preempted", |h| h.on_preempted(event));
    }

    pub fn emit_resumed(&self, event: &ResumedEvent) {
        self.emit("resumed", |h| h.on_resumed(event));
    }

    // ---- Errors ----
    pub fn emit_tool_failed(&self, event: &ToolFailedEvent) {
        self.emit("tool_failed", |h| h.on_tool_failed(event));
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
