//! EngineEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing engine events.
///
/// All methods have no-op default implementations, so handlers only need
/// to override the events they care about. Handlers are invoked from worker
/// threads and must be `Send + Sync`.
pub trait EngineEventHandler: Send + Sync {
    // ---- Run Lifecycle ----
    fn on_run_started(&self, _event: &RunStartedEvent) {}
    fn on_run_completed(&self, _event: &RunCompletedEvent) {}
    fn on_run_aborted(&self, _event: &RunAbortedEvent) {}

    // ---- Progress ----
    fn on_unit_processed(&self, _event: &UnitProcessedEvent) {}

    // ---- Preemption ----
    fn on_preempted(&self, _event: &PreemptedEvent) {}
    fn on_resumed(&self, _event: &ResumedEvent) {}

    // ---- Errors ----
    fn on_tool_failed(&self, _event: &ToolFailedEvent) {}
}
