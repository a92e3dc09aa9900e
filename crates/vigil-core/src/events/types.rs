//! Event payload types for engine run lifecycle events.

use std::path::PathBuf;

/// Payload for `on_run_started`.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    pub local_tools: usize,
    pub global_simple_tools: usize,
    pub global_tools: usize,
    pub workers: usize,
    pub queue_capacity: usize,
}

/// Payload for `on_unit_processed`.
#[derive(Debug, Clone)]
pub struct UnitProcessedEvent {
    pub path: PathBuf,
    pub processed: usize,
}

/// Payload for `on_preempted`.
#[derive(Debug, Clone)]
pub struct PreemptedEvent {
    /// 1-based count of preemptions so far in this run.
    pub attempt: usize,
    pub pending_failed_units: usize,
}

/// Payload for `on_resumed`.
#[derive(Debug, Clone)]
pub struct ResumedEvent {
    pub attempt: usize,
}

/// Payload for `on_tool_failed`.
#[derive(Debug, Clone)]
pub struct ToolFailedEvent {
    pub tool_id: String,
    pub unit: Option<PathBuf>,
    pub message: String,
}

/// Payload for `on_run_completed`.
#[derive(Debug, Clone)]
pub struct RunCompletedEvent {
    pub units_processed: usize,
    pub total_problems: usize,
    pub has_problems: bool,
    pub preemptions: usize,
    pub duration_ms: u64,
}

/// Payload for `on_run_aborted`.
#[derive(Debug, Clone)]
pub struct RunAbortedEvent {
    pub reason: String,
    pub units_processed: usize,
}
