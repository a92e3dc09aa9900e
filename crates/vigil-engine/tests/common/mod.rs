//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vigil_core::config::{EngineConfig, RunMode, VigilConfig};
use vigil_core::errors::ToolError;
use vigil_core::events::types::*;
use vigil_core::events::EngineEventHandler;
use vigil_engine::presentation::TextRange;
use vigil_engine::tools::{GlobalContext, GlobalTool, LocalTool, Problem, ProblemSink, ToolContext};
use vigil_engine::unit::ToolScope;
use vigil_engine::AnalysisUnit;

/// Offline config with small, deterministic limits.
pub fn config(workers: usize, queue_capacity: usize) -> VigilConfig {
    VigilConfig {
        engine: EngineConfig {
            workers: Some(workers),
            queue_capacity: Some(queue_capacity),
            run_mode: Some(RunMode::Offline),
            poll_interval_ms: Some(1),
            shutdown_timeout_ms: Some(5_000),
            ..EngineConfig::default()
        },
        ..VigilConfig::default()
    }
}

/// Flags the first occurrence of a substring within the inspected range.
pub struct SubstringTool {
    pub needle: &'static str,
    pub calls: AtomicUsize,
}

impl SubstringTool {
    pub fn new(needle: &'static str) -> Self {
        Self {
            needle,
            calls: AtomicUsize::new(0),
        }
    }
}

impl LocalTool for SubstringTool {
    fn check_unit(&self, unit: &dyn AnalysisUnit, ctx: &ToolContext<'_>, sink: &mut ProblemSink) -> Result<(), ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.checkpoint()?;
        let text = unit.text()?;
        let window = ctx.range();
        let from = window.start as usize;
        let to = (window.end as usize).min(text.len());
        let found = text.get(from..to).and_then(|s| s.find(self.needle));
        if let Some(offset) = found {
            let start = from + offset;
            let range = TextRange::new(start as u32, (start + self.needle.len()) as u32);
            sink.report(Problem::new(unit.path(), format!("found '{}'", self.needle)).at(range));
        }
        Ok(())
    }
}

/// Flags every unit whose file name is shared with another unit.
pub struct DuplicateNameTool;

impl GlobalTool for DuplicateNameTool {
    fn run(&self, scope: &ToolScope<'_>, ctx: &GlobalContext<'_>, sink: &mut ProblemSink) -> Result<(), ToolError> {
        let graph = ctx
            .graph()
            .ok_or_else(|| ToolError::failed("duplicate-names", "declaration graph missing"))?;
        for (name, paths) in graph.names_with_duplicates() {
            for path in paths.iter().filter(|p| scope.contains_path(p)) {
                sink.report(Problem::new(path.clone(), format!("duplicate file name '{name}'")));
            }
        }
        Ok(())
    }

    fn needs_graph(&self) -> bool {
        true
    }
}

/// Fails on one unit, reports on every other.
pub struct FailsOn {
    pub unit: &'static str,
    pub panic: bool,
}

impl LocalTool for FailsOn {
    fn check_unit(&self, unit: &dyn AnalysisUnit, _ctx: &ToolContext<'_>, sink: &mut ProblemSink) -> Result<(), ToolError> {
        if unit.name() == self.unit {
            if self.panic {
                panic!("tool bug on {}", self.unit);
            }
            return Err(ToolError::failed("fails-on", "cannot analyze"));
        }
        sink.report(Problem::new(unit.path(), "seen"));
        Ok(())
    }
}

/// Collects every event for assertions.
#[derive(Default)]
pub struct RecordingHandler {
    pub started: AtomicUsize,
    pub processed: Mutex<Vec<PathBuf>>,
    pub preempted: AtomicUsize,
    pub resumed: AtomicUsize,
    pub failed: Mutex<Vec<(String, Option<PathBuf>)>>,
    pub completed: Mutex<Option<RunCompletedEvent>>,
    pub aborted: Mutex<Option<RunAbortedEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn processed_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.processed.lock().unwrap().clone();
        paths.sort();
        paths
    }
}

impl EngineEventHandler for RecordingHandler {
    fn on_run_started(&self, _event: &RunStartedEvent) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unit_processed(&self, event: &UnitProcessedEvent) {
        self.processed.lock().unwrap().push(event.path.clone());
    }

    fn on_preempted(&self, _event: &PreemptedEvent) {
        self.preempted.fetch_add(1, Ordering::SeqCst);
    }

    fn on_resumed(&self, _event: &ResumedEvent) {
        self.resumed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tool_failed(&self, event: &ToolFailedEvent) {
        self.failed
            .lock()
            .unwrap()
            .push((event.tool_id.clone(), event.unit.clone()));
    }

    fn on_run_completed(&self, event: &RunCompletedEvent) {
        *self.completed.lock().unwrap() = Some(event.clone());
    }

    fn on_run_aborted(&self, event: &RunAbortedEvent) {
        *self.aborted.lock().unwrap() = Some(event.clone());
    }
}
