//! `AnalysisEngine`: the run facade.
//!
//! One run: global pass, GlobalSimple start hooks, then the enumerator and
//! worker pool under the preemption controller, then the finish hooks.

use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use vigil_core::config::{RunMode, VigilConfig};
use vigil_core::errors::{Cancelled, EngineError, FatalError, ToolError};
use vigil_core::events::types::{
    RunAbortedEvent, RunCompletedEvent, RunStartedEvent, UnitProcessedEvent,
};
use vigil_core::events::{EngineEventHandler, EventDispatcher};
use vigil_core::traits::{Cancellable, DependentToken, RunToken};
use vigil_core::tracing::metrics;
use vigil_core::types::collections::SmallVec8;

use crate::mutation::{CorpusGate, MutationGate};
use crate::presentation::{PresentationStore, ProblemRecord, TextRange};
use crate::tools::{
    report_failure, run_isolated, ProblemSink, RunExtension, ToolCategory, ToolContext,
    ToolDescriptor, ToolId, ToolKind, ToolSet,
};
use crate::unit::{AnalysisScope, UnitRef, UnitSource};

use super::enumerator::{EnumerationStats, EnumeratorFilter, EnumeratorHandle, ScopeEnumerator, UnitPredicate};
use super::global_runner::GlobalToolRunner;
use super::preemption::{ControllerState, PreemptionController};
use super::processor::process_queue;
use super::queue::{FailedUnits, WorkQueue};

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Controller states entered, in order. A run that skips the unit
    /// pipeline records only `Completed`.
    pub state_trace: Vec<ControllerState>,
    pub units_processed: usize,
    pub units_enumerated: usize,
    pub preemptions: usize,
    pub total_problems: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Global tools whose secondary-pass request was honored.
    pub secondary_requests: Vec<ToolId>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn final_state(&self) -> Option<ControllerState> {
        self.state_trace.last().copied()
    }

    /// Counters keyed by their structured field names.
    pub fn metrics(&self) -> Vec<(&'static str, u64)> {
        vec![
            (metrics::UNITS_PROCESSED, self.units_processed as u64),
            (metrics::UNITS_ENUMERATED, self.units_enumerated as u64),
            (metrics::PREEMPTIONS, self.preemptions as u64),
            (metrics::TOTAL_PROBLEMS, self.total_problems as u64),
            (metrics::WORKERS, self.workers as u64),
            (metrics::QUEUE_CAPACITY, self.queue_capacity as u64),
            (metrics::ELAPSED_MS, self.elapsed.as_millis() as u64),
        ]
    }
}

/// Runs a configured tool set over a unit source.
pub struct AnalysisEngine {
    source: Arc<dyn UnitSource>,
    gate: Arc<dyn MutationGate>,
    config: VigilConfig,
    tools: ToolSet,
    presentations: Arc<PresentationStore>,
    extensions: Vec<Arc<dyn RunExtension>>,
    events: EventDispatcher,
    should_process: Option<UnitPredicate>,
}

/// Builder for `AnalysisEngine`.
pub struct AnalysisEngineBuilder {
    source: Arc<dyn UnitSource>,
    gate: Option<Arc<dyn MutationGate>>,
    config: VigilConfig,
    active: Vec<ToolDescriptor>,
    catalog: Vec<ToolDescriptor>,
    presentations: Option<Arc<PresentationStore>>,
    extensions: Vec<Arc<dyn RunExtension>>,
    events: EventDispatcher,
    should_process: Option<UnitPredicate>,
}

impl AnalysisEngineBuilder {
    /// Mutation gate guarding the source. Defaults to a fresh `CorpusGate`.
    pub fn gate(mut self, gate: Arc<dyn MutationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn config(mut self, config: VigilConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.active.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.active.extend(tools);
        self
    }

    /// All known tools, used to resolve paired batch tools.
    pub fn catalog(mut self, catalog: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.catalog.extend(catalog);
        self
    }

    /// Result store. Defaults to a store with the default presentation factory.
    pub fn presentations(mut self, store: Arc<PresentationStore>) -> Self {
        self.presentations = Some(store);
        self
    }

    pub fn extension(mut self, extension: Arc<dyn RunExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn EngineEventHandler>) -> Self {
        self.events.register(handler);
        self
    }

    pub fn should_process(mut self, predicate: UnitPredicate) -> Self {
        self.should_process = Some(predicate);
        self
    }

    pub fn build(self) -> Result<AnalysisEngine, EngineError> {
        VigilConfig::validate(&self.config)?;
        Ok(AnalysisEngine {
            source: self.source,
            gate: self.gate.unwrap_or_else(|| Arc::new(CorpusGate::new())),
            config: self.config,
            tools: ToolSet::new(self.active, &self.catalog),
            presentations: self.presentations.unwrap_or_default(),
            extensions: self.extensions,
            events: self.events,
            should_process: self.should_process,
        })
    }
}

impl AnalysisEngine {
    pub fn builder(source: Arc<dyn UnitSource>) -> AnalysisEngineBuilder {
        AnalysisEngineBuilder {
            source,
            gate: None,
            config: VigilConfig::default(),
            active: Vec::new(),
            catalog: Vec::new(),
            presentations: None,
            extensions: Vec::new(),
            events: EventDispatcher::new(),
            should_process: None,
        }
    }

    pub fn presentations(&self) -> &Arc<PresentationStore> {
        &self.presentations
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn gate(&self) -> &Arc<dyn MutationGate> {
        &self.gate
    }

    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// Analyze `scope`. Returns once every unit was processed, or with
    /// `EngineError::Cancelled` if `token` was cancelled.
    pub fn run(&self, scope: &AnalysisScope, token: &RunToken) -> Result<RunSummary, EngineError> {
        self.check_thread()?;
        let started = Instant::now();
        let engine = &self.config.engine;
        let workers = engine.effective_workers();
        let queue_capacity = engine.effective_queue_capacity();
        let poll = engine.effective_poll_interval();
        let _span = tracing::info_span!("analysis_run", scope = %scope.short_name(), workers, queue_capacity).entered();

        self.events.emit_run_started(&RunStartedEvent {
            local_tools: self.tools.enabled_count(ToolCategory::Local),
            global_simple_tools: self.tools.enabled_count(ToolCategory::GlobalSimple),
            global_tools: self.tools.enabled_count(ToolCategory::Global),
            workers,
            queue_capacity,
        });

        let mut summary = RunSummary {
            workers,
            queue_capacity,
            ..RunSummary::default()
        };

        let runner = GlobalToolRunner {
            source: self.source.as_ref(),
            gate: self.gate.as_ref(),
            store: &self.presentations,
            groups: &self.tools.groups,
            events: &self.events,
            extensions: &self.extensions,
        };
        match runner.run(&self.tools.global, scope, token) {
            Ok(global) => summary.secondary_requests = global.secondary_requests,
            Err(Cancelled) => return Err(self.aborted("cancelled during global pass", 0)),
        }
        if token.is_cancelled() {
            return Err(self.aborted("cancelled during global pass", 0));
        }

        if engine.effective_global_tools_only() || !self.tools.has_unit_tools() {
            tracing::debug!("no unit pipeline for this run");
            summary.state_trace.push(ControllerState::Completed);
            return Ok(self.finish(summary, started));
        }

        for descriptor in self.global_simple_tools() {
            if let ToolKind::GlobalSimple(tool) = &descriptor.kind {
                let result = run_isolated(&descriptor.id, || {
                    tool.inspection_started(scope);
                    Ok(())
                });
                if let Err(err) = result {
                    report_failure(&self.events, &descriptor.id, None, &err);
                }
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("vigil-worker-{i}"))
            .build()
            .map_err(|e| FatalError::WorkerPool(e.to_string()))?;

        let queue = Arc::new(WorkQueue::new(queue_capacity, poll));
        let failed = FailedUnits::new();
        let mut filter = EnumeratorFilter::from_config(&self.config.scan);
        if let Some(predicate) = &self.should_process {
            filter = filter.with_predicate(Arc::clone(predicate));
        }
        let enumerator = ScopeEnumerator::new(
            Arc::clone(&self.source),
            Arc::clone(&self.gate),
            scope.clone(),
            filter,
        )
        .spawn(Arc::clone(&queue), token.dependent())
        .map_err(|e| FatalError::WorkerPool(format!("failed to spawn enumerator: {e}")))?;

        let processed = AtomicUsize::new(0);
        let mut controller = PreemptionController::new(self.gate.as_ref(), token, &self.events, poll);
        let drained = controller.drive(&failed, |attempt| {
            process_queue(&pool, workers, &queue, &failed, attempt, |unit, t| {
                self.inspect_unit(unit, t, scope, &processed)
            })
        });
        summary.state_trace = controller.trace().to_vec();
        summary.preemptions = controller.preemptions();
        summary.units_processed = processed.load(Ordering::SeqCst);
        let blocked_by_caller = controller.blocked_by_caller();

        let stats = match self.shutdown_enumerator(enumerator, &queue, token) {
            Ok(stats) => stats,
            Err(fatal) => {
                self.emit_aborted(&fatal.to_string(), summary.units_processed);
                return Err(fatal.into());
            }
        };
        summary.units_enumerated = stats.queued;

        if blocked_by_caller {
            let reason = "a pending mutation is blocked by the caller's read snapshot";
            self.emit_aborted(reason, summary.units_processed);
            return Err(EngineError::IllegalState(reason.to_string()));
        }
        if drained.is_err() || token.is_cancelled() {
            return Err(self.aborted("cancelled", summary.units_processed));
        }
        if !queue.sentinel_consumed() {
            return Err(EngineError::IllegalState(
                "drain completed without consuming the queue sentinel".to_string(),
            ));
        }

        for descriptor in self.global_simple_tools() {
            if let ToolKind::GlobalSimple(tool) = &descriptor.kind {
                let mut sink = ProblemSink::new(descriptor.id.clone(), descriptor.severity);
                match run_isolated(&descriptor.id, || tool.inspection_finished(scope, &mut sink)) {
                    Ok(()) => {
                        self.presentations.commit(&self.tools.groups, sink.into_records());
                    }
                    Err(err) => report_failure(&self.events, &descriptor.id, None, &err),
                }
            }
        }

        Ok(self.finish(summary, started))
    }

    fn global_simple_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.global_simple.iter().filter(|t| t.enabled)
    }

    fn check_thread(&self) -> Result<(), EngineError> {
        if self.gate.holds_write() {
            return Err(EngineError::IllegalState(
                "analysis must not start inside a corpus mutation".to_string(),
            ));
        }
        if self.config.engine.effective_run_mode() == RunMode::Interactive && self.gate.holds_read() {
            return Err(EngineError::IllegalState(
                "interactive analysis must not start while holding a read snapshot".to_string(),
            ));
        }
        Ok(())
    }

    /// Process one unit. Problems are buffered and committed only when every
    /// applicable tool finished, so an interrupted unit leaves no trace.
    fn inspect_unit(
        &self,
        unit: &UnitRef,
        token: &DependentToken,
        scope: &AnalysisScope,
        processed: &AtomicUsize,
    ) -> Result<(), Cancelled> {
        token.check_cancelled()?;
        let mut records: SmallVec8<ProblemRecord> = SmallVec8::new();

        let in_scope = self
            .gate
            .try_snapshot(|| -> Result<bool, Cancelled> {
                if !unit.is_valid() || !scope.contains(&**unit) {
                    return Ok(false);
                }
                for descriptor in self.tools.unit_tools().filter(|t| !t.needs_external_pass()) {
                    self.run_unit_tool(descriptor, unit, token, scope, &mut records)?;
                }
                Ok(true)
            })
            .ok_or(Cancelled)??;
        if !in_scope {
            tracing::trace!(unit = %unit.path().display(), "unit no longer valid or in scope");
            return Ok(());
        }

        for descriptor in self.tools.unit_tools().filter(|t| t.needs_external_pass()) {
            self.run_unit_tool(descriptor, unit, token, scope, &mut records)?;
        }

        token.check_cancelled()?;
        self.presentations.commit(&self.tools.groups, records.into_vec());
        let processed = processed.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.emit_unit_processed(&UnitProcessedEvent {
            path: unit.path().to_path_buf(),
            processed,
        });
        Ok(())
    }

    fn run_unit_tool(
        &self,
        descriptor: &ToolDescriptor,
        unit: &UnitRef,
        token: &DependentToken,
        scope: &AnalysisScope,
        records: &mut SmallVec8<ProblemRecord>,
    ) -> Result<(), Cancelled> {
        if !descriptor.applies_to(scope, &**unit) {
            return Ok(());
        }
        token.check_cancelled()?;
        let narrowed = scope.effective_range(unit.path());
        let range = narrowed.unwrap_or_else(|| TextRange::whole(unit.size_bytes()));
        let ctx = ToolContext::new(self.gate.as_ref(), token, descriptor.scope(scope), range);
        let mut sink = ProblemSink::new(descriptor.id.clone(), descriptor.severity);
        let result = run_isolated(&descriptor.id, || match &descriptor.kind {
            ToolKind::Local(tool) => tool.check_unit(&**unit, &ctx, &mut sink),
            ToolKind::GlobalSimple(tool) => tool.check_unit(&**unit, &ctx, &mut sink),
            ToolKind::Global(_) => Ok(()),
        });
        match result {
            Ok(()) => records.extend(
                sink.into_records()
                    .into_iter()
                    .filter(|r| match (narrowed, r.range) {
                        (Some(allowed), Some(found)) => allowed.contains_range(found),
                        _ => true,
                    }),
            ),
            Err(ToolError::Cancelled) if token.is_cancelled() || self.gate.is_mutation_pending() => {
                return Err(Cancelled);
            }
            Err(err) => report_failure(&self.events, &descriptor.id, Some(unit.path()), &err),
        }
        token.check_cancelled()
    }

    /// Stop the enumerator and wait for it, clearing the queue so a blocked
    /// push can complete. Exceeding the shutdown timeout is fatal.
    fn shutdown_enumerator(
        &self,
        enumerator: EnumeratorHandle,
        queue: &WorkQueue,
        token: &RunToken,
    ) -> Result<EnumerationStats, FatalError> {
        enumerator.cancel();
        let timeout = self.config.engine.effective_shutdown_timeout();
        let poll = self.config.engine.effective_poll_interval();
        let deadline = Instant::now() + timeout;
        while !enumerator.is_finished() {
            queue.clear();
            if Instant::now() >= deadline {
                let diagnostics = diagnostics(queue, token, &enumerator);
                tracing::error!(
                    timeout_ms = timeout.as_millis() as u64,
                    diagnostics = %diagnostics,
                    "enumerator did not shut down"
                );
                return Err(FatalError::EnumeratorShutdownTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                    diagnostics,
                });
            }
            thread::sleep(poll);
        }
        queue.clear();
        enumerator.join()
    }

    fn aborted(&self, reason: &str, units_processed: usize) -> EngineError {
        tracing::info!(reason, units_processed, "analysis cancelled");
        self.emit_aborted(reason, units_processed);
        EngineError::Cancelled
    }

    fn emit_aborted(&self, reason: &str, units_processed: usize) {
        self.events.emit_run_aborted(&RunAbortedEvent {
            reason: reason.to_string(),
            units_processed,
        });
    }

    fn finish(&self, mut summary: RunSummary, started: Instant) -> RunSummary {
        summary.elapsed = started.elapsed();
        summary.total_problems = self.presentations.total_problems();
        let has_problems = self.presentations.has_problems();
        tracing::info!(
            elapsed_ms = summary.elapsed.as_millis() as u64,
            units_processed = summary.units_processed,
            total_problems = summary.total_problems,
            preemptions = summary.preemptions,
            "analysis finished"
        );
        if !has_problems {
            tracing::info!("no problems found in {} units", summary.units_processed);
        }
        self.events.emit_run_completed(&RunCompletedEvent {
            units_processed: summary.units_processed,
            total_problems: summary.total_problems,
            has_problems,
            preemptions: summary.preemptions,
            duration_ms: summary.elapsed.as_millis() as u64,
        });
        summary
    }
}

fn diagnostics(queue: &WorkQueue, token: &RunToken, enumerator: &EnumeratorHandle) -> String {
    let current = thread::current();
    format!(
        "queue: {}/{} buffered, sentinel sent={} consumed={}\n\
         live dependent tokens: {}\n\
         enumerator: {:?}\n\
         thread '{}' backtrace:\n{}",
        queue.len(),
        queue.capacity(),
        queue.sentinel_sent(),
        queue.sentinel_consumed(),
        token.live_dependents(),
        enumerator,
        current.name().unwrap_or("<unnamed>"),
        Backtrace::force_capture(),
    )
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("config", &self.config)
            .field("local_tools", &self.tools.local.len())
            .field("global_simple_tools", &self.tools.global_simple.len())
            .field("global_tools", &self.tools.global.len())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
