//! Scope enumerator: background producer feeding the work queue.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vigil_core::config::ScanConfig;
use vigil_core::errors::FatalError;
use vigil_core::traits::{CancelCause, Cancellable, DependentToken, TokenHandle};
use vigil_core::types::FxHashSet;

use crate::mutation::MutationGate;
use crate::tools::isolation::panic_message;
use crate::unit::{AnalysisScope, AnalysisUnit, UnitSource};

use super::queue::WorkQueue;

/// Caller-supplied "should process" predicate.
pub type UnitPredicate = Arc<dyn Fn(&dyn AnalysisUnit) -> bool + Send + Sync>;

/// Filters applied to every enumerated unit before it is queued.
#[derive(Clone)]
pub struct EnumeratorFilter {
    pub max_file_size: u64,
    pub skip_binary: bool,
    pub should_process: Option<UnitPredicate>,
}

impl EnumeratorFilter {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            max_file_size: config.effective_max_file_size(),
            skip_binary: config.effective_skip_binary(),
            should_process: None,
        }
    }

    pub fn with_predicate(mut self, predicate: UnitPredicate) -> Self {
        self.should_process = Some(predicate);
        self
    }

    fn accepts(&self, unit: &dyn AnalysisUnit) -> bool {
        if !unit.is_valid() {
            return false;
        }
        if unit.size_bytes() > self.max_file_size {
            tracing::debug!(unit = %unit.path().display(), size = unit.size_bytes(), "skipping oversized unit");
            return false;
        }
        if self.skip_binary && unit.is_binary() {
            return false;
        }
        self.should_process.as_ref().map_or(true, |p| p(unit))
    }
}

impl Default for EnumeratorFilter {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl std::fmt::Debug for EnumeratorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumeratorFilter")
            .field("max_file_size", &self.max_file_size)
            .field("skip_binary", &self.skip_binary)
            .field("should_process", &self.should_process.is_some())
            .finish()
    }
}

/// Counters reported by a finished enumerator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    /// Units handed to the queue.
    pub queued: usize,
    /// Units rejected by the filter or already visited.
    pub skipped: usize,
    /// Enumeration stopped early because its token was cancelled.
    pub cancelled: bool,
    /// Unit source failure, if any. Units queued before it are still processed.
    pub source_error: Option<String>,
}

/// What the enumerator thread is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorPhase {
    Starting,
    Walking,
    /// Waiting for a pending mutation before filtering a unit.
    AwaitingSnapshot,
    /// Blocked on a full queue.
    Pushing,
    DeliveringSentinel,
    Finished,
}

impl EnumeratorPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Walking,
            2 => Self::AwaitingSnapshot,
            3 => Self::Pushing,
            4 => Self::DeliveringSentinel,
            _ => Self::Finished,
        }
    }
}

/// Live progress shared between the enumerator thread and its handle.
#[derive(Debug, Default)]
struct Progress {
    phase: AtomicU8,
    queued: AtomicUsize,
}

impl Progress {
    fn enter(&self, phase: EnumeratorPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn phase(&self) -> EnumeratorPhase {
        EnumeratorPhase::from_u8(self.phase.load(Ordering::Acquire))
    }
}

/// Walks a unit source on a dedicated thread and feeds the work queue.
pub struct ScopeEnumerator {
    source: Arc<dyn UnitSource>,
    gate: Arc<dyn MutationGate>,
    scope: AnalysisScope,
    filter: EnumeratorFilter,
}

impl ScopeEnumerator {
    pub fn new(
        source: Arc<dyn UnitSource>,
        gate: Arc<dyn MutationGate>,
        scope: AnalysisScope,
        filter: EnumeratorFilter,
    ) -> Self {
        Self {
            source,
            gate,
            scope,
            filter,
        }
    }

    /// Start enumerating. The queue receives exactly one sentinel when the
    /// thread finishes, whether enumeration completed, was cancelled, or failed.
    pub fn spawn(self, queue: Arc<WorkQueue>, token: DependentToken) -> std::io::Result<EnumeratorHandle> {
        let handle = token.handle();
        let progress = Arc::new(Progress::default());
        let shared = Arc::clone(&progress);
        let thread = thread::Builder::new()
            .name("vigil-enumerator".to_string())
            .spawn(move || self.run(&queue, &token, &shared))?;
        Ok(EnumeratorHandle {
            thread: Some(thread),
            token: handle,
            progress,
        })
    }

    fn run(self, queue: &WorkQueue, token: &DependentToken, progress: &Progress) -> EnumerationStats {
        let _sentinel = SentinelGuard { queue, progress };
        let mut stats = EnumerationStats::default();
        let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
        let dedup = self.scope.is_local();
        let gate = self.gate.as_ref();
        let poll = queue.poll_interval();
        progress.enter(EnumeratorPhase::Walking);

        let result = self.source.enumerate(&self.scope, &mut |unit| {
            // Never block on the gate: a pending mutation may itself be
            // waiting on a reader the run cannot release.
            let accepted = loop {
                if token.is_cancelled() {
                    stats.cancelled = true;
                    return false;
                }
                if let Some(accepted) = gate.try_snapshot(|| self.filter.accepts(&*unit)) {
                    break accepted;
                }
                progress.enter(EnumeratorPhase::AwaitingSnapshot);
                gate.wait_for_mutations(poll);
            };
            progress.enter(EnumeratorPhase::Walking);
            if !accepted || (dedup && !visited.insert(unit.path().to_path_buf())) {
                stats.skipped += 1;
                return true;
            }
            // The push may block on a full queue; no snapshot is held here.
            debug_assert!(!gate.holds_read());
            progress.enter(EnumeratorPhase::Pushing);
            let pushed = queue.push(unit, token);
            progress.enter(EnumeratorPhase::Walking);
            match pushed {
                Ok(()) => {
                    stats.queued += 1;
                    progress.queued.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(_) => {
                    stats.cancelled = true;
                    false
                }
            }
        });

        if let Err(err) = result {
            if token.is_cancelled() {
                stats.cancelled = true;
            } else {
                tracing::warn!(error = %err, "unit source failed during enumeration");
                stats.source_error = Some(err.to_string());
            }
        }
        tracing::debug!(
            queued = stats.queued,
            skipped = stats.skipped,
            cancelled = stats.cancelled,
            "enumeration finished"
        );
        stats
    }
}

struct SentinelGuard<'a> {
    queue: &'a WorkQueue,
    progress: &'a Progress,
}

impl Drop for SentinelGuard<'_> {
    fn drop(&mut self) {
        self.progress.enter(EnumeratorPhase::DeliveringSentinel);
        if let Err(err) = self.queue.push_sentinel() {
            tracing::error!(error = %err, "enumerator could not deliver sentinel");
        }
        self.progress.enter(EnumeratorPhase::Finished);
    }
}

/// Owner's handle on a running enumerator.
pub struct EnumeratorHandle {
    thread: Option<JoinHandle<EnumerationStats>>,
    token: TokenHandle,
    progress: Arc<Progress>,
}

impl EnumeratorHandle {
    pub fn cancel(&self) {
        self.token.cancel_with(CancelCause::Requested);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn phase(&self) -> EnumeratorPhase {
        self.progress.phase()
    }

    /// Units handed to the queue so far.
    pub fn queued(&self) -> usize {
        self.progress.queued.load(Ordering::Relaxed)
    }

    /// Wait for the thread. Callers that may be racing a full queue should
    /// wait for `is_finished` first.
    pub fn join(mut self) -> Result<EnumerationStats, FatalError> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|panic| FatalError::EnumeratorPanicked(panic_message(panic.as_ref()))),
            None => Ok(EnumerationStats::default()),
        }
    }
}

impl std::fmt::Debug for EnumeratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumeratorHandle")
            .field("phase", &self.phase())
            .field("queued", &self.queued())
            .field("cancel_requested", &self.token.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
