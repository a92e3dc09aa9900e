//! The mutation gate contract.

use std::sync::Arc;
use std::time::Duration;

/// Callback fired when a mutation becomes pending, before it waits for
/// readers to leave. Runs on the mutating thread and must not block.
pub type MutationListener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by `MutationGate::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Marker trait letting any guard type back a `ReadSnapshot`.
pub trait SnapshotHold {}

impl<T> SnapshotHold for T {}

/// A held read snapshot. The corpus cannot be mutated while it is alive.
///
/// Released on drop, on the thread that acquired it.
pub struct ReadSnapshot<'a> {
    _held: Box<dyn SnapshotHold + 'a>,
}

impl<'a> ReadSnapshot<'a> {
    pub fn new<G: 'a>(guard: G) -> Self {
        Self {
            _held: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for ReadSnapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReadSnapshot")
    }
}

/// Coordination point between analysis readers and corpus mutations.
pub trait MutationGate: Send + Sync {
    /// True while at least one mutation is requested or running.
    fn is_mutation_pending(&self) -> bool;

    /// Register a listener fired whenever a mutation becomes pending.
    fn subscribe(&self, listener: MutationListener) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);

    /// Block until no mutation is pending or `timeout` elapses.
    /// Returns true if the corpus is idle.
    fn wait_for_mutations(&self, timeout: Duration) -> bool;

    /// Acquire a read snapshot unless a mutation is pending.
    fn try_read(&self) -> Option<ReadSnapshot<'_>>;

    /// Acquire a read snapshot, waiting for pending mutations to finish.
    fn read(&self) -> ReadSnapshot<'_>;

    /// Whether the current thread holds a read snapshot.
    fn holds_read(&self) -> bool;

    /// Whether the current thread is inside a mutation.
    fn holds_write(&self) -> bool;
}

impl dyn MutationGate + '_ {
    /// Run `f` under a read snapshot, or return `None` if a mutation is pending.
    pub fn try_snapshot<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _snapshot = self.try_read()?;
        Some(f())
    }

    /// Run `f` under a read snapshot.
    pub fn snapshot<R>(&self, f: impl FnOnce() -> R) -> R {
        let _snapshot = self.read();
        f()
    }
}
