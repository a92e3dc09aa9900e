//! `CorpusGate`: the in-process mutation gate.
//!
//! Writers announce themselves (bumping the pending count and firing
//! listeners) before they queue for the write lock, so in-flight readers
//! get the chance to abandon work instead of blocking the mutation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError, RwLock, TryLockError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use vigil_core::errors::EngineError;
use vigil_core::types::FxHashMap;

use super::gate::{ListenerId, MutationGate, MutationListener, ReadSnapshot};

/// Read/write gate over an in-process corpus.
///
/// Read snapshots are re-entrant per thread. Mutations are not re-entrant
/// and must not be requested by a thread holding a read snapshot.
#[derive(Default)]
pub struct CorpusGate {
    lock: RwLock<()>,
    pending: AtomicUsize,
    idle: Mutex<()>,
    idle_cv: Condvar,
    next_listener: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, MutationListener)>>,
    readers: Mutex<FxHashMap<ThreadId, usize>>,
    writer: Mutex<Option<ThreadId>>,
}

impl CorpusGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as a mutation.
    ///
    /// Marks a mutation pending, notifies listeners, then waits for all
    /// readers to release before running `f` exclusively.
    pub fn write<R>(&self, f: impl FnOnce() -> R) -> Result<R, EngineError> {
        if self.holds_read() {
            return Err(EngineError::IllegalState(
                "mutation requested while holding a read snapshot".to_string(),
            ));
        }
        if self.holds_write() {
            return Err(EngineError::IllegalState(
                "nested mutation requested".to_string(),
            ));
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        let _pending = PendingMark { gate: self };
        self.fire_listeners();

        let _lock = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let _writer = WriterMark::enter(self);
        tracing::trace!("mutation running");
        Ok(f())
    }

    fn fire_listeners(&self) {
        let listeners: Vec<MutationListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn reader_depth(&self) -> usize {
        self.readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&thread::current().id())
            .copied()
            .unwrap_or(0)
    }
}

impl MutationGate for CorpusGate {
    fn is_mutation_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    fn subscribe(&self, listener: MutationListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id);
    }

    fn wait_for_mutations(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if !self.is_mutation_pending() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .idle_cv
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn try_read(&self) -> Option<ReadSnapshot<'_>> {
        if self.is_mutation_pending() {
            return None;
        }
        if self.reader_depth() > 0 {
            return Some(ReadSnapshot::new(ReaderMark::enter(self)));
        }
        let guard = match self.lock.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        // A writer may have announced itself between the check and the lock.
        if self.is_mutation_pending() {
            return None;
        }
        Some(ReadSnapshot::new((guard, ReaderMark::enter(self))))
    }

    fn read(&self) -> ReadSnapshot<'_> {
        if self.reader_depth() > 0 {
            return ReadSnapshot::new(ReaderMark::enter(self));
        }
        let guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        ReadSnapshot::new((guard, ReaderMark::enter(self)))
    }

    fn holds_read(&self) -> bool {
        self.reader_depth() > 0
    }

    fn holds_write(&self) -> bool {
        *self.writer.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread::current().id())
    }
}

impl std::fmt::Debug for CorpusGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusGate")
            .field("pending", &self.pending.load(Ordering::Relaxed))
            .finish()
    }
}

struct PendingMark<'a> {
    gate: &'a CorpusGate,
}

impl Drop for PendingMark<'_> {
    fn drop(&mut self) {
        self.gate.pending.fetch_sub(1, Ordering::SeqCst);
        let _idle = self.gate.idle.lock().unwrap_or_else(PoisonError::into_inner);
        self.gate.idle_cv.notify_all();
    }
}

struct WriterMark<'a> {
    gate: &'a CorpusGate,
}

impl<'a> WriterMark<'a> {
    fn enter(gate: &'a CorpusGate) -> Self {
        *gate.writer.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        Self { gate }
    }
}

impl Drop for WriterMark<'_> {
    fn drop(&mut self) {
        *self.gate.writer.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

struct ReaderMark<'a> {
    gate: &'a CorpusGate,
    thread: ThreadId,
}

impl<'a> ReaderMark<'a> {
    fn enter(gate: &'a CorpusGate) -> Self {
        let thread = thread::current().id();
        *gate
            .readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread)
            .or_insert(0) += 1;
        Self { gate, thread }
    }
}

impl Drop for ReaderMark<'_> {
    fn drop(&mut self) {
        let mut readers = self.gate.readers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(depth) = readers.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                readers.remove(&self.thread);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn read_snapshots_are_reentrant() {
        let gate = CorpusGate::new();
        let outer = gate.read();
        assert!(gate.holds_read());
        let inner = gate.try_read();
        assert!(inner.is_some());
        drop(inner);
        assert!(gate.holds_read());
        drop(outer);
        assert!(!gate.holds_read());
    }

    #[test]
    fn write_while_reading_is_rejected() {
        let gate = CorpusGate::new();
        let _snapshot = gate.read();
        assert!(matches!(gate.write(|| ()), Err(EngineError::IllegalState(_))));
    }

    #[test]
    fn listeners_fire_before_the_write_runs() {
        let gate = CorpusGate::new();
        let fired = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&fired);
        let id = gate.subscribe(Arc::new(move || seen.store(true, Ordering::SeqCst)));
        let observed = gate
            .write(|| fired.load(Ordering::SeqCst))
            .unwrap();
        assert!(observed);
        assert!(!gate.is_mutation_pending());

        gate.unsubscribe(id);
        fired.store(false, Ordering::SeqCst);
        gate.write(|| ()).unwrap();
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn holds_write_only_inside_mutation() {
        let gate = CorpusGate::new();
        assert!(!gate.holds_write());
        assert!(gate.write(|| gate.holds_write()).unwrap());
        assert!(!gate.holds_write());
    }

    #[test]
    fn try_read_refuses_while_mutation_pending() {
        let gate = Arc::new(CorpusGate::new());
        let snapshot = gate.read();
        let writer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.write(|| ()).unwrap())
        };
        while !gate.is_mutation_pending() {
            thread::yield_now();
        }
        let other = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.try_read().is_none())
        };
        assert!(other.join().unwrap());
        assert!(!gate.wait_for_mutations(Duration::from_millis(20)));
        drop(snapshot);
        writer.join().unwrap();
        assert!(gate.wait_for_mutations(Duration::from_secs(5)));
    }
}
