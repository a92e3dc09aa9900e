//! Cooperative cancellation tokens.
//!
//! A `RunToken` represents one analysis run. Work that must be abandonable
//! independently of the run (a drain attempt that a pending mutation may
//! preempt, the background enumerator) runs under a `DependentToken`.
//! Dependents live in a registry owned by the run token and are cancelled
//! transitively whenever the run token is cancelled. A dependent removes
//! itself from the registry when dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::errors::Cancelled;

/// Anything that can be polled for, and asked for, cooperative cancellation.
pub trait Cancellable {
    /// Check if cancellation has been requested.
    fn is_cancelled(&self) -> bool;

    /// Request cancellation.
    fn cancel(&self);

    /// Checkpoint: returns `Err(Cancelled)` once cancellation was requested.
    fn check_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Why a token was cancelled. The first cause recorded wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelCause {
    /// Cancelled directly by its owner.
    Requested,
    /// Cancelled because the parent run token was cancelled.
    Parent,
    /// Cancelled because a higher-priority mutation became pending.
    Preempted,
}

#[derive(Debug, Default)]
struct TokenState {
    cause: OnceLock<CancelCause>,
    cancelled: AtomicBool,
}

impl TokenState {
    fn cancel_with(&self, cause: CancelCause) {
        // Cause is published before the flag so observers of the flag see it.
        let _ = self.cause.set(cause);
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cause(&self) -> Option<CancelCause> {
        self.cause.get().copied()
    }
}

#[derive(Debug, Default)]
struct DependentRegistry {
    next_id: AtomicU64,
    live: Mutex<FxHashMap<u64, Arc<TokenState>>>,
}

/// Cancellation state of a single analysis run.
#[derive(Debug, Clone, Default)]
pub struct RunToken {
    state: Arc<TokenState>,
    registry: Arc<DependentRegistry>,
}

impl RunToken {
    /// Create a new run token (not cancelled, no dependents).
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a dependent token registered with this run.
    ///
    /// If the run is already cancelled, the dependent starts cancelled.
    pub fn dependent(&self) -> DependentToken {
        let state = Arc::new(TokenState::default());
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut live = self.registry.live.lock().unwrap_or_else(PoisonError::into_inner);
            live.insert(id, Arc::clone(&state));
            if self.state.is_cancelled() {
                state.cancel_with(CancelCause::Parent);
            }
        }
        DependentToken {
            state,
            parent: Arc::clone(&self.state),
            registry: Arc::clone(&self.registry),
            id,
        }
    }

    /// Number of dependents currently registered.
    pub fn live_dependents(&self) -> usize {
        self.registry
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Cancellable for RunToken {
    fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Cancels the run and every dependent live at this instant.
    fn cancel(&self) {
        self.state.cancel_with(CancelCause::Requested);
        let live = self.registry.live.lock().unwrap_or_else(PoisonError::into_inner);
        for dependent in live.values() {
            dependent.cancel_with(CancelCause::Parent);
        }
    }
}

/// A child token registered with a `RunToken`.
///
/// Observes both its own cancellation and the parent's.
#[derive(Debug)]
pub struct DependentToken {
    state: Arc<TokenState>,
    parent: Arc<TokenState>,
    registry: Arc<DependentRegistry>,
    id: u64,
}

impl DependentToken {
    /// Cancel with an explicit cause. A cause already recorded is kept.
    pub fn cancel_with(&self, cause: CancelCause) {
        self.state.cancel_with(cause);
    }

    /// The recorded cancellation cause, if any.
    ///
    /// Reports `Parent` when only the parent was cancelled.
    pub fn cause(&self) -> Option<CancelCause> {
        self.state.cause().or_else(|| {
            self.parent
                .is_cancelled()
                .then_some(CancelCause::Parent)
        })
    }

    /// A cloneable handle that can cancel this token from another thread
    /// (e.g. from a mutation listener).
    pub fn handle(&self) -> TokenHandle {
        TokenHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Cancellable for DependentToken {
    fn is_cancelled(&self) -> bool {
        self.state.is_cancelled() || self.parent.is_cancelled()
    }

    fn cancel(&self) {
        self.state.cancel_with(CancelCause::Requested);
    }
}

impl Drop for DependentToken {
    fn drop(&mut self) {
        self.registry
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Cancel-only handle to a `DependentToken`.
#[derive(Debug, Clone)]
pub struct TokenHandle {
    state: Arc<TokenState>,
}

impl TokenHandle {
    pub fn cancel_with(&self, cause: CancelCause) {
        self.state.cancel_with(cause);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}
