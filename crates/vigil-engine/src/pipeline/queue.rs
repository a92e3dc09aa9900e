//! Bounded work queue with a single terminal sentinel.
//!
//! Producers block when the queue is full, consumers when it is empty. Both
//! sides poll so cancellation is observed within one poll interval. Exactly
//! one sentinel may be pushed; the worker that pops it marks the queue
//! exhausted and every other worker observes exhaustion through the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use vigil_core::errors::{Cancelled, FatalError};
use vigil_core::traits::Cancellable;

use crate::unit::UnitRef;

enum QueueItem {
    Unit(UnitRef),
    Sentinel,
}

/// Result of a pop.
#[derive(Debug)]
pub enum Popped {
    Unit(UnitRef),
    /// The sentinel has been consumed; no more units will arrive.
    Exhausted,
}

#[derive(Debug)]
pub struct WorkQueue {
    tx: Sender<QueueItem>,
    rx: Receiver<QueueItem>,
    capacity: usize,
    poll: Duration,
    sentinel_sent: AtomicBool,
    sentinel_consumed: AtomicBool,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit(u) => write!(f, "Unit({})", u.path().display()),
            Self::Sentinel => f.write_str("Sentinel"),
        }
    }
}

impl WorkQueue {
    /// Capacity is clamped to at least one slot.
    pub fn new(capacity: usize, poll: Duration) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            poll,
            sentinel_sent: AtomicBool::new(false),
            sentinel_consumed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Granularity at which blocked pushes and pops re-check cancellation.
    pub fn poll_interval(&self) -> Duration {
        self.poll
    }

    /// Buffered items, sentinel included.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Push a unit, blocking while the queue is full.
    pub fn push(&self, unit: UnitRef, token: &dyn Cancellable) -> Result<(), Cancelled> {
        let mut item = QueueItem::Unit(unit);
        loop {
            token.check_cancelled()?;
            match self.tx.send_timeout(item, self.poll) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => item = back,
                // Both ends are owned by the queue.
                Err(SendTimeoutError::Disconnected(_)) => return Err(Cancelled),
            }
        }
    }

    /// Push the sentinel. Blocks until there is room; the shutdown path
    /// clears the queue to make room when no consumer is running.
    pub fn push_sentinel(&self) -> Result<(), FatalError> {
        if self.sentinel_sent.swap(true, Ordering::SeqCst) {
            return Err(FatalError::DoubleSentinel);
        }
        let mut item = QueueItem::Sentinel;
        loop {
            match self.tx.send_timeout(item, self.poll) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => item = back,
                Err(SendTimeoutError::Disconnected(_)) => return Ok(()),
            }
        }
    }

    /// Pop the next unit, blocking while the queue is empty.
    pub fn pop(&self, token: &dyn Cancellable) -> Result<Popped, Cancelled> {
        loop {
            token.check_cancelled()?;
            if self.sentinel_consumed.load(Ordering::Acquire) && self.rx.is_empty() {
                return Ok(Popped::Exhausted);
            }
            match self.rx.recv_timeout(self.poll) {
                Ok(QueueItem::Unit(unit)) => return Ok(Popped::Unit(unit)),
                Ok(QueueItem::Sentinel) => {
                    self.consume_sentinel();
                    return Ok(Popped::Exhausted);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Ok(Popped::Exhausted),
            }
        }
    }

    /// Drop every buffered unit so a blocked producer can finish. Returns
    /// the number of units dropped.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        while let Ok(item) = self.rx.try_recv() {
            match item {
                QueueItem::Unit(_) => dropped += 1,
                QueueItem::Sentinel => self.consume_sentinel(),
            }
        }
        dropped
    }

    pub fn sentinel_sent(&self) -> bool {
        self.sentinel_sent.load(Ordering::Acquire)
    }

    pub fn sentinel_consumed(&self) -> bool {
        self.sentinel_consumed.load(Ordering::Acquire)
    }

    fn consume_sentinel(&self) {
        let already = self.sentinel_consumed.swap(true, Ordering::AcqRel);
        if already {
            tracing::error!("queue sentinel consumed twice");
        }
    }
}

/// Units abandoned mid-processing, retried before the queue on the next
/// drain attempt.
#[derive(Debug)]
pub struct FailedUnits {
    tx: Sender<UnitRef>,
    rx: Receiver<UnitRef>,
}

impl FailedUnits {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, unit: UnitRef) {
        // Both ends are owned here, so the send cannot fail.
        let _ = self.tx.send(unit);
    }

    pub fn pop(&self) -> Option<UnitRef> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for FailedUnits {
    fn default() -> Self {
        Self::new()
    }
}
