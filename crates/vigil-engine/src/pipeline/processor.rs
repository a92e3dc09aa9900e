//! Worker pool draining the work queue.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPool;
use vigil_core::errors::Cancelled;
use vigil_core::traits::{Cancellable, DependentToken};

use crate::unit::UnitRef;

use super::queue::{FailedUnits, Popped, WorkQueue};

/// Drain `queue` with `workers` parallel workers until the sentinel is
/// consumed or `token` is cancelled.
///
/// Units left over from an earlier interrupted attempt (`failed`) are taken
/// first. A unit whose processing is cancelled goes back to `failed` and
/// the drain reports `Cancelled`; the caller decides whether to retry.
pub fn process_queue<F>(
    pool: &ThreadPool,
    workers: usize,
    queue: &WorkQueue,
    failed: &FailedUnits,
    token: &DependentToken,
    process: F,
) -> Result<(), Cancelled>
where
    F: Fn(&UnitRef, &DependentToken) -> Result<(), Cancelled> + Sync,
{
    let interrupted = AtomicBool::new(false);
    let process = &process;
    let interrupted_ref = &interrupted;

    pool.scope(|s| {
        for _ in 0..workers.max(1) {
            s.spawn(move |_| {
                if drain(queue, failed, token, process).is_err() {
                    interrupted_ref.store(true, Ordering::SeqCst);
                }
            });
        }
    });

    if interrupted.load(Ordering::SeqCst) || token.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}

fn drain<F>(
    queue: &WorkQueue,
    failed: &FailedUnits,
    token: &DependentToken,
    process: &F,
) -> Result<(), Cancelled>
where
    F: Fn(&UnitRef, &DependentToken) -> Result<(), Cancelled> + Sync,
{
    loop {
        token.check_cancelled()?;
        let unit = match failed.pop() {
            Some(unit) => unit,
            None => match queue.pop(token)? {
                Popped::Unit(unit) => unit,
                Popped::Exhausted => return Ok(()),
            },
        };
        if let Err(cancelled) = process(&unit, token) {
            tracing::trace!(unit = %unit.path().display(), "unit interrupted, requeued for retry");
            failed.push(unit);
            return Err(cancelled);
        }
    }
}
