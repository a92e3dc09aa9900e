//! Concurrency tests for run/dependent token cancellation.

use std::sync::Arc;

use rayon::prelude::*;
use vigil_core::traits::{CancelCause, Cancellable, RunToken};

#[test]
fn test_cancel_cascades_to_all_live_dependents() {
    let run = RunToken::new();
    let dependents: Vec<_> = (0..32).map(|_| run.dependent()).collect();
    assert_eq!(run.live_dependents(), 32);

    run.cancel();

    for dep in &dependents {
        assert!(dep.is_cancelled());
        assert_eq!(dep.cause(), Some(CancelCause::Parent));
    }
}

#[test]
fn test_dependent_cancel_does_not_touch_parent_or_siblings() {
    let run = RunToken::new();
    let a = run.dependent();
    let b = run.dependent();

    a.cancel_with(CancelCause::Preempted);

    assert!(a.is_cancelled());
    assert!(!b.is_cancelled());
    assert!(!run.is_cancelled());
}

#[test]
fn test_concurrent_registration_never_misses_cancellation() {
    for _ in 0..50 {
        let run = Arc::new(RunToken::new());
        let canceller = {
            let run = Arc::clone(&run);
            std::thread::spawn(move || run.cancel())
        };
        let deps: Vec<_> = (0..64).into_par_iter().map(|_| run.dependent()).collect();
        canceller.join().unwrap();
        assert!(deps.iter().all(|d| d.is_cancelled()));
    }
}

#[test]
fn test_handle_cancels_from_other_thread() {
    let run = RunToken::new();
    let dep = run.dependent();
    let handle = dep.handle();
    std::thread::spawn(move || handle.cancel_with(CancelCause::Preempted))
        .join()
        .unwrap();
    assert_eq!(dep.cause(), Some(CancelCause::Preempted));
}
