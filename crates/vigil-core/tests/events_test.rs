//! Tests for the engine event system.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vigil_core::events::dispatcher::EventDispatcher;
use vigil_core::events::handler::EngineEventHandler;
use vigil_core::events::types::*;

#[derive(Default)]
struct CountingHandler {
    processed: AtomicUsize,
    preempted: AtomicUsize,
    failed: AtomicUsize,
}

impl EngineEventHandler for CountingHandler {
    fn on_unit_processed(&self, _event: &UnitProcessedEvent) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_preempted(&self, _event: &PreemptedEvent) {
        self.preempted.fetch_add(1, Ordering::Relaxed);
    }

    fn on_tool_failed(&self, _event: &ToolFailedEvent) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

struct PanickingHandler;

impl EngineEventHandler for PanickingHandler {
    fn on_unit_processed(&self, _event: &UnitProcessedEvent) {
        panic!("handler bug");
    }
}

#[test]
fn test_handler_noop_defaults() {
    struct NoopHandler;
    impl EngineEventHandler for NoopHandler {}

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(NoopHandler));
    dispatcher.emit_run_completed(&RunCompletedEvent {
        units_processed: 0,
        total_problems: 0,
        has_problems: false,
        preemptions: 0,
        duration_ms: 0,
    });
    assert_eq!(dispatcher.handler_count(), 1);
}

#[test]
fn test_dispatch_reaches_every_handler() {
    let a = Arc::new(CountingHandler::default());
    let b = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(a.clone());
    dispatcher.register(b.clone());

    dispatcher.emit_unit_processed(&UnitProcessedEvent {
        path: PathBuf::from("a.txt"),
        processed: 1,
    });
    dispatcher.emit_preempted(&PreemptedEvent {
        attempt: 1,
        pending_failed_units: 0,
    });

    for h in [&a, &b] {
        assert_eq!(h.processed.load(Ordering::Relaxed), 1);
        assert_eq!(h.preempted.load(Ordering::Relaxed), 1);
        assert_eq!(h.failed.load(Ordering::Relaxed), 0);
    }
}

#[test]
fn test_panicking_handler_does_not_block_others() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(PanickingHandler));
    dispatcher.register(counter.clone());

    dispatcher.emit_unit_processed(&UnitProcessedEvent {
        path: PathBuf::from("b.txt"),
        processed: 2,
    });

    assert_eq!(counter.processed.load(Ordering::Relaxed), 1);
}
