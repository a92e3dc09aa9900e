//! Preemption and cancellation while the unit pipeline is draining.

mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use common::{config, RecordingHandler};
use vigil_core::errors::{EngineError, ToolError};
use vigil_core::traits::{Cancellable, RunToken};
use vigil_engine::mutation::CorpusGate;
use vigil_engine::pipeline::ControllerState;
use vigil_engine::tools::{LocalTool, Problem, ProblemSink, ToolContext};
use vigil_engine::unit::MemoryCorpus;
use vigil_engine::{AnalysisEngine, AnalysisScope, AnalysisUnit, ToolDescriptor, ToolId};

/// Blocks inside the first unit until cancelled, then behaves normally.
struct BlockOnce {
    target: &'static str,
    blocked: AtomicBool,
    started: Mutex<Option<mpsc::Sender<()>>>,
    calls: AtomicUsize,
}

impl BlockOnce {
    fn new(target: &'static str, started: mpsc::Sender<()>) -> Self {
        Self {
            target,
            blocked: AtomicBool::new(false),
            started: Mutex::new(Some(started)),
            calls: AtomicUsize::new(0),
        }
    }
}

impl LocalTool for BlockOnce {
    fn check_unit(&self, unit: &dyn AnalysisUnit, ctx: &ToolContext<'_>, sink: &mut ProblemSink) -> Result<(), ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if unit.name() == self.target && !self.blocked.swap(true, Ordering::SeqCst) {
            if let Some(tx) = self.started.lock().unwrap().take() {
                let _ = tx.send(());
            }
            let deadline = Instant::now() + Duration::from_secs(10);
            while Instant::now() < deadline {
                ctx.checkpoint()?;
                thread::sleep(Duration::from_millis(1));
            }
            return Err(ToolError::failed("block-once", "never cancelled"));
        }
        sink.report(Problem::new(unit.path(), "checked"));
        Ok(())
    }
}

#[test]
fn test_mutation_preempts_and_drain_resumes() {
    let gate = Arc::new(CorpusGate::new());
    let corpus = Arc::new(MemoryCorpus::with_documents([("u1", "1"), ("u2", "2"), ("u3", "3")]));
    let (tx, rx) = mpsc::channel();
    let tool = Arc::new(BlockOnce::new("u1", tx));
    let events = RecordingHandler::new();
    let engine = Arc::new(
        AnalysisEngine::builder(corpus.clone())
            .config(config(1, 1))
            .gate(gate.clone())
            .tool(ToolDescriptor::local("T", tool.clone()))
            .event_handler(events.clone())
            .build()
            .unwrap(),
    );

    let runner = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || engine.run(&AnalysisScope::Corpus, &RunToken::new()))
    };

    rx.recv_timeout(Duration::from_secs(10)).unwrap();
    gate.write(|| {
        corpus.set_text(std::path::Path::new("u2"), "edited");
    })
    .unwrap();

    let summary = runner.join().unwrap().unwrap();
    assert_eq!(
        summary.state_trace,
        vec![
            ControllerState::Draining,
            ControllerState::Preempted,
            ControllerState::Draining,
            ControllerState::Completed,
        ]
    );
    assert_eq!(summary.preemptions, 1);
    assert_eq!(summary.units_processed, 3);
    assert_eq!(
        events.processed_paths(),
        vec![PathBuf::from("u1"), PathBuf::from("u2"), PathBuf::from("u3")]
    );
    assert_eq!(events.preempted.load(Ordering::SeqCst), 1);
    assert_eq!(events.resumed.load(Ordering::SeqCst), 1);

    let problems = engine.presentations().get(&ToolId::from("T")).unwrap().problems();
    assert_eq!(problems.len(), 3);
    // u1 was attempted twice but reported once.
    assert_eq!(tool.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_outer_cancellation_during_drain_aborts() {
    let corpus = Arc::new(MemoryCorpus::with_documents((0..50).map(|i| (format!("u{i:02}"), "x"))));
    let (tx, rx) = mpsc::channel();
    let events = RecordingHandler::new();
    let engine = Arc::new(
        AnalysisEngine::builder(corpus)
            .config(config(2, 1))
            .tool(ToolDescriptor::local("T", Arc::new(BlockOnce::new("u00", tx))))
            .event_handler(events.clone())
            .build()
            .unwrap(),
    );
    let token = RunToken::new();

    let runner = {
        let engine = Arc::clone(&engine);
        let token = token.clone();
        thread::spawn(move || engine.run(&AnalysisScope::Corpus, &token))
    };

    rx.recv_timeout(Duration::from_secs(10)).unwrap();
    // At least the blocked drain attempt is registered with the run.
    assert!(token.live_dependents() >= 1);
    token.cancel();

    let result = runner.join().unwrap();
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert_eq!(token.live_dependents(), 0);
    assert!(events.aborted.lock().unwrap().is_some());
    assert_eq!(events.preempted.load(Ordering::SeqCst), 0);
}
