//! The analysis pipeline.
//!
//! Global tools run first, sequentially. Then the scope enumerator feeds a
//! bounded work queue from a background thread while the preemption
//! controller drives a worker pool over it until the sentinel is consumed.

pub mod engine;
pub mod enumerator;
pub mod global_runner;
pub mod graph;
pub mod preemption;
pub mod processor;
pub mod queue;

pub use engine::{AnalysisEngine, AnalysisEngineBuilder, RunSummary};
pub use enumerator::{EnumerationStats, EnumeratorFilter, EnumeratorHandle, EnumeratorPhase, ScopeEnumerator, UnitPredicate};
pub use global_runner::{GlobalPassOutcome, GlobalToolRunner};
pub use graph::DeclarationGraph;
pub use preemption::{ControllerState, PreemptionController};
pub use processor::process_queue;
pub use queue::{FailedUnits, Popped, WorkQueue};
