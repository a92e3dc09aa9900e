//! # vigil-engine
//!
//! Concurrent analysis orchestration for Vigil.
//!
//! Runs a configured battery of tools over a mutable corpus of units and
//! merges their findings into a per-run presentation store.
//!
//! - `unit`: analysis units, scopes, and unit sources (in-memory, filesystem)
//! - `mutation`: single-writer/many-reader gate with writer preemption
//! - `tools`: tool contracts, descriptors, tool sets, group routing
//! - `presentation`: problem records and the per-tool presentation store
//! - `pipeline`: work queue, scope enumerator, worker pool, preemption
//!   controller, global tool runner, and the `AnalysisEngine` facade

pub mod mutation;
pub mod pipeline;
pub mod presentation;
pub mod tools;
pub mod unit;

pub use mutation::{CorpusGate, MutationGate};
pub use pipeline::{AnalysisEngine, ControllerState, RunSummary};
pub use presentation::{PresentationStore, ProblemRecord};
pub use tools::{ToolDescriptor, ToolId};
pub use unit::{AnalysisScope, AnalysisUnit, UnitRef, UnitSource};
