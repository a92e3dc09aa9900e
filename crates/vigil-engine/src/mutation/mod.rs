//! Single-writer/many-reader coordination over the corpus.
//!
//! Analysis only ever holds read snapshots. A pending mutation is the
//! trigger for preempting an in-flight drain.

pub mod corpus_gate;
pub mod gate;

pub use corpus_gate::CorpusGate;
pub use gate::{ListenerId, MutationGate, MutationListener, ReadSnapshot};
