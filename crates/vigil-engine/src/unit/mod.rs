//! Analysis units, scopes, and the sources that enumerate them.

pub mod fs;
pub mod memory;
pub mod scope;
pub mod types;

pub use fs::FsUnitSource;
pub use memory::MemoryCorpus;
pub use scope::{AnalysisScope, ScopeFilter, ToolScope};
pub use types::{looks_binary, AnalysisUnit, UnitRef, UnitSource};
