//! Per-tool result accumulation.

pub mod accumulator;
pub mod record;
pub mod store;

pub use accumulator::{DefaultPresentation, PresentationFactory, ToolPresentation};
pub use record::{ProblemId, ProblemRecord, Severity, TextRange};
pub use store::{PresentationRegistry, PresentationStore};
