//! Tool contracts, descriptors, and run-time tool sets.

pub mod context;
pub mod descriptor;
pub mod groups;
pub mod isolation;
pub mod reporter;
pub mod toolset;
pub mod traits;

pub use context::{GlobalContext, ToolContext};
pub use descriptor::{ToolCategory, ToolDescriptor, ToolId, ToolKind};
pub use groups::GroupRegistry;
pub use isolation::{report_failure, run_isolated};
pub use reporter::{Problem, ProblemSink};
pub use toolset::ToolSet;
pub use traits::{GlobalSimpleTool, GlobalTool, LocalTool, RunExtension};
