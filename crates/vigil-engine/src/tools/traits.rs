//! Tool contracts, one per category.
//!
//! Tools report through a `ProblemSink`; nothing they report reaches the
//! presentation store until the engine commits it. A tool that returns
//! `ToolError::Cancelled` because its context checkpoint fired has its unit
//! retried.

use vigil_core::errors::ToolError;

use crate::tools::{GlobalContext, ProblemSink, ToolContext, ToolId};
use crate::unit::{AnalysisScope, AnalysisUnit, ToolScope};

/// Per-unit tool with no cross-unit state.
pub trait LocalTool: Send + Sync {
    fn check_unit(
        &self,
        unit: &dyn AnalysisUnit,
        ctx: &ToolContext<'_>,
        sink: &mut ProblemSink,
    ) -> Result<(), ToolError>;

    /// Run outside the unit's read snapshot (the tool performs its own
    /// lookups, taking snapshots through the context).
    fn needs_external_pass(&self) -> bool {
        false
    }
}

/// Per-unit tool with run-level lifecycle hooks.
pub trait GlobalSimpleTool: Send + Sync {
    /// Called once before any unit is processed.
    fn inspection_started(&self, _scope: &AnalysisScope) {}

    fn check_unit(
        &self,
        unit: &dyn AnalysisUnit,
        ctx: &ToolContext<'_>,
        sink: &mut ProblemSink,
    ) -> Result<(), ToolError>;

    /// Called once after the run completes. May report further problems.
    fn inspection_finished(&self, _scope: &AnalysisScope, _sink: &mut ProblemSink) -> Result<(), ToolError> {
        Ok(())
    }

    fn needs_external_pass(&self) -> bool {
        false
    }
}

/// Whole-scope tool, run sequentially before the unit pipeline.
pub trait GlobalTool: Send + Sync {
    fn run(
        &self,
        scope: &ToolScope<'_>,
        ctx: &GlobalContext<'_>,
        sink: &mut ProblemSink,
    ) -> Result<(), ToolError>;

    /// Whether the shared declaration graph must be built before this tool runs.
    fn needs_graph(&self) -> bool {
        false
    }

    /// Whether this tool wants an external-usage search after the first pass.
    fn requests_secondary_pass(&self, _ctx: &GlobalContext<'_>) -> bool {
        false
    }

    /// Whether this tool has follow-up work regardless of scope breadth.
    fn has_additional_jobs(&self) -> bool {
        false
    }
}

/// Hook run once after the global pass with every tool that requested a
/// secondary pass.
pub trait RunExtension: Send + Sync {
    fn name(&self) -> &str;

    fn post_run(&self, tools: &[ToolId], ctx: &GlobalContext<'_>) -> Result<(), ToolError>;
}
