//! Tool identity and configured tool instances.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vigil_core::types::collections::SmallVec2;

use crate::presentation::Severity;
use crate::unit::{AnalysisScope, AnalysisUnit, ScopeFilter, ToolScope};

use super::traits::{GlobalSimpleTool, GlobalTool, LocalTool};

/// Short identity of a tool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ToolId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&ToolId> for ToolId {
    fn from(id: &ToolId) -> Self {
        id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    /// Per-unit, cheap.
    Local,
    /// Per-unit, needs run context and lifecycle hooks.
    GlobalSimple,
    /// Whole-scope, may need the declaration graph.
    Global,
}

/// The tool implementation, tagged by category.
#[derive(Clone)]
pub enum ToolKind {
    Local(Arc<dyn LocalTool>),
    GlobalSimple(Arc<dyn GlobalSimpleTool>),
    Global(Arc<dyn GlobalTool>),
}

impl ToolKind {
    pub fn category(&self) -> ToolCategory {
        match self {
            Self::Local(_) => ToolCategory::Local,
            Self::GlobalSimple(_) => ToolCategory::GlobalSimple,
            Self::Global(_) => ToolCategory::Global,
        }
    }
}

impl fmt::Debug for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.category())
    }
}

/// One configured tool instance. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub enabled: bool,
    pub severity: Severity,
    /// Restricts the tool to matching units. `None` means the whole run scope.
    pub sub_scope: Option<ScopeFilter>,
    pub kind: ToolKind,
    /// Extra group tags this tool claims, beyond its own id.
    pub groups: SmallVec2<String>,
    /// Batch counterpart added to the run alongside this tool.
    pub paired_batch_tool: Option<ToolId>,
}

impl ToolDescriptor {
    fn with_kind(id: impl Into<ToolId>, kind: ToolKind) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            severity: Severity::default(),
            sub_scope: None,
            kind,
            groups: SmallVec2::new(),
            paired_batch_tool: None,
        }
    }

    pub fn local(id: impl Into<ToolId>, tool: Arc<dyn LocalTool>) -> Self {
        Self::with_kind(id, ToolKind::Local(tool))
    }

    pub fn global_simple(id: impl Into<ToolId>, tool: Arc<dyn GlobalSimpleTool>) -> Self {
        Self::with_kind(id, ToolKind::GlobalSimple(tool))
    }

    pub fn global(id: impl Into<ToolId>, tool: Arc<dyn GlobalTool>) -> Self {
        Self::with_kind(id, ToolKind::Global(tool))
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_sub_scope(mut self, filter: ScopeFilter) -> Self {
        self.sub_scope = Some(filter);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn paired_with(mut self, batch_tool: impl Into<ToolId>) -> Self {
        self.paired_batch_tool = Some(batch_tool.into());
        self
    }

    pub fn category(&self) -> ToolCategory {
        self.kind.category()
    }

    /// The run scope narrowed to this tool's sub-scope.
    pub fn scope<'a>(&'a self, run: &'a AnalysisScope) -> ToolScope<'a> {
        ToolScope::new(run, self.sub_scope.as_ref())
    }

    /// Enabled and in scope for `unit`.
    pub fn applies_to(&self, run: &AnalysisScope, unit: &dyn AnalysisUnit) -> bool {
        self.enabled && self.scope(run).contains(unit)
    }

    pub(crate) fn needs_external_pass(&self) -> bool {
        match &self.kind {
            ToolKind::Local(t) => t.needs_external_pass(),
            ToolKind::GlobalSimple(t) => t.needs_external_pass(),
            ToolKind::Global(_) => false,
        }
    }
}
