//! Partitioning of the configured tools for one run.

use vigil_core::types::FxHashSet;

use super::descriptor::{ToolCategory, ToolDescriptor, ToolId};
use super::groups::GroupRegistry;

/// The tools of one run, split by category, plus group ownership.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    pub local: Vec<ToolDescriptor>,
    pub global_simple: Vec<ToolDescriptor>,
    pub global: Vec<ToolDescriptor>,
    pub groups: GroupRegistry,
}

impl ToolSet {
    /// Build the run's tool set from the active tools.
    ///
    /// A tool with a paired batch counterpart pulls that counterpart in from
    /// `catalog` when it is not already active; the counterpart inherits the
    /// pairing tool's enablement, severity and sub-scope. Groups are claimed
    /// in list order.
    pub fn new(active: Vec<ToolDescriptor>, catalog: &[ToolDescriptor]) -> Self {
        let mut ids: FxHashSet<ToolId> = active.iter().map(|t| t.id.clone()).collect();
        let mut tools = Vec::with_capacity(active.len());

        for tool in active {
            let paired = tool
                .paired_batch_tool
                .as_ref()
                .filter(|id| !ids.contains(*id))
                .and_then(|id| catalog.iter().find(|c| &c.id == id))
                .map(|counterpart| {
                    let mut batch = counterpart.clone();
                    batch.enabled = tool.enabled;
                    batch.severity = tool.severity;
                    batch.sub_scope = tool.sub_scope.clone();
                    batch
                });
            tools.push(tool);
            if let Some(batch) = paired {
                tracing::debug!(tool = %batch.id, "adding paired batch tool");
                ids.insert(batch.id.clone());
                tools.push(batch);
            }
        }

        let mut set = ToolSet::default();
        for tool in tools {
            set.groups.register(tool.id.as_str(), &tool.id);
            for group in &tool.groups {
                set.groups.register(group.as_str(), &tool.id);
            }
            match tool.category() {
                ToolCategory::Local => set.local.push(tool),
                ToolCategory::GlobalSimple => set.global_simple.push(tool),
                ToolCategory::Global => set.global.push(tool),
            }
        }
        set
    }

    /// Tools that run per unit through the queue pipeline.
    pub fn unit_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.local.iter().chain(self.global_simple.iter())
    }

    pub fn has_unit_tools(&self) -> bool {
        self.unit_tools().any(|t| t.enabled)
    }

    pub fn enabled_count(&self, category: ToolCategory) -> usize {
        let tools = match category {
            ToolCategory::Local => &self.local,
            ToolCategory::GlobalSimple => &self.global_simple,
            ToolCategory::Global => &self.global,
        };
        tools.iter().filter(|t| t.enabled).count()
    }

    pub fn find(&self, id: &ToolId) -> Option<&ToolDescriptor> {
        self.local
            .iter()
            .chain(&self.global_simple)
            .chain(&self.global)
            .find(|t| &t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::Severity;
    use crate::tools::{GlobalContext, LocalTool, ProblemSink, ToolContext};
    use crate::tools::traits::GlobalTool;
    use crate::unit::{AnalysisUnit, ScopeFilter, ToolScope};
    use std::sync::Arc;
    use vigil_core::errors::ToolError;

    struct Nop;

    impl LocalTool for Nop {
        fn check_unit(&self, _: &dyn AnalysisUnit, _: &ToolContext<'_>, _: &mut ProblemSink) -> Result<(), ToolError> {
            Ok(())
        }
    }

    impl GlobalTool for Nop {
        fn run(&self, _: &ToolScope<'_>, _: &GlobalContext<'_>, _: &mut ProblemSink) -> Result<(), ToolError> {
            Ok(())
        }
    }

    #[test]
    fn paired_batch_tool_inherits_configuration() {
        let filter = ScopeFilter::new(["*.rs"]).unwrap();
        let local = ToolDescriptor::local("unused", Arc::new(Nop))
            .with_severity(Severity::Error)
            .with_sub_scope(filter)
            .paired_with("unused-batch");
        let catalog = vec![ToolDescriptor::global("unused-batch", Arc::new(Nop))];

        let set = ToolSet::new(vec![local], &catalog);
        assert_eq!(set.local.len(), 1);
        assert_eq!(set.global.len(), 1);
        let batch = &set.global[0];
        assert_eq!(batch.severity, Severity::Error);
        assert!(batch.sub_scope.is_some());
        assert_eq!(set.groups.owner("unused-batch"), Some(&ToolId::from("unused-batch")));
    }

    #[test]
    fn active_counterpart_is_not_duplicated() {
        let local = ToolDescriptor::local("l", Arc::new(Nop)).paired_with("g");
        let global = ToolDescriptor::global("g", Arc::new(Nop)).disabled();
        let catalog = vec![ToolDescriptor::global("g", Arc::new(Nop))];

        let set = ToolSet::new(vec![local, global], &catalog);
        assert_eq!(set.global.len(), 1);
        assert!(!set.global[0].enabled);
        assert_eq!(set.enabled_count(ToolCategory::Global), 0);
    }

    #[test]
    fn extra_groups_follow_list_order() {
        let a = ToolDescriptor::local("a", Arc::new(Nop)).with_group("shared");
        let b = ToolDescriptor::local("b", Arc::new(Nop)).with_group("shared");
        let set = ToolSet::new(vec![a, b], &[]);
        assert_eq!(set.groups.owner("shared"), Some(&ToolId::from("a")));
        assert!(set.has_unit_tools());
        assert!(set.find(&ToolId::from("b")).is_some());
    }
}
