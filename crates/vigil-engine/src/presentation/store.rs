//! `PresentationStore`: concurrent map from tool identity to presentation.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use vigil_core::types::FxHashMap;

use crate::tools::{GroupRegistry, ToolId};

use super::accumulator::{DefaultPresentation, PresentationFactory, ToolPresentation};
use super::record::ProblemRecord;

/// Maps tool ids to presentation constructors, resolved at configuration
/// time. Tools without an entry use the default factory.
#[derive(Clone)]
pub struct PresentationRegistry {
    default: PresentationFactory,
    by_tool: FxHashMap<ToolId, PresentationFactory>,
}

impl PresentationRegistry {
    pub fn new() -> Self {
        Self {
            default: DefaultPresentation::factory(),
            by_tool: FxHashMap::default(),
        }
    }

    pub fn with_default(mut self, factory: PresentationFactory) -> Self {
        self.default = factory;
        self
    }

    pub fn register(&mut self, tool: impl Into<ToolId>, factory: PresentationFactory) {
        self.by_tool.insert(tool.into(), factory);
    }

    pub fn factory_for(&self, tool: &ToolId) -> &PresentationFactory {
        self.by_tool.get(tool).unwrap_or(&self.default)
    }
}

impl Default for PresentationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresentationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationRegistry")
            .field("custom_factories", &self.by_tool.len())
            .finish()
    }
}

/// Thread-safe store of one presentation per tool per run.
///
/// Presentations are created lazily, exactly once, and never replaced.
/// Only the caller clears the store.
pub struct PresentationStore {
    registry: PresentationRegistry,
    presentations: DashMap<ToolId, Arc<dyn ToolPresentation>>,
}

impl PresentationStore {
    pub fn new(registry: PresentationRegistry) -> Self {
        Self {
            registry,
            presentations: DashMap::new(),
        }
    }

    /// Get the presentation for `tool`, constructing it on first use.
    ///
    /// The entry lock is held during construction, so concurrent callers
    /// never build two presentations for one tool.
    pub fn presentation(&self, tool: &ToolId) -> Arc<dyn ToolPresentation> {
        if let Some(existing) = self.presentations.get(tool) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .presentations
            .entry(tool.clone())
            .or_insert_with(|| (self.registry.factory_for(tool))(tool));
        Arc::clone(entry.value())
    }

    /// The presentation for `tool` if one was created.
    pub fn get(&self, tool: &ToolId) -> Option<Arc<dyn ToolPresentation>> {
        self.presentations.get(tool).map(|p| Arc::clone(p.value()))
    }

    /// Route records to their owning presentations. Returns how many were new.
    pub fn commit(&self, groups: &GroupRegistry, records: Vec<ProblemRecord>) -> usize {
        let mut added = 0;
        for record in records {
            let owner = groups.resolve(record.group.as_deref(), &record.tool).clone();
            if self.presentation(&owner).add_problem(record) {
                added += 1;
            }
        }
        added
    }

    pub fn total_problems(&self) -> usize {
        self.presentations.iter().map(|p| p.problem_count()).sum()
    }

    pub fn has_problems(&self) -> bool {
        self.presentations.iter().any(|p| p.has_problems())
    }

    pub fn tool_ids(&self) -> Vec<ToolId> {
        let mut ids: Vec<ToolId> = self.presentations.iter().map(|p| p.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Problems per tool, ordered by tool id.
    pub fn snapshot(&self) -> BTreeMap<ToolId, Vec<ProblemRecord>> {
        self.presentations
            .iter()
            .map(|p| (p.key().clone(), p.problems()))
            .collect()
    }

    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Drop every presentation. Only valid between runs.
    pub fn clear(&self) {
        self.presentations.clear();
    }
}

impl Default for PresentationStore {
    fn default() -> Self {
        Self::new(PresentationRegistry::new())
    }
}

impl std::fmt::Debug for PresentationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationStore")
            .field("presentations", &self.presentations.len())
            .finish()
    }
}
