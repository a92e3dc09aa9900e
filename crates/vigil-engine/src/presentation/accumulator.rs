//! Per-tool accumulators.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::tools::ToolId;

use super::record::{ProblemId, ProblemRecord};

/// Accumulates the problems routed to one tool during a run.
///
/// Appends are atomic per record; duplicate ids are ignored.
pub trait ToolPresentation: Send + Sync {
    fn tool_id(&self) -> &ToolId;

    /// Add a record. Returns false if a record with the same id exists.
    fn add_problem(&self, record: ProblemRecord) -> bool;

    /// All records, ordered by id.
    fn problems(&self) -> Vec<ProblemRecord>;

    fn problem_count(&self) -> usize;

    fn has_problems(&self) -> bool {
        self.problem_count() > 0
    }

    fn problems_for(&self, unit: &Path) -> Vec<ProblemRecord> {
        self.problems()
            .into_iter()
            .filter(|r| r.unit == unit)
            .collect()
    }
}

/// Builds a presentation for a tool.
pub type PresentationFactory = Arc<dyn Fn(&ToolId) -> Arc<dyn ToolPresentation> + Send + Sync>;

/// Ordered, deduplicating presentation.
#[derive(Debug)]
pub struct DefaultPresentation {
    tool: ToolId,
    records: Mutex<BTreeMap<ProblemId, ProblemRecord>>,
}

impl DefaultPresentation {
    pub fn new(tool: ToolId) -> Self {
        Self {
            tool,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn factory() -> PresentationFactory {
        Arc::new(|tool: &ToolId| Arc::new(DefaultPresentation::new(tool.clone())) as Arc<dyn ToolPresentation>)
    }
}

impl ToolPresentation for DefaultPresentation {
    fn tool_id(&self) -> &ToolId {
        &self.tool
    }

    fn add_problem(&self, record: ProblemRecord) -> bool {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        match records.entry(record.id) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    fn problems(&self) -> Vec<ProblemRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn problem_count(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
