//! Problem records and their dedup identity.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::tools::ToolId;

/// Problem severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    WeakWarning,
    Info,
}

/// Half-open byte range within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// `0..len`, saturating at `u32::MAX`.
    pub fn whole(len: u64) -> Self {
        Self::new(0, u32::try_from(len).unwrap_or(u32::MAX))
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the byte offset lies inside this range.
    pub fn contains_offset(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Content identity of a problem: xxh3 over (tool, unit, range, message).
///
/// Reporting the same finding twice (e.g. a unit retried after preemption)
/// produces the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProblemId(pub u64);

impl ProblemId {
    pub fn compute(tool: &ToolId, unit: &std::path::Path, range: Option<TextRange>, message: &str) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(tool.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(unit.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        match range {
            Some(r) => {
                hasher.update(&[1]);
                hasher.update(&r.start.to_le_bytes());
                hasher.update(&r.end.to_le_bytes());
            }
            None => hasher.update(&[0]),
        }
        hasher.update(message.as_bytes());
        Self(hasher.digest())
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One finding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: ProblemId,
    /// Tool that produced the finding.
    pub tool: ToolId,
    pub unit: PathBuf,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    /// Cross-tool group tag. Routes the record to the group's owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ProblemRecord {
    pub fn new(
        tool: ToolId,
        unit: PathBuf,
        severity: Severity,
        message: String,
        range: Option<TextRange>,
        group: Option<String>,
    ) -> Self {
        let id = ProblemId::compute(&tool, &unit, range, &message);
        Self {
            id,
            tool,
            unit,
            severity,
            message,
            range,
            group,
        }
    }
}
