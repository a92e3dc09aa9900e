//! `ProblemSink`: per-invocation problem buffer.

use std::path::PathBuf;

use crate::presentation::{ProblemRecord, Severity, TextRange};

use super::descriptor::ToolId;

/// A finding as reported by a tool, before it gets an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub unit: PathBuf,
    pub message: String,
    pub range: Option<TextRange>,
    pub group: Option<String>,
    /// Overrides the tool's configured severity.
    pub severity: Option<Severity>,
}

impl Problem {
    pub fn new(unit: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
            range: None,
            group: None,
            severity: None,
        }
    }

    pub fn at(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// Collects one tool's problems for one invocation.
///
/// The engine discards the sink if the invocation fails or is cancelled.
#[derive(Debug)]
pub struct ProblemSink {
    tool: ToolId,
    severity: Severity,
    records: Vec<ProblemRecord>,
}

impl ProblemSink {
    pub fn new(tool: ToolId, severity: Severity) -> Self {
        Self {
            tool,
            severity,
            records: Vec::new(),
        }
    }

    pub fn tool(&self) -> &ToolId {
        &self.tool
    }

    pub fn report(&mut self, problem: Problem) {
        let severity = problem.severity.unwrap_or(self.severity);
        self.records.push(ProblemRecord::new(
            self.tool.clone(),
            problem.unit,
            severity,
            problem.message,
            problem.range,
            problem.group,
        ));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ProblemRecord> {
        self.records
    }
}
