//! Analysis scopes and per-tool sub-scope filters.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::presentation::TextRange;

use super::types::AnalysisUnit;

/// The set of units a run analyzes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisScope {
    /// Every unit the source provides.
    Corpus,
    /// Units under any of these path prefixes.
    Paths(Vec<PathBuf>),
    /// An explicit set of units. Narrow scope; enumeration dedups visits.
    Units(BTreeSet<PathBuf>),
    /// Explicit units, each inspected only within its range. Narrow scope.
    Ranges(BTreeMap<PathBuf, TextRange>),
}

impl AnalysisScope {
    pub fn units<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::Units(paths.into_iter().map(Into::into).collect())
    }

    pub fn ranges<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, TextRange)>,
        P: Into<PathBuf>,
    {
        Self::Ranges(entries.into_iter().map(|(p, r)| (p.into(), r)).collect())
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        match self {
            Self::Corpus => true,
            Self::Paths(prefixes) => prefixes.iter().any(|p| path.starts_with(p)),
            Self::Units(set) => set.contains(path),
            Self::Ranges(map) => map.contains_key(path),
        }
    }

    /// The part of `path` this scope covers, or `None` for the whole unit.
    pub fn effective_range(&self, path: &Path) -> Option<TextRange> {
        match self {
            Self::Ranges(map) => map.get(path).copied(),
            _ => None,
        }
    }

    pub fn contains(&self, unit: &dyn AnalysisUnit) -> bool {
        self.contains_path(unit.path())
    }

    pub fn is_whole_corpus(&self) -> bool {
        matches!(self, Self::Corpus)
    }

    /// Narrow scopes may reach the same unit more than once while walking.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Units(_) | Self::Ranges(_))
    }

    /// Short human-readable description for logs.
    pub fn short_name(&self) -> String {
        match self {
            Self::Corpus => "corpus".to_string(),
            Self::Paths(p) if p.len() == 1 => p[0].display().to_string(),
            Self::Paths(p) => format!("{} paths", p.len()),
            Self::Units(u) if u.len() == 1 => u.iter().next().map(|p| p.display().to_string()).unwrap_or_default(),
            Self::Units(u) => format!("{} units", u.len()),
            Self::Ranges(r) => format!("{} ranges", r.len()),
        }
    }
}

/// Glob-based unit filter used as a tool's configured sub-scope.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ScopeFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// A tool's effective scope: the run scope intersected with the tool's
/// optional sub-scope.
#[derive(Debug, Clone, Copy)]
pub struct ToolScope<'a> {
    run: &'a AnalysisScope,
    filter: Option<&'a ScopeFilter>,
}

impl<'a> ToolScope<'a> {
    pub fn new(run: &'a AnalysisScope, filter: Option<&'a ScopeFilter>) -> Self {
        Self { run, filter }
    }

    pub fn run_scope(&self) -> &'a AnalysisScope {
        self.run
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.run.contains_path(path) && self.filter.map_or(true, |f| f.matches(path))
    }

    pub fn contains(&self, unit: &dyn AnalysisUnit) -> bool {
        self.contains_path(unit.path())
    }

    pub fn effective_range(&self, path: &Path) -> Option<TextRange> {
        self.run.effective_range(path)
    }
}
