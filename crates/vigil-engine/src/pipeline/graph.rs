//! Whole-scope declaration graph shared by global tools.
//!
//! Indexes every valid unit in the run scope by declared name (its file
//! name) so global tools can answer cross-unit questions without walking
//! the corpus themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use vigil_core::errors::ScanError;
use vigil_core::traits::Cancellable;

use crate::unit::{AnalysisScope, UnitSource};

#[derive(Debug, Default)]
pub struct DeclarationGraph {
    by_name: BTreeMap<String, Vec<PathBuf>>,
    units: usize,
}

impl DeclarationGraph {
    /// Build the graph. Must be called under a read snapshot.
    pub fn build(
        source: &dyn UnitSource,
        scope: &AnalysisScope,
        token: &dyn Cancellable,
    ) -> Result<Self, ScanError> {
        let started = Instant::now();
        let mut graph = Self::default();
        let mut cancelled = false;
        source.enumerate(scope, &mut |unit| {
            if token.is_cancelled() {
                cancelled = true;
                return false;
            }
            if unit.is_valid() {
                graph
                    .by_name
                    .entry(unit.name().to_string())
                    .or_default()
                    .push(unit.path().to_path_buf());
                graph.units += 1;
            }
            true
        })?;
        if cancelled {
            return Err(ScanError::Cancelled);
        }
        for paths in graph.by_name.values_mut() {
            paths.sort();
        }
        tracing::debug!(
            units = graph.units,
            names = graph.by_name.len(),
            graph_build_time = started.elapsed().as_millis() as u64,
            "declaration graph built"
        );
        Ok(graph)
    }

    /// Units declaring `name`, sorted by path.
    pub fn units_named(&self, name: &str) -> &[PathBuf] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names declared by more than one unit.
    pub fn names_with_duplicates(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.by_name
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.units_named(n).iter().any(|p| p == path))
    }

    /// Number of units indexed.
    pub fn len(&self) -> usize {
        self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::MemoryCorpus;
    use vigil_core::traits::RunToken;

    #[test]
    fn duplicates_are_grouped_by_name() {
        let corpus = MemoryCorpus::with_documents([
            ("a/mod.rs", ""),
            ("b/mod.rs", ""),
            ("b/lib.rs", ""),
        ]);
        let graph = DeclarationGraph::build(&corpus, &AnalysisScope::Corpus, &RunToken::new()).unwrap();
        assert_eq!(graph.len(), 3);
        let dups: Vec<_> = graph.names_with_duplicates().collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].0, "mod.rs");
        assert_eq!(dups[0].1, &[PathBuf::from("a/mod.rs"), PathBuf::from("b/mod.rs")]);
        assert!(graph.contains(Path::new("b/lib.rs")));
    }

    #[test]
    fn cancelled_build_fails() {
        let corpus = MemoryCorpus::with_documents([("a.txt", "")]);
        let token = RunToken::new();
        token.cancel();
        assert!(matches!(
            DeclarationGraph::build(&corpus, &AnalysisScope::Corpus, &token),
            Err(ScanError::Cancelled)
        ));
    }
}
