//! The unit and unit-source contracts.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use vigil_core::errors::ScanError;

use super::scope::AnalysisScope;

/// Shared handle to an analysis unit.
pub type UnitRef = Arc<dyn AnalysisUnit>;

/// How many leading bytes are inspected for binary detection.
const BINARY_SNIFF_LEN: usize = 8000;

/// One analyzable document.
///
/// Owned by its `UnitSource`. The engine only reads units; a unit may become
/// invalid at any time (e.g. deleted by a mutation).
pub trait AnalysisUnit: Send + Sync + fmt::Debug {
    /// Stable identity of the unit, relative to its source root.
    fn path(&self) -> &Path;

    /// File name component of the path.
    fn name(&self) -> &str {
        self.path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    fn is_valid(&self) -> bool;

    fn size_bytes(&self) -> u64;

    fn is_binary(&self) -> bool;

    /// Current text content. Binary content is decoded lossily.
    fn text(&self) -> Result<Arc<str>, ScanError>;
}

/// Provider of analyzable units.
pub trait UnitSource: Send + Sync {
    /// Visit every unit in `scope`. Enumeration stops early when `visit`
    /// returns `false`.
    fn enumerate(
        &self,
        scope: &AnalysisScope,
        visit: &mut dyn FnMut(UnitRef) -> bool,
    ) -> Result<(), ScanError>;
}

/// Heuristic binary detection: a NUL byte in the leading window.
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_byte_marks_binary() {
        assert!(looks_binary(b"PK\x03\x04\x00\x00"));
        assert!(!looks_binary(b"fn main() {}\n"));
        assert!(!looks_binary(b""));
    }

    #[test]
    fn nul_past_sniff_window_is_ignored() {
        let mut bytes = vec![b'a'; BINARY_SNIFF_LEN];
        bytes.push(0);
        assert!(!looks_binary(&bytes));
    }
}
