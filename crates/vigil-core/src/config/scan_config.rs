//! Unit enumeration configuration.

use serde::{Deserialize, Serialize};

/// Default size ceiling for analyzable units, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2_500_000;

/// Configuration for the scope enumerator and filesystem unit source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Units larger than this are skipped. Default: 2.5MB.
    pub max_file_size: Option<u64>,
    /// Skip binary units. Default: true.
    pub skip_binary: Option<bool>,
    /// Additional ignore globs for the filesystem source.
    pub extra_ignore: Vec<String>,
    /// Follow symlinks while walking. Default: false.
    pub follow_symlinks: Option<bool>,
}

impl ScanConfig {
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    pub fn effective_skip_binary(&self) -> bool {
        self.skip_binary.unwrap_or(true)
    }

    pub fn effective_follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(false)
    }

    /// Layer `upper` on top of `self`. A non-empty ignore list replaces the
    /// lower one rather than extending it.
    pub(crate) fn overlay(&mut self, upper: &Self) {
        self.max_file_size = upper.max_file_size.or(self.max_file_size);
        self.skip_binary = upper.skip_binary.or(self.skip_binary);
        self.follow_symlinks = upper.follow_symlinks.or(self.follow_symlinks);
        if !upper.extra_ignore.is_empty() {
            self.extra_ignore.clone_from(&upper.extra_ignore);
        }
    }
}
