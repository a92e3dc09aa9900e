//! Filesystem unit source built on the `ignore` walker.
//!
//! Honors `.gitignore`, skips hidden entries and the `.vigil` workspace
//! directory, and applies `scan.extra_ignore` globs.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use vigil_core::config::ScanConfig;
use vigil_core::errors::ScanError;

use super::scope::AnalysisScope;
use super::types::{looks_binary, AnalysisUnit, UnitRef, UnitSource};

/// Directory holding Vigil's own workspace files; never analyzed.
pub const WORKSPACE_DIR: &str = ".vigil";

/// A file on disk. `path` is relative to the source root.
#[derive(Debug)]
pub struct FsUnit {
    path: PathBuf,
    absolute: PathBuf,
    size: u64,
    binary: OnceLock<bool>,
}

impl FsUnit {
    pub fn absolute_path(&self) -> &Path {
        &self.absolute
    }

    fn sniff_binary(&self) -> bool {
        let mut buf = [0u8; 8000];
        let read = File::open(&self.absolute).and_then(|mut f| f.read(&mut buf));
        match read {
            Ok(n) => looks_binary(&buf[..n]),
            Err(_) => false,
        }
    }
}

impl AnalysisUnit for FsUnit {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_valid(&self) -> bool {
        self.absolute.is_file()
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn is_binary(&self) -> bool {
        *self.binary.get_or_init(|| self.sniff_binary())
    }

    fn text(&self) -> Result<Arc<str>, ScanError> {
        let bytes = fs::read(&self.absolute).map_err(|source| ScanError::IoError {
            path: self.absolute.clone(),
            source,
        })?;
        Ok(Arc::from(String::from_utf8_lossy(&bytes).as_ref()))
    }
}

/// Walks a directory tree and yields every regular file as a unit.
#[derive(Debug)]
pub struct FsUnitSource {
    root: PathBuf,
    follow_symlinks: bool,
    overrides: Override,
}

impl FsUnitSource {
    pub fn new(root: impl Into<PathBuf>, config: &ScanConfig) -> Result<Self, ScanError> {
        let root = root.into();
        let mut builder = OverrideBuilder::new(&root);
        for pattern in &config.extra_ignore {
            builder
                .add(&format!("!{pattern}"))
                .map_err(|e| ScanError::Source(format!("invalid ignore pattern '{pattern}': {e}")))?;
        }
        let overrides = builder
            .build()
            .map_err(|e| ScanError::Source(e.to_string()))?;
        Ok(Self {
            root,
            follow_symlinks: config.effective_follow_symlinks(),
            overrides,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl UnitSource for FsUnitSource {
    fn enumerate(
        &self,
        scope: &AnalysisScope,
        visit: &mut dyn FnMut(UnitRef) -> bool,
    ) -> Result<(), ScanError> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .follow_links(self.follow_symlinks)
            .overrides(self.overrides.clone())
            .filter_entry(|entry| entry.file_name() != WORKSPACE_DIR)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let absolute = entry.path().to_path_buf();
            let relative = absolute
                .strip_prefix(&self.root)
                .unwrap_or(&absolute)
                .to_path_buf();
            if !scope.contains_path(&relative) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let unit = Arc::new(FsUnit {
                path: relative,
                absolute,
                size,
                binary: OnceLock::new(),
            });
            if !visit(unit) {
                break;
            }
        }
        Ok(())
    }
}
