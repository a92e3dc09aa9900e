//! In-memory mutable corpus.
//!
//! Mutations (`insert`, `set_text`, `remove`) are expected to run under the
//! corpus gate's write side so analysis never observes a half-applied edit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use vigil_core::errors::ScanError;

use super::scope::AnalysisScope;
use super::types::{looks_binary, AnalysisUnit, UnitRef, UnitSource};

/// A document held by a `MemoryCorpus`.
#[derive(Debug)]
pub struct MemoryDocument {
    path: PathBuf,
    text: RwLock<Arc<str>>,
    /// Length of the raw content, before lossy decoding.
    size: AtomicU64,
    binary: AtomicBool,
    valid: AtomicBool,
}

impl MemoryDocument {
    fn new(path: PathBuf, bytes: &[u8]) -> Self {
        Self {
            path,
            text: RwLock::new(Arc::from(String::from_utf8_lossy(bytes).as_ref())),
            size: AtomicU64::new(bytes.len() as u64),
            binary: AtomicBool::new(looks_binary(bytes)),
            valid: AtomicBool::new(true),
        }
    }

    fn replace(&self, bytes: &[u8]) {
        *self.text.write().unwrap_or_else(PoisonError::into_inner) =
            Arc::from(String::from_utf8_lossy(bytes).as_ref());
        self.size.store(bytes.len() as u64, Ordering::Release);
        self.binary.store(looks_binary(bytes), Ordering::Release);
    }
}

impl AnalysisUnit for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn size_bytes(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    fn is_binary(&self) -> bool {
        self.binary.load(Ordering::Acquire)
    }

    fn text(&self) -> Result<Arc<str>, ScanError> {
        Ok(Arc::clone(&self.text.read().unwrap_or_else(PoisonError::into_inner)))
    }
}

/// In-memory unit source, ordered by path.
#[derive(Debug, Default)]
pub struct MemoryCorpus {
    docs: RwLock<BTreeMap<PathBuf, Arc<MemoryDocument>>>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from `(path, text)` pairs.
    pub fn with_documents<I, P, T>(docs: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<PathBuf>,
        T: AsRef<[u8]>,
    {
        let corpus = Self::new();
        for (path, text) in docs {
            corpus.insert(path, text);
        }
        corpus
    }

    /// Insert a document, or replace the content of an existing one.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> UnitRef {
        let path = path.into();
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = docs.get(&path) {
            existing.replace(content.as_ref());
            return Arc::clone(existing) as UnitRef;
        }
        let doc = Arc::new(MemoryDocument::new(path.clone(), content.as_ref()));
        docs.insert(path, Arc::clone(&doc));
        doc
    }

    /// Replace the text of an existing document. Returns false if absent.
    pub fn set_text(&self, path: &Path, content: impl AsRef<[u8]>) -> bool {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        match docs.get(path) {
            Some(doc) => {
                doc.replace(content.as_ref());
                true
            }
            None => false,
        }
    }

    /// Remove a document. Outstanding handles become invalid.
    pub fn remove(&self, path: &Path) -> bool {
        let removed = self
            .docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        match removed {
            Some(doc) => {
                doc.valid.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, path: &Path) -> Option<UnitRef> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|d| Arc::clone(d) as UnitRef)
    }

    pub fn len(&self) -> usize {
        self.docs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UnitSource for MemoryCorpus {
    fn enumerate(
        &self,
        scope: &AnalysisScope,
        visit: &mut dyn FnMut(UnitRef) -> bool,
    ) -> Result<(), ScanError> {
        // Snapshot the handles so visitors never run under the map lock.
        let units: Vec<UnitRef> = self
            .docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|d| scope.contains_path(&d.path))
            .map(|d| Arc::clone(d) as UnitRef)
            .collect();
        for unit in units {
            if !visit(unit) {
                break;
            }
        }
        Ok(())
    }
}
