//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::BTreeMap;

/// SmallVec for per-tool group claims (usually 0-2).
pub type SmallVec2<T> = SmallVec<[T; 2]>;

/// SmallVec for per-unit problem buffers (usually <8).
pub type SmallVec8<T> = SmallVec<[T; 8]>;
