//! Path-keyed cache of open extensible dataset handles.

use crate::container::DatasetId;
use crate::types::ObjectPath;
use std::collections::HashMap;

/// Open handles of extensible datasets, kept for the rest of the run.
///
/// Appends resolve their target through this cache and only fall back to a
/// namespace lookup on a miss.
#[derive(Debug, Default)]
pub struct HandleCache {
    handles: HashMap<ObjectPath, DatasetId>,
}

impl HandleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `path`.
    pub fn get(&self, path: &ObjectPath) -> Option<DatasetId> {
        self.handles.get(path).copied()
    }

    /// Cache a handle.
    pub fn insert(&mut self, path: ObjectPath, id: DatasetId) {
        self.handles.insert(path, id);
    }

    /// Release every handle.
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
