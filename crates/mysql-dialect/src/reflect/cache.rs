//! In-memory [`MetadataCache`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::schema::Table;
use crate::core::traits::{CacheKey, MetadataCache};

/// Process-local table cache guarded by a read-write lock.
///
/// Entries are replaced whole; readers holding an `Arc<Table>` keep the
/// version they fetched.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Arc<Table>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<Table>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: CacheKey, table: Arc<Table>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, table);
        }
    }

    fn invalidate(&self, key: &CacheKey) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn invalidate_tag(&self, tag: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|key, _| key.tag() != tag);
        }
    }
}
