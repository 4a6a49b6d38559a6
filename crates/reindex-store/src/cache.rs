//! Shared cache of materialized entities.
//!
//! Entities are handed out as `Arc<Entity>`, so eviction only drops the
//! cache's own reference. Readers holding an entity keep it alive until they
//! are done with it, which makes `clear` safe at any point of a traversal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use reindex_types::{Entity, EntityId};

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Concurrent entity cache keyed by id.
#[derive(Default)]
pub struct EntityCache {
    entries: DashMap<EntityId, Arc<Entity>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached entity, counting the hit or miss.
    pub fn get(&self, id: &EntityId) -> Option<Arc<Entity>> {
        match self.entries.get(id) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, entity: Arc<Entity>) {
        self.entries.insert(entity.id.clone(), entity);
    }

    pub fn remove(&self, id: &EntityId) {
        self.entries.remove(id);
    }

    /// Drop every cached entity. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.evictions.fetch_add(1, Ordering::Relaxed);
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
