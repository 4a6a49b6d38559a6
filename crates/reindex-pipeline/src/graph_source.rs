//! Source provider over the RocksDB graph store.

use std::sync::Arc;

use tracing::debug;

use reindex_store::GraphStore;
use reindex_types::{Entity, EntityId, SchemaClass};

use crate::error::SourceError;
use crate::source::SourceProvider;

/// Reads entities from a [`GraphStore`], sharing its object cache.
#[derive(Clone)]
pub struct GraphSource {
    store: Arc<GraphStore>,
}

impl GraphSource {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }
}

impl SourceProvider for GraphSource {
    fn list_identifiers(&self, class: &SchemaClass) -> Result<Vec<EntityId>, SourceError> {
        Ok(self.store.list_ids(class)?)
    }

    fn fetch_by_id(&self, id: &EntityId) -> Result<Option<Arc<Entity>>, SourceError> {
        Ok(self.store.get_entity(id)?)
    }

    fn clear_cache(&self) {
        let evicted = self.store.clear_cache();
        debug!(evicted, "Evicted graph store cache");
    }

    fn count_entries(&self, class: &SchemaClass) -> Result<u64, SourceError> {
        Ok(self.store.count(class)?)
    }

    fn classes(&self) -> Result<Vec<SchemaClass>, SourceError> {
        Ok(self.store.classes()?)
    }
}
