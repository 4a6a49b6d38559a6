//! RocksDB wrapper for the graph object store.
//!
//! Provides:
//! - Database open with column family setup
//! - Atomic entity + class index writes
//! - Cache-first entity reads
//! - Per-class id listing and counting

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, info};

use reindex_types::{Entity, EntityId, SchemaClass};

use crate::cache::{CacheStats, EntityCache};
use crate::column_families::{build_cf_descriptors, CF_CLASS_INDEX, CF_ENTITIES};
use crate::error::StorageError;
use crate::keys::{ClassIndexKey, EntityKey};

/// Graph object store backed by RocksDB with a shared entity cache.
pub struct GraphStore {
    db: DB,
    cache: EntityCache,
}

impl GraphStore {
    /// Open the store at the given path, creating it if necessary.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening graph store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;

        Ok(Self {
            db,
            cache: EntityCache::new(),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Store an entity and its class index entry atomically.
    ///
    /// Returns true if the entity was new. Overwriting an entity under a
    /// different class moves its index entry.
    pub fn put_entity(&self, entity: &Entity) -> Result<bool, StorageError> {
        let mut batch = WriteBatch::default();
        let created = self.stage_entity(&mut batch, entity)?;
        self.db.write(batch)?;
        self.cache.remove(&entity.id);
        debug!(id = %entity.id, class = %entity.class, created, "Stored entity");
        Ok(created)
    }

    /// Store many entities in one write batch. Returns how many were new.
    pub fn put_entities(&self, entities: &[Entity]) -> Result<usize, StorageError> {
        let mut batch = WriteBatch::default();
        let mut created = 0;
        for entity in entities {
            if self.stage_entity(&mut batch, entity)? {
                created += 1;
            }
        }
        self.db.write(batch)?;
        for entity in entities {
            self.cache.remove(&entity.id);
        }
        debug!(count = entities.len(), created, "Stored entity batch");
        Ok(created)
    }

    fn stage_entity(&self, batch: &mut WriteBatch, entity: &Entity) -> Result<bool, StorageError> {
        let entities_cf = self.cf(CF_ENTITIES)?;
        let index_cf = self.cf(CF_CLASS_INDEX)?;

        let entity_key = EntityKey::new(entity.id.clone()).to_bytes();
        let index_key = ClassIndexKey::new(entity.class.clone(), entity.id.clone())?;

        let previous = self.db.get_cf(entities_cf, &entity_key)?;
        if let Some(bytes) = &previous {
            let old = Entity::from_bytes(bytes)?;
            if old.class != entity.class {
                let old_key = ClassIndexKey::new(old.class, old.id)?;
                batch.delete_cf(index_cf, old_key.to_bytes());
            }
        }

        batch.put_cf(entities_cf, entity_key, entity.to_bytes()?);
        batch.put_cf(index_cf, index_key.to_bytes(), b"");
        Ok(previous.is_none())
    }

    /// Fetch an entity, serving from the cache when possible.
    ///
    /// A store hit populates the cache.
    pub fn get_entity(&self, id: &EntityId) -> Result<Option<Arc<Entity>>, StorageError> {
        if let Some(entity) = self.cache.get(id) {
            return Ok(Some(entity));
        }

        let cf = self.cf(CF_ENTITIES)?;
        let Some(bytes) = self.db.get_cf(cf, EntityKey::new(id.clone()).to_bytes())? else {
            return Ok(None);
        };

        let entity = Arc::new(Entity::from_bytes(&bytes)?);
        self.cache.insert(Arc::clone(&entity));
        Ok(Some(entity))
    }

    /// All entity ids of one class, in key order.
    pub fn list_ids(&self, class: &SchemaClass) -> Result<Vec<EntityId>, StorageError> {
        let prefix = ClassIndexKey::prefix(class)?;
        let mut ids = Vec::new();
        self.scan_index(&prefix, |key| {
            ids.push(key.id);
        })?;
        Ok(ids)
    }

    /// Number of entities of one class.
    pub fn count(&self, class: &SchemaClass) -> Result<u64, StorageError> {
        let prefix = ClassIndexKey::prefix(class)?;
        let mut count = 0u64;
        self.scan_index(&prefix, |_| count += 1)?;
        Ok(count)
    }

    /// Every class present in the store, in name order.
    pub fn classes(&self) -> Result<Vec<SchemaClass>, StorageError> {
        Ok(self.class_counts()?.into_keys().map(SchemaClass::from).collect())
    }

    fn class_counts(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        self.scan_index(&ClassIndexKey::all_prefix(), |key| {
            *counts.entry(key.class.as_str().to_string()).or_default() += 1;
        })?;
        Ok(counts)
    }

    fn scan_index(
        &self,
        prefix: &[u8],
        mut visit: impl FnMut(ClassIndexKey),
    ) -> Result<(), StorageError> {
        let cf = self.cf(CF_CLASS_INDEX)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            visit(ClassIndexKey::from_bytes(&key)?);
        }
        Ok(())
    }

    /// Access the shared entity cache.
    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// Drop every cached entity. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        let dropped = self.cache.clear();
        debug!(dropped, "Cleared entity cache");
        dropped
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    /// Get store statistics.
    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        let class_counts = self.class_counts()?;
        Ok(StoreStats {
            entity_count: class_counts.values().sum(),
            class_counts,
            cache: self.cache.stats(),
            disk_usage_bytes: self.disk_usage(),
        })
    }

    fn disk_usage(&self) -> u64 {
        std::fs::read_dir(self.db.path())
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .map(|metadata| metadata.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Statistics about the store.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Number of entities stored
    pub entity_count: u64,
    /// Entities per class
    pub class_counts: BTreeMap<String, u64>,
    /// Entity cache counters
    pub cache: CacheStats,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reindex_types::CrossReference;
    use tempfile::TempDir;

    fn create_test_store() -> (GraphStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = GraphStore::open(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn pathway(id: &str) -> Entity {
        Entity::new(id, "Pathway", format!("Pathway {}", id))
            .with_cross_reference(CrossReference::new("GO", "0008150"))
    }

    #[test]
    fn test_put_and_get_entity() {
        let (store, _temp) = create_test_store();
        let entity = pathway("P1");

        assert!(store.put_entity(&entity).unwrap());
        let fetched = store.get_entity(&EntityId::from("P1")).unwrap().unwrap();
        assert_eq!(*fetched, entity);
    }

    #[test]
    fn test_get_missing_entity() {
        let (store, _temp) = create_test_store();
        assert!(store.get_entity(&EntityId::from("nope")).unwrap().is_none());
        assert_eq!(store.cache_len(), 0);
    }

    #[test]
    fn test_overwrite_is_not_created() {
        let (store, _temp) = create_test_store();
        assert!(store.put_entity(&pathway("P1")).unwrap());
        assert!(!store.put_entity(&pathway("P1")).unwrap());
        assert_eq!(store.count(&"Pathway".into()).unwrap(), 1);
    }

    #[test]
    fn test_list_and_count_by_class() {
        let (store, _temp) = create_test_store();
        store
            .put_entities(&[
                pathway("P2"),
                pathway("P1"),
                Entity::new("R1", "Reaction", "r1"),
                Entity::new("X1", "Pathways", "lookalike"),
            ])
            .unwrap();

        let ids = store.list_ids(&"Pathway".into()).unwrap();
        assert_eq!(ids, vec![EntityId::from("P1"), EntityId::from("P2")]);
        assert_eq!(store.count(&"Reaction".into()).unwrap(), 1);
        assert_eq!(store.count(&"Complex".into()).unwrap(), 0);

        let classes: Vec<String> = store
            .classes()
            .unwrap()
            .into_iter()
            .map(|c| c.as_str().to_string())
            .collect();
        assert_eq!(classes, vec!["Pathway", "Pathways", "Reaction"]);
    }

    #[test]
    fn test_class_change_moves_index_entry() {
        let (store, _temp) = create_test_store();
        store.put_entity(&Entity::new("E1", "Complex", "e")).unwrap();
        store.put_entity(&Entity::new("E1", "Polymer", "e")).unwrap();

        assert_eq!(store.count(&"Complex".into()).unwrap(), 0);
        assert_eq!(store.count(&"Polymer".into()).unwrap(), 1);
    }

    #[test]
    fn test_cache_populated_and_cleared() {
        let (store, _temp) = create_test_store();
        store.put_entities(&[pathway("P1"), pathway("P2")]).unwrap();

        store.get_entity(&EntityId::from("P1")).unwrap();
        store.get_entity(&EntityId::from("P2")).unwrap();
        store.get_entity(&EntityId::from("P1")).unwrap();
        assert_eq!(store.cache_len(), 2);
        assert_eq!(store.cache().stats().hits, 1);

        assert_eq!(store.clear_cache(), 2);
        assert_eq!(store.cache_len(), 0);
        assert!(store.get_entity(&EntityId::from("P1")).unwrap().is_some());
    }

    #[test]
    fn test_put_invalidates_cached_copy() {
        let (store, _temp) = create_test_store();
        store.put_entity(&pathway("P1")).unwrap();
        store.get_entity(&EntityId::from("P1")).unwrap();

        let renamed = Entity::new("P1", "Pathway", "Renamed");
        store.put_entity(&renamed).unwrap();
        let fetched = store.get_entity(&EntityId::from("P1")).unwrap().unwrap();
        assert_eq!(fetched.name, "Renamed");
    }

    #[test]
    fn test_stats() {
        let (store, _temp) = create_test_store();
        store
            .put_entities(&[pathway("P1"), Entity::new("R1", "Reaction", "r1")])
            .unwrap();
        store.flush().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.entity_count, 2);
        assert_eq!(stats.class_counts.get("Pathway"), Some(&1));
        assert!(stats.disk_usage_bytes > 0);
    }
}
