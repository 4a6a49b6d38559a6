//! Storage layer for the graph reindexer.
//!
//! Provides a RocksDB-backed graph object store with:
//! - Column family isolation for entity records and the per-class index
//! - Class-prefixed index keys for cheap per-class id listing and counting
//! - Atomic writes via WriteBatch so an entity and its index entry never diverge
//! - A shared in-memory cache of materialized entities that can be evicted at any time

pub mod cache;
pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use cache::{CacheStats, EntityCache};
pub use db::{GraphStore, StoreStats};
pub use error::StorageError;
pub use keys::{ClassIndexKey, EntityKey};
