//! Source-side traits consumed by the pipeline.
//!
//! A [`SourceProvider`] enumerates and materializes entities. A
//! [`DocumentBuilder`] turns one id into a flat document. Both are shared
//! across every producer thread.

use std::sync::Arc;

use reindex_types::{Document, Entity, EntityId, SchemaClass};

use crate::error::{BuildError, SourceError};

/// Read access to the graph-backed object store.
pub trait SourceProvider: Send + Sync {
    /// Every id of one class.
    fn list_identifiers(&self, class: &SchemaClass) -> Result<Vec<EntityId>, SourceError>;

    /// Fetch one entity. `Ok(None)` means the id no longer resolves.
    fn fetch_by_id(&self, id: &EntityId) -> Result<Option<Arc<Entity>>, SourceError>;

    /// Drop the provider's materialized-object cache.
    ///
    /// Must be safe to call at any time, including while other threads are
    /// fetching. Later fetches repopulate the cache.
    fn clear_cache(&self);

    /// Number of entries of one class, used as the progress total.
    fn count_entries(&self, class: &SchemaClass) -> Result<u64, SourceError>;

    /// Every class known to the source, used when a run names none.
    fn classes(&self) -> Result<Vec<SchemaClass>, SourceError>;
}

/// Maps one id to the document representing it.
pub trait DocumentBuilder: Send + Sync {
    /// `Ok(None)` means there is nothing to index for this id.
    fn build(&self, id: &EntityId) -> Result<Option<Document>, BuildError>;
}

impl<F> DocumentBuilder for F
where
    F: Fn(&EntityId) -> Result<Option<Document>, BuildError> + Send + Sync,
{
    fn build(&self, id: &EntityId) -> Result<Option<Document>, BuildError> {
        self(id)
    }
}
