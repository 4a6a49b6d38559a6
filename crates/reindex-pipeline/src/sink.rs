//! Bulk index sink trait.

use reindex_types::Document;

use crate::error::SinkError;

/// Which documents a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkQuery {
    /// Every document in the sink
    All,
    /// Every document of one schema class
    Class(String),
}

/// Trait for bulk index destinations.
///
/// Writes become durable on commit. Implementations are shared between the
/// orchestrator and the index worker thread.
pub trait BulkSink: Send + Sync {
    fn delete_by_query(&self, query: &SinkQuery) -> Result<(), SinkError>;

    /// Write one document.
    fn add_one(&self, document: &Document) -> Result<(), SinkError>;

    /// Write a batch. On error, none of the batch may be assumed written.
    fn add_many(&self, documents: &[Document]) -> Result<(), SinkError>;

    fn commit(&self) -> Result<(), SinkError>;

    /// Discard every write and delete since the last commit.
    fn rollback(&self) -> Result<(), SinkError>;

    /// Release the sink. Nothing may be written afterwards.
    fn close(&self) -> Result<(), SinkError>;

    /// Get the name of this sink for logging.
    fn name(&self) -> &str;
}
