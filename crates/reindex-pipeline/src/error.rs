//! Error types for the rebuild pipeline.
//!
//! Per-item errors ([`SourceError`], [`BuildError`], [`SinkError`]) are
//! absorbed inside the producer and sink workers. Only [`ReindexError`]
//! reaches the caller of a run.

use reindex_search::SearchError;
use reindex_store::StorageError;
use thiserror::Error;

/// Failure reading from the source.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// Backend read failed
    #[error("Source backend error: {0}")]
    Backend(String),

    /// Stored record could not be decoded
    #[error("Corrupt source record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl From<StorageError> for SourceError {
    fn from(err: StorageError) -> Self {
        SourceError::Backend(err.to_string())
    }
}

/// Failure turning one entity into a document.
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// Fetching the entity or one of its relations failed
    #[error("Fetch failed: {0}")]
    Source(#[from] SourceError),

    /// The entity cannot be represented as a document
    #[error("Invalid entity: {0}")]
    Invalid(String),
}

/// Failure writing to the bulk sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// May succeed if retried
    #[error("Transient sink error: {0}")]
    Transient(String),

    /// Will not succeed if retried
    #[error("Permanent sink error: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

impl From<SearchError> for SinkError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::IndexLocked(_) | SearchError::Io(_) => {
                SinkError::Transient(err.to_string())
            }
            other => SinkError::Permanent(other.to_string()),
        }
    }
}

/// A relay queue's consumer is gone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Relay queue '{0}' is closed")]
pub struct RelayClosed(pub String);

/// Run-level errors.
#[derive(Error, Debug)]
pub enum ReindexError {
    /// Bad settings, unopenable export, or unbuildable thread pool
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Listing or counting a class failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Clearing, committing, or closing the sink failed
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Writing the export header or footer failed
    #[error("Export error: {0}")]
    Export(#[from] std::io::Error),

    /// A worker thread panicked or could not be spawned
    #[error("Unexpected runtime error: {0}")]
    Unexpected(String),
}
