//! Search error types.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload encoding error
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Writer settings Tantivy would refuse
    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),

    /// Index is locked (writer mutex poisoned)
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// Writer was already closed
    #[error("Index writer is closed")]
    WriterClosed,
}
