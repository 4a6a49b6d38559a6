//! # reindex-search
//!
//! Embedded Tantivy index that receives rebuilt documents.
//!
//! ## Features
//! - On-disk index opened or created at a path, with a checked writer budget
//! - Schema with exact-match id and class fields, a full-text body, and a
//!   stored JSON payload of the original document
//! - Upserting writer with delete-all and delete-by-class
//! - Read-only inspector for counts and lookups after commit

pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod inspector;
pub mod schema;

pub use document::{document_from_doc, document_to_doc};
pub use error::SearchError;
pub use index::{IndexConfig, SearchIndex};
pub use indexer::SearchIndexer;
pub use inspector::IndexInspector;
pub use schema::{build_document_schema, SearchSchema};
