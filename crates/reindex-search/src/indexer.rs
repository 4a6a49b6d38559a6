//! Indexer for adding rebuilt documents to the Tantivy index.
//!
//! The indexer wraps IndexWriter behind a Mutex so sink workers on other
//! threads can share it. Documents are not visible until commit() is called.

use std::sync::Mutex;

use tantivy::{IndexWriter, Term};
use tracing::{debug, info, warn};

use reindex_types::Document;

use crate::document::document_to_doc;
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::SearchSchema;

/// Manages document indexing operations.
///
/// Adds are upserts keyed on the document id. After close() every
/// operation returns [`SearchError::WriterClosed`].
pub struct SearchIndexer {
    writer: Mutex<Option<IndexWriter>>,
    schema: SearchSchema,
}

impl SearchIndexer {
    /// Create a new indexer from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let writer = index.writer()?;
        Ok(Self::from_writer(writer, index.schema().clone()))
    }

    /// Create from an existing writer.
    pub fn from_writer(writer: IndexWriter, schema: SearchSchema) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            schema,
        }
    }

    fn with_writer<T>(
        &self,
        op: impl FnOnce(&mut IndexWriter) -> Result<T, SearchError>,
    ) -> Result<T, SearchError> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;
        let writer = guard.as_mut().ok_or(SearchError::WriterClosed)?;
        op(writer)
    }

    /// Index one document, replacing any document with the same id.
    pub fn add_document(&self, document: &Document) -> Result<(), SearchError> {
        let doc = document_to_doc(&self.schema, document)?;
        self.with_writer(|writer| {
            writer.delete_term(Term::from_field_text(self.schema.id, &document.id));
            writer.add_document(doc)?;
            Ok(())
        })?;
        debug!(id = %document.id, class = %document.class, "Indexed document");
        Ok(())
    }

    /// Index a batch of documents under one lock acquisition.
    ///
    /// Every document is converted before any is written, so a conversion
    /// failure leaves the writer untouched.
    pub fn add_documents(&self, documents: &[Document]) -> Result<usize, SearchError> {
        let docs = documents
            .iter()
            .map(|d| document_to_doc(&self.schema, d).map(|doc| (d.id.as_str(), doc)))
            .collect::<Result<Vec<_>, _>>()?;

        let count = self.with_writer(|writer| {
            let mut count = 0;
            for (id, doc) in docs {
                writer.delete_term(Term::from_field_text(self.schema.id, id));
                writer.add_document(doc)?;
                count += 1;
            }
            Ok(count)
        })?;

        debug!(count, "Indexed document batch");
        Ok(count)
    }

    /// Delete every document of one class.
    pub fn delete_class(&self, class: &str) -> Result<(), SearchError> {
        self.with_writer(|writer| {
            writer.delete_term(Term::from_field_text(self.schema.class, class));
            Ok(())
        })?;
        info!(class, "Deleted class documents");
        Ok(())
    }

    /// Delete every document in the index.
    pub fn delete_all(&self) -> Result<(), SearchError> {
        self.with_writer(|writer| {
            writer.delete_all_documents()?;
            Ok(())
        })?;
        info!("Deleted all documents");
        Ok(())
    }

    /// Commit pending changes to make them searchable.
    pub fn commit(&self) -> Result<u64, SearchError> {
        let opstamp = self.with_writer(|writer| Ok(writer.commit()?))?;
        info!(opstamp, "Committed index changes");
        Ok(opstamp)
    }

    /// Discard adds and deletes since the last commit, including a pending
    /// delete-all.
    pub fn rollback(&self) -> Result<u64, SearchError> {
        let opstamp = self.with_writer(|writer| Ok(writer.rollback()?))?;
        warn!(opstamp, "Rolled back index changes");
        Ok(opstamp)
    }

    /// Wait for merges to finish and release the writer lock.
    ///
    /// Uncommitted changes are discarded. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), SearchError> {
        let writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?
            .take();
        if let Some(writer) = writer {
            writer.wait_merging_threads()?;
            info!("Closed index writer");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().map(|w| w.is_none()).unwrap_or(true)
    }
}
