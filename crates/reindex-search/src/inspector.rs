//! Read-only view of committed index contents.

use tantivy::collector::{Count, TopDocs};
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{IndexReader, TantivyDocument, Term};
use tracing::debug;

use reindex_types::Document;

use crate::document::document_from_doc;
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::SearchSchema;

/// Counts and lookups over the last committed state of the index.
pub struct IndexInspector {
    reader: IndexReader,
    schema: SearchSchema,
}

impl IndexInspector {
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        Ok(Self {
            reader: index.reader()?,
            schema: index.schema().clone(),
        })
    }

    /// Reload the reader to see recent commits.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        debug!("Reloaded index reader");
        Ok(())
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Number of live documents of one class.
    pub fn count_class(&self, class: &str) -> Result<usize, SearchError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.class, class),
            IndexRecordOption::Basic,
        );
        Ok(self.reader.searcher().search(&query, &Count)?)
    }

    pub fn contains(&self, id: &str) -> Result<bool, SearchError> {
        Ok(self.get(id)?.is_some())
    }

    /// Fetch a stored document by id.
    pub fn get(&self, id: &str) -> Result<Option<Document>, SearchError> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.schema.id, id),
            IndexRecordOption::Basic,
        );
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, address)) = top.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(Some(document_from_doc(&self.schema, &doc)?))
    }
}
