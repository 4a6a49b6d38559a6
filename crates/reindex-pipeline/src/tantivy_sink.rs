//! Bulk sink over the embedded Tantivy index.

use reindex_search::SearchIndexer;
use reindex_types::Document;

use crate::error::SinkError;
use crate::sink::{BulkSink, SinkQuery};

pub struct TantivySink {
    indexer: SearchIndexer,
}

impl TantivySink {
    pub fn new(indexer: SearchIndexer) -> Self {
        Self { indexer }
    }
}

impl BulkSink for TantivySink {
    fn delete_by_query(&self, query: &SinkQuery) -> Result<(), SinkError> {
        match query {
            SinkQuery::All => self.indexer.delete_all()?,
            SinkQuery::Class(class) => self.indexer.delete_class(class)?,
        }
        Ok(())
    }

    fn add_one(&self, document: &Document) -> Result<(), SinkError> {
        Ok(self.indexer.add_document(document)?)
    }

    fn add_many(&self, documents: &[Document]) -> Result<(), SinkError> {
        self.indexer.add_documents(documents)?;
        Ok(())
    }

    fn commit(&self) -> Result<(), SinkError> {
        self.indexer.commit()?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), SinkError> {
        self.indexer.rollback()?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        Ok(self.indexer.close()?)
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}
