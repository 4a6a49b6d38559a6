//! The on-disk index a rebuild writes into.
//!
//! One rebuild run holds the only writer for its whole duration. Readers
//! never reload on their own: a class becomes visible to a reader only
//! after its commit and an explicit reload.

use std::path::{Path, PathBuf};

use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::{debug, info};

use crate::error::SearchError;
use crate::schema::{build_document_schema, SearchSchema};

const MB: usize = 1024 * 1024;

/// Smallest per-thread arena Tantivy accepts for an indexing thread.
const MIN_ARENA_BYTES_PER_THREAD: usize = 15_000_000;

/// Where the index lives and how much the rebuild writer may use.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
    /// Total writer memory budget, shared by all indexing threads
    pub writer_memory_mb: usize,
    /// Indexing threads; Tantivy picks from the budget and CPU count when unset
    pub writer_threads: Option<usize>,
}

impl IndexConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer_memory_mb: 50,
            writer_threads: None,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }

    pub fn with_writer_threads(mut self, threads: Option<usize>) -> Self {
        self.writer_threads = threads;
        self
    }

    /// Check the budget before the writer is requested, so a bad setting
    /// fails the run up front instead of on the first class.
    pub fn validate(&self) -> Result<(), SearchError> {
        let budget = self.writer_memory_mb * MB;
        let threads = self.writer_threads.unwrap_or(1);
        if threads == 0 {
            return Err(SearchError::InvalidConfig(
                "writer_threads must be > 0".into(),
            ));
        }
        if budget / threads < MIN_ARENA_BYTES_PER_THREAD {
            return Err(SearchError::InvalidConfig(format!(
                "writer budget of {} MB is below 15 MB per indexing thread ({} threads)",
                self.writer_memory_mb, threads
            )));
        }
        Ok(())
    }

    fn has_index(&self) -> bool {
        self.path.join("meta.json").exists()
    }
}

/// An opened rebuild index: the Tantivy handle plus resolved field handles.
pub struct SearchIndex {
    index: Index,
    schema: SearchSchema,
    config: IndexConfig,
    created: bool,
}

impl SearchIndex {
    /// Open the index at `config.path`, creating it (and its directory) when
    /// none exists yet. An existing index must carry the document schema.
    pub fn open_or_create(config: IndexConfig) -> Result<Self, SearchError> {
        config.validate()?;
        if config.has_index() {
            return Self::open_in(config);
        }

        std::fs::create_dir_all(&config.path)?;
        let schema = build_document_schema();
        let index = Index::create_in_dir(&config.path, schema.schema().clone())?;
        info!(path = ?config.path, "Created search index");
        Ok(Self {
            index,
            schema,
            config,
            created: true,
        })
    }

    /// Open an index only if one exists. Read-only callers use this so that
    /// looking at a path never leaves an empty index behind.
    pub fn open_existing(config: IndexConfig) -> Result<Option<Self>, SearchError> {
        if !config.has_index() {
            debug!(path = ?config.path, "No search index present");
            return Ok(None);
        }
        Self::open_in(config).map(Some)
    }

    fn open_in(config: IndexConfig) -> Result<Self, SearchError> {
        let index = Index::open_in_dir(&config.path)?;
        let schema = SearchSchema::from_schema(index.schema()).map_err(|e| match e {
            SearchError::SchemaMismatch(reason) => {
                SearchError::SchemaMismatch(format!("index at {:?}: {}", config.path, reason))
            }
            other => other,
        })?;
        info!(path = ?config.path, "Opened search index");
        Ok(Self {
            index,
            schema,
            config,
            created: false,
        })
    }

    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    /// Whether this handle created the index rather than finding one.
    pub fn created(&self) -> bool {
        self.created
    }

    /// The single rebuild writer. Fails with a lock error while another
    /// process holds it.
    pub fn writer(&self) -> Result<IndexWriter, SearchError> {
        let budget = self.config.writer_memory_mb * MB;
        let writer = match self.config.writer_threads {
            Some(threads) => self.index.writer_with_num_threads(threads, budget)?,
            None => self.index.writer(budget)?,
        };
        debug!(
            memory_mb = self.config.writer_memory_mb,
            threads = ?self.config.writer_threads,
            "Acquired rebuild writer"
        );
        Ok(writer)
    }

    /// A reader that only moves forward on [`IndexReader::reload`].
    pub fn reader(&self) -> Result<IndexReader, SearchError> {
        Ok(self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::schema::{Schema, STRING};
    use tempfile::TempDir;

    #[test]
    fn test_create_then_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let config = IndexConfig::new(temp_dir.path().join("nested/index"));

        let first = SearchIndex::open_or_create(config.clone()).unwrap();
        assert!(first.created());
        drop(first);

        let second = SearchIndex::open_or_create(config).unwrap();
        assert!(!second.created());
        let _writer = second.writer().unwrap();
        let _reader = second.reader().unwrap();
    }

    #[test]
    fn test_open_existing_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        assert!(SearchIndex::open_existing(IndexConfig::new(&path))
            .unwrap()
            .is_none());
        assert!(!path.exists());

        SearchIndex::open_or_create(IndexConfig::new(&path)).unwrap();
        assert!(SearchIndex::open_existing(IndexConfig::new(&path))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_foreign_index_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut builder = Schema::builder();
        builder.add_text_field("title", STRING);
        Index::create_in_dir(temp_dir.path(), builder.build()).unwrap();

        let result = SearchIndex::open_or_create(IndexConfig::new(temp_dir.path()));
        assert!(matches!(result, Err(SearchError::SchemaMismatch(_))));
    }

    #[test]
    fn test_writer_budget_checked_per_thread() {
        assert!(IndexConfig::new("/tmp/x").validate().is_ok());
        assert!(IndexConfig::new("/tmp/x")
            .with_memory_mb(10)
            .validate()
            .is_err());
        assert!(IndexConfig::new("/tmp/x")
            .with_memory_mb(40)
            .with_writer_threads(Some(4))
            .validate()
            .is_err());
        assert!(IndexConfig::new("/tmp/x")
            .with_memory_mb(64)
            .with_writer_threads(Some(4))
            .validate()
            .is_ok());
        assert!(matches!(
            IndexConfig::new("/tmp/x")
                .with_writer_threads(Some(0))
                .validate(),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
