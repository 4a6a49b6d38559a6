//! End-to-end test infrastructure for the graph reindexer.
//!
//! Provides a shared TestHarness (graph store + search index in a temp
//! directory), a seeded sample graph, and a fault-injecting builder.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use reindex_pipeline::{
    BuildError, DocumentBuilder, ExportHeader, ExportPlan, GraphDocumentBuilder, GraphSource,
    ReindexConfig, Reindexer, RunReport, SourceProvider, TantivySink,
};
use reindex_search::{IndexConfig, IndexInspector, SearchIndex, SearchIndexer};
use reindex_store::GraphStore;
use reindex_types::{CrossReference, Document, Entity, EntityId, SchemaClass};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Shared graph store
    pub store: Arc<GraphStore>,
    /// Search index directory
    pub index_path: PathBuf,
    /// Directory for export files
    pub export_dir: PathBuf,
}

impl TestHarness {
    /// Create a new test harness with an empty store and index directory.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            GraphStore::open(&temp_dir.path().join("graph")).expect("Failed to open test store"),
        );

        let index_path = temp_dir.path().join("search-index");
        let export_dir = temp_dir.path().join("export");
        std::fs::create_dir_all(&index_path).expect("Failed to create index dir");

        Self {
            _temp_dir: temp_dir,
            store,
            index_path,
            export_dir,
        }
    }

    /// Create a harness seeded with [`sample_graph`].
    pub fn seeded(pathways: usize, reactions: usize) -> Self {
        let harness = Self::new();
        harness
            .store
            .put_entities(&sample_graph(pathways, reactions))
            .expect("Failed to seed store");
        harness
    }

    pub fn source(&self) -> Arc<dyn SourceProvider> {
        Arc::new(GraphSource::new(Arc::clone(&self.store)))
    }

    pub fn open_index(&self) -> SearchIndex {
        SearchIndex::open_or_create(IndexConfig::new(&self.index_path))
            .expect("Failed to open search index")
    }

    /// Inspector over the current committed state of the index.
    pub fn inspector(&self) -> IndexInspector {
        IndexInspector::new(&self.open_index()).expect("Failed to open inspector")
    }

    /// Reindexer over the harness store and index with the graph builder.
    pub fn reindexer(&self, config: ReindexConfig) -> Reindexer {
        let source = self.source();
        let builder: Arc<dyn DocumentBuilder> =
            Arc::new(GraphDocumentBuilder::new(Arc::clone(&source)));
        self.reindexer_with(config, builder)
    }

    pub fn reindexer_with(
        &self,
        config: ReindexConfig,
        builder: Arc<dyn DocumentBuilder>,
    ) -> Reindexer {
        let indexer = SearchIndexer::new(&self.open_index()).expect("Failed to acquire writer");
        Reindexer::new(
            self.source(),
            builder,
            Arc::new(TantivySink::new(indexer)),
            config,
        )
    }

    /// Rebuild the given classes (all when empty) without export.
    pub fn rebuild(&self, config: ReindexConfig, classes: &[&str]) -> RunReport {
        let classes: Vec<SchemaClass> = classes.iter().map(|c| SchemaClass::from(*c)).collect();
        self.reindexer(config)
            .run(&classes)
            .expect("Rebuild failed to start")
    }

    pub fn export_path(&self, name: &str) -> PathBuf {
        self.export_dir.join(name)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Small, fast pipeline settings for tests.
pub fn test_config() -> ReindexConfig {
    ReindexConfig::default()
        .with_worker_threads(4)
        .with_queue_capacity(4)
        .with_batch_size(7)
        .with_progress_interval(5)
        .with_cache_eviction_interval(13)
        .with_flush_interval(3)
}

/// Fixed-date export header.
pub fn test_header(name: &str) -> ExportHeader {
    ExportHeader::new(
        name,
        "End-to-end test export",
        "42",
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date"),
    )
}

/// Export plan with no filtered stream.
pub fn file_export(path: PathBuf) -> ExportPlan {
    ExportPlan {
        header: test_header("Graph"),
        fields: Default::default(),
        target: reindex_pipeline::ExportTarget::File(path),
        filtered: None,
    }
}

/// A pathway/reaction graph.
///
/// - Pathway `p{i}` ("Pathway {i}") has every reaction `r{j}` with
///   `j % pathways == i` as a `hasEvent` relation and one GO cross-reference.
/// - Even pathways are human, odd pathways mouse.
/// - Reaction `r{j}` ("Reaction {j}") is human.
pub fn sample_graph(pathways: usize, reactions: usize) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(pathways + reactions);

    for i in 0..pathways {
        let events: Vec<EntityId> = (0..reactions)
            .filter(|j| j % pathways == i)
            .map(|j| EntityId::from(format!("r{}", j)))
            .collect();
        let species = if i % 2 == 0 { "Homo sapiens" } else { "Mus musculus" };
        entities.push(
            Entity::new(format!("p{}", i), "Pathway", format!("Pathway {}", i))
                .with_property("species", json!([species]))
                .with_property("description", json!(format!("Sample pathway number {}", i)))
                .with_property("keywords", json!(["signalling", format!("kw{}", i)]))
                .with_relation("hasEvent", events)
                .with_cross_reference(CrossReference::new("GO", format!("{:07}", i))),
        );
    }

    for j in 0..reactions {
        entities.push(
            Entity::new(format!("r{}", j), "Reaction", format!("Reaction {}", j))
                .with_property("species", json!(["Homo sapiens"]))
                .with_property("isChimeric", json!(false)),
        );
    }

    entities
}

/// Wraps a builder; listed ids build nothing or panic.
pub struct FaultyBuilder {
    inner: Arc<dyn DocumentBuilder>,
    absent: HashSet<String>,
    panicking: HashSet<String>,
}

impl FaultyBuilder {
    pub fn new(inner: Arc<dyn DocumentBuilder>) -> Self {
        Self {
            inner,
            absent: HashSet::new(),
            panicking: HashSet::new(),
        }
    }

    pub fn absent(mut self, id: &str) -> Self {
        self.absent.insert(id.to_string());
        self
    }

    pub fn panicking(mut self, id: &str) -> Self {
        self.panicking.insert(id.to_string());
        self
    }
}

impl DocumentBuilder for FaultyBuilder {
    fn build(&self, id: &EntityId) -> Result<Option<Document>, BuildError> {
        if self.absent.contains(id.as_str()) {
            return Ok(None);
        }
        if self.panicking.contains(id.as_str()) {
            panic!("builder blew up on {}", id);
        }
        self.inner.build(id)
    }
}
