//! Command implementations for the graph reindexer.
//!
//! Handles:
//! - run: Load config, open store and index, rebuild, print the summary
//! - import: Load JSON Lines entities into the store
//! - stats: Per-class counts from the store and the index

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use reindex_pipeline::{
    DocumentBuilder, ExportFilter, ExportHeader, ExportPlan, ExportTarget, FilteredExportPlan,
    GraphDocumentBuilder, GraphSource, ReindexConfig, Reindexer, RunReport, SourceProvider,
    TantivySink,
};
use reindex_search::{IndexConfig, IndexInspector, SearchIndex, SearchIndexer};
use reindex_store::GraphStore;
use reindex_types::config::expand_home;
use reindex_types::{Entity, ExportSettings, SchemaClass, Settings};

use crate::cli::{Cli, Commands, RunArgs};

/// Dispatch a parsed command line. Returns whether the command succeeded
/// without recorded failures.
pub fn execute(cli: Cli) -> Result<bool> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Run(args) => {
            apply_run_overrides(&mut settings, &args);
            let report = run_rebuild(&settings)?;
            print_report(&report);
            Ok(report.is_success())
        }
        Commands::Import {
            file,
            db_path,
            batch,
        } => {
            if let Some(db_path) = db_path {
                settings.db_path = db_path;
            }
            let summary = import_entities(&settings.expanded_db_path(), &file, batch)?;
            println!(
                "Imported {} entities ({} new) from {:?}",
                summary.read, summary.created, file
            );
            Ok(true)
        }
        Commands::Stats {
            db_path,
            index_path,
            json,
        } => {
            if let Some(db_path) = db_path {
                settings.db_path = db_path;
            }
            if let Some(index_path) = index_path {
                settings.index_path = index_path;
            }
            show_stats(&settings, json)?;
            Ok(true)
        }
    }
}

/// Initialize the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Apply `run` flags on top of the loaded settings (highest precedence).
pub fn apply_run_overrides(settings: &mut Settings, args: &RunArgs) {
    if let Some(db_path) = &args.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(index_path) = &args.index_path {
        settings.index_path = index_path.clone();
    }
    if !args.classes.is_empty() {
        settings.classes = args.classes.clone();
    }
    if args.export {
        settings.export.enabled = true;
    }
    if let Some(path) = &args.export_path {
        settings.export.enabled = true;
        settings.export.path = path.clone();
    }
    if args.no_clear {
        settings.pipeline.clear_first = false;
    }
    if let Some(threads) = args.threads {
        settings.pipeline.worker_threads = threads;
    }
    if let Some(capacity) = args.queue_capacity {
        settings.pipeline.queue_capacity = capacity;
    }
    if let Some(batch_size) = args.batch_size {
        settings.pipeline.batch_size = batch_size;
    }
    if args.quiet {
        settings.pipeline.show_progress = false;
    }
}

/// Describe the export streams configured in `export`, dated today.
pub fn export_plan(export: &ExportSettings) -> ExportPlan {
    let filtered = export.filtered.as_ref().map(|f| FilteredExportPlan {
        header: ExportHeader::today(
            f.name
                .clone()
                .unwrap_or_else(|| format!("{} ({})", export.name, f.value)),
            export.description.as_str(),
            export.release.as_str(),
        ),
        filter: ExportFilter::new(f.field.as_str(), f.value.as_str()),
        target: ExportTarget::File(expand_home(&f.path)),
    });

    ExportPlan {
        header: ExportHeader::today(
            export.name.as_str(),
            export.description.as_str(),
            export.release.as_str(),
        ),
        fields: export.fields.clone(),
        target: ExportTarget::File(expand_home(&export.path)),
        filtered,
    }
}

/// Run a full rebuild from the graph store into the search index.
pub fn run_rebuild(settings: &Settings) -> Result<RunReport> {
    settings.validate()?;

    let db_path = settings.expanded_db_path();
    anyhow::ensure!(db_path.exists(), "Graph store not found at {:?}", db_path);
    let index_path = settings.expanded_index_path();

    info!("Graph reindexer starting...");
    info!("  Database path: {:?}", db_path);
    info!("  Index path: {:?}", index_path);
    if settings.export.enabled {
        info!("  Export path: {}", settings.export.path);
    }

    let store = Arc::new(GraphStore::open(&db_path).context("Failed to open graph store")?);
    let index = SearchIndex::open_or_create(
        IndexConfig::new(&index_path)
            .with_memory_mb(settings.writer_memory_mb)
            .with_writer_threads(settings.writer_threads),
    )
    .context("Failed to open search index")?;
    if index.created() {
        info!(path = ?index.path(), "Rebuilding into a new index");
    }
    let indexer = SearchIndexer::new(&index).context("Failed to acquire index writer")?;

    let source: Arc<dyn SourceProvider> = Arc::new(GraphSource::new(Arc::clone(&store)));
    let builder: Arc<dyn DocumentBuilder> = Arc::new(
        GraphDocumentBuilder::new(Arc::clone(&source))
            .with_cross_reference_field(settings.export.fields.cross_reference_field.as_str()),
    );
    let sink = Arc::new(TantivySink::new(indexer));

    let mut reindexer = Reindexer::new(
        source,
        builder,
        sink,
        ReindexConfig::from(&settings.pipeline),
    );
    if settings.export.enabled {
        reindexer = reindexer.with_export(export_plan(&settings.export));
    }

    let classes: Vec<SchemaClass> = settings
        .classes
        .iter()
        .map(|c| SchemaClass::from(c.as_str()))
        .collect();

    let report = reindexer.run(&classes)?;
    Ok(report)
}

/// Human-readable end-of-run summary on stdout.
pub fn print_report(report: &RunReport) {
    println!("Rebuild summary:");
    for class in &report.classes {
        println!(
            "  {:<24} {:>8} indexed / {:>8} expected  {:>6} missing  {:>6} dropped  {:.1?}",
            class.class,
            class.indexed,
            class.expected,
            class.missing.len(),
            class.dropped.len(),
            class.elapsed
        );
    }

    let missing: Vec<_> = report.missing().collect();
    if !missing.is_empty() {
        println!("Missing ids ({}):", missing.len());
        for entity in missing {
            println!("  {} [{}] {}", entity.id, entity.class, entity.reason);
        }
    }

    let dropped: Vec<&str> = report.dropped().collect();
    if !dropped.is_empty() {
        println!("Dropped by the index ({}): {}", dropped.len(), dropped.join(", "));
    }

    if let Some(entries) = report.export_entries {
        println!("Export entries: {}", entries);
    }
    if let Some(entries) = report.filtered_entries {
        println!("Filtered export entries: {}", entries);
    }

    for failure in &report.failures {
        match &failure.class {
            Some(class) => println!("FAILED {}: {}", class, failure.message),
            None => println!("FAILED: {}", failure.message),
        }
    }

    println!(
        "Total: {} indexed of {} attempted in {:.1?}",
        report.total_indexed(),
        report.total_attempted(),
        report.elapsed
    );
}

/// Result of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entities read from the file
    pub read: usize,
    /// Entities not previously in the store
    pub created: usize,
}

/// Load entities from a JSON Lines file into the store at `db_path`.
///
/// Blank lines are skipped. A malformed line aborts the import; batches
/// already written stay written.
pub fn import_entities(db_path: &Path, file: &Path, batch: usize) -> Result<ImportSummary> {
    anyhow::ensure!(batch > 0, "batch must be > 0");
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let store = GraphStore::open(db_path).context("Failed to open graph store")?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {:?}", file))?,
    );

    let mut summary = ImportSummary::default();
    let mut pending: Vec<Entity> = Vec::with_capacity(batch);

    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let entity: Entity = serde_json::from_str(&line)
            .with_context(|| format!("Invalid entity on line {}", number + 1))?;
        pending.push(entity);

        if pending.len() >= batch {
            summary.created += store.put_entities(&pending)?;
            summary.read += pending.len();
            pending.clear();
        }
    }

    if !pending.is_empty() {
        summary.created += store.put_entities(&pending)?;
        summary.read += pending.len();
    }
    store.flush()?;

    info!(read = summary.read, created = summary.created, "Import finished");
    Ok(summary)
}

/// Print store and index statistics.
pub fn show_stats(settings: &Settings, json: bool) -> Result<()> {
    let db_path = settings.expanded_db_path();
    anyhow::ensure!(db_path.exists(), "Graph store not found at {:?}", db_path);
    let store = GraphStore::open(&db_path).context("Failed to open graph store")?;
    let stats = store.stats()?;

    let index_path = settings.expanded_index_path();
    let inspector = match SearchIndex::open_existing(IndexConfig::new(&index_path))? {
        Some(index) => Some(IndexInspector::new(&index)?),
        None => {
            warn!("No search index at {:?}", index_path);
            None
        }
    };

    let mut classes = Vec::with_capacity(stats.class_counts.len());
    for (class, count) in &stats.class_counts {
        let indexed = match &inspector {
            Some(inspector) => Some(inspector.count_class(class)?),
            None => None,
        };
        classes.push((class.as_str(), *count, indexed));
    }

    if json {
        let value = serde_json::json!({
            "entity_count": stats.entity_count,
            "disk_usage_bytes": stats.disk_usage_bytes,
            "indexed_documents": inspector.as_ref().map(|i| i.num_docs()),
            "classes": classes
                .iter()
                .map(|(class, count, indexed)| serde_json::json!({
                    "class": class,
                    "entities": count,
                    "indexed": indexed,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Graph store: {:?}", db_path);
    println!("  Entities: {}", stats.entity_count);
    println!("  Disk usage: {} bytes", stats.disk_usage_bytes);
    match &inspector {
        Some(inspector) => println!("Search index: {} documents", inspector.num_docs()),
        None => println!("Search index: not built"),
    }
    for (class, count, indexed) in classes {
        match indexed {
            Some(indexed) => println!("  {:<24} {:>8} entities {:>8} indexed", class, count, indexed),
            None => println!("  {:<24} {:>8} entities", class, count),
        }
    }
    Ok(())
}
