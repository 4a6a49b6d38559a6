//! Configuration loading for the graph reindexer.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config dir>/graph-reindexer/config.toml`.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DomainError;

/// Tuning knobs for the batch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Capacity of each relay queue between producer and sink workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Producer threads. 0 means one per available core.
    #[serde(default)]
    pub worker_threads: usize,

    /// Documents per bulk write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts between progress updates.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Attempts between source cache evictions.
    #[serde(default = "default_cache_eviction_interval")]
    pub cache_eviction_interval: u64,

    /// Export entries between flushes.
    #[serde(default = "default_flush_interval")]
    pub flush_interval: u64,

    /// Delete every document from the index before the first class.
    #[serde(default = "default_true")]
    pub clear_first: bool,

    /// Evict the source cache once more after each class commits.
    #[serde(default = "default_true")]
    pub evict_after_class: bool,

    /// Draw a live progress bar on the terminal.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_interval() -> u64 {
    100
}

fn default_cache_eviction_interval() -> u64 {
    10_000
}

fn default_flush_interval() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            worker_threads: 0,
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            cache_eviction_interval: default_cache_eviction_interval(),
            flush_interval: default_flush_interval(),
            clear_first: true,
            evict_after_class: true,
            show_progress: true,
        }
    }
}

/// Which document fields feed which parts of an export entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFieldMapping {
    /// Field rendered as the entry name
    #[serde(default = "default_name_field")]
    pub name_field: String,

    /// Field rendered as the optional entry description
    #[serde(default = "default_description_field")]
    pub description_field: String,

    /// List field holding `dbname:dbkey` cross-references
    #[serde(default = "default_cross_reference_field")]
    pub cross_reference_field: String,

    /// Fields rendered in the additional-fields block, in this order
    #[serde(default = "default_additional_fields")]
    pub additional_fields: Vec<String>,
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_description_field() -> String {
    "description".to_string()
}

fn default_cross_reference_field() -> String {
    "cross_references".to_string()
}

fn default_additional_fields() -> Vec<String> {
    vec!["species".to_string(), "keywords".to_string()]
}

impl Default for ExportFieldMapping {
    fn default() -> Self {
        Self {
            name_field: default_name_field(),
            description_field: default_description_field(),
            cross_reference_field: default_cross_reference_field(),
            additional_fields: default_additional_fields(),
        }
    }
}

/// Second export file holding only documents that match a filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredExportSettings {
    /// Output path of the filtered export
    pub path: String,

    /// Document field tested by the filter
    pub field: String,

    /// Case-insensitive substring the field must contain
    pub value: String,

    /// Database name written in the filtered header
    #[serde(default)]
    pub name: Option<String>,
}

/// Bulk export file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Generate the export file at all
    #[serde(default)]
    pub enabled: bool,

    /// Output path of the main export
    #[serde(default = "default_export_path")]
    pub path: String,

    /// Database name written in the header
    #[serde(default = "default_export_name")]
    pub name: String,

    /// Free-text description written in the header
    #[serde(default)]
    pub description: String,

    /// Release number written in the header
    #[serde(default = "default_release")]
    pub release: String,

    #[serde(default)]
    pub filtered: Option<FilteredExportSettings>,

    #[serde(default)]
    pub fields: ExportFieldMapping,
}

fn default_export_path() -> String {
    "./export.xml".to_string()
}

fn default_export_name() -> String {
    "graph-reindexer".to_string()
}

fn default_release() -> String {
    "1".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_export_path(),
            name: default_export_name(),
            description: String::new(),
            release: default_release(),
            filtered: None,
            fields: ExportFieldMapping::default(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB graph store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the Tantivy index directory
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Memory budget for the index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Index writer threads. Unset lets the index pick from the budget.
    #[serde(default)]
    pub writer_threads: Option<usize>,

    /// Schema classes to rebuild, in order. Empty means every class in the store.
    #[serde(default)]
    pub classes: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

fn data_dir_or(fallback: &str, child: &str) -> String {
    ProjectDirs::from("", "", "graph-reindexer")
        .map(|p| p.data_local_dir().join(child))
        .unwrap_or_else(|| PathBuf::from(fallback))
        .to_string_lossy()
        .to_string()
}

fn default_db_path() -> String {
    data_dir_or("./graph-db", "graph-db")
}

fn default_index_path() -> String {
    data_dir_or("./search-index", "search-index")
}

fn default_writer_memory_mb() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_path: default_index_path(),
            writer_memory_mb: default_writer_memory_mb(),
            writer_threads: None,
            classes: Vec::new(),
            log_level: default_log_level(),
            pipeline: PipelineSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (<config dir>/graph-reindexer/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (REINDEX_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DomainError> {
        let config_dir = ProjectDirs::from("", "", "graph-reindexer")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let defaults = Config::try_from(&Settings::default())
            .map_err(|e| DomainError::Config(e.to_string()))?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: REINDEX_DB_PATH, REINDEX_PIPELINE__QUEUE_CAPACITY, REINDEX_CLASSES=A,B
        builder = builder.add_source(
            Environment::with_prefix("REINDEX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("classes")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| DomainError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| DomainError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would stall or misconfigure the pipeline.
    pub fn validate(&self) -> Result<(), DomainError> {
        let p = &self.pipeline;
        if p.queue_capacity == 0 {
            return Err(DomainError::Config("pipeline.queue_capacity must be > 0".into()));
        }
        if p.batch_size == 0 {
            return Err(DomainError::Config("pipeline.batch_size must be > 0".into()));
        }
        if p.progress_interval == 0 {
            return Err(DomainError::Config(
                "pipeline.progress_interval must be > 0".into(),
            ));
        }
        if p.cache_eviction_interval == 0 {
            return Err(DomainError::Config(
                "pipeline.cache_eviction_interval must be > 0".into(),
            ));
        }
        if p.flush_interval == 0 {
            return Err(DomainError::Config("pipeline.flush_interval must be > 0".into()));
        }
        if self.writer_memory_mb == 0 {
            return Err(DomainError::Config("writer_memory_mb must be > 0".into()));
        }
        if self.writer_threads == Some(0) {
            return Err(DomainError::Config("writer_threads must be > 0".into()));
        }
        if let Some(filtered) = &self.export.filtered {
            if filtered.field.is_empty() || filtered.value.is_empty() {
                return Err(DomainError::Config(
                    "export.filtered requires both field and value".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    pub fn expanded_index_path(&self) -> PathBuf {
        expand_home(&self.index_path)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
