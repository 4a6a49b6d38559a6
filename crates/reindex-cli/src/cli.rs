//! CLI argument parsing for the graph reindexer.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Graph Reindexer
///
/// Rebuilds the full-text search index (and optional XML export) from the
/// graph object store.
#[derive(Parser, Debug)]
#[command(name = "graph-reindexer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default <config dir>/graph-reindexer/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the index from the graph store
    Run(RunArgs),

    /// Load entities from a JSON Lines file into the graph store
    Import {
        /// JSON Lines file, one entity per line
        file: PathBuf,

        /// Override database path
        #[arg(long)]
        db_path: Option<String>,

        /// Entities per write batch
        #[arg(long, default_value = "1000")]
        batch: usize,
    },

    /// Show per-class entity counts and index size
    Stats {
        /// Override database path
        #[arg(long)]
        db_path: Option<String>,

        /// Override index path
        #[arg(long)]
        index_path: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for a rebuild run.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override database path
    #[arg(long)]
    pub db_path: Option<String>,

    /// Override index path
    #[arg(long)]
    pub index_path: Option<String>,

    /// Classes to rebuild, comma separated (default: configured, else all)
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<String>,

    /// Also write the XML export
    #[arg(long)]
    pub export: bool,

    /// Export file path (implies --export)
    #[arg(long)]
    pub export_path: Option<String>,

    /// Keep existing index documents instead of clearing first
    #[arg(long)]
    pub no_clear: bool,

    /// Producer threads (0 = one per core)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Capacity of each relay queue
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Documents per bulk add
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}
