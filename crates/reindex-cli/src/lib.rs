//! Graph reindexer command-line library.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (run, import, stats)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, RunArgs};
pub use commands::{
    apply_run_overrides, execute, export_plan, import_entities, init_logging, print_report,
    run_rebuild, show_stats, ImportSummary,
};
