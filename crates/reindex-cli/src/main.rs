//! Graph Reindexer
//!
//! Rebuilds the full-text search index from the graph object store.
//!
//! # Usage
//!
//! ```bash
//! graph-reindexer run [--classes A,B] [--export] [--no-clear] [--threads N]
//! graph-reindexer import entities.jsonl
//! graph-reindexer stats [--json]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config dir>/graph-reindexer/config.toml)
//! 3. Environment variables (REINDEX_*)
//! 4. CLI flags
//!
//! Exits non-zero when the run recorded any failure.

use std::process::ExitCode;

use clap::Parser;

use reindex_cli::{execute, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
