//! Streamed XML export sink.
//!
//! The orchestrator opens the export streams once per run ([`ExportPlan`]),
//! lends them to one [`spawn_export_worker`] thread per class cycle, and
//! writes the footer after the last cycle.

pub mod worker;
pub mod writer;
pub mod xml;

use std::io::Write;
use std::path::PathBuf;

use reindex_types::ExportFieldMapping;

pub use worker::{spawn_export_worker, ExportFilter, ExportTargets, ExportWorkerReport};
pub use writer::ExportWriter;
pub use xml::ExportHeader;

/// Where an export stream goes.
pub enum ExportTarget {
    File(PathBuf),
    Stream(Box<dyn Write + Send>),
}

impl ExportTarget {
    /// Open the target and write its header.
    pub fn open(
        self,
        label: &str,
        header: &ExportHeader,
        flush_interval: u64,
    ) -> std::io::Result<ExportWriter> {
        match self {
            ExportTarget::File(path) => ExportWriter::create(&path, label, header, flush_interval),
            ExportTarget::Stream(out) => {
                ExportWriter::from_writer(out, label, header, flush_interval)
            }
        }
    }
}

/// Second export receiving only documents that match a filter.
pub struct FilteredExportPlan {
    pub header: ExportHeader,
    pub filter: ExportFilter,
    pub target: ExportTarget,
}

/// Export streams to open at the start of a run.
pub struct ExportPlan {
    pub header: ExportHeader,
    pub fields: ExportFieldMapping,
    pub target: ExportTarget,
    pub filtered: Option<FilteredExportPlan>,
}
