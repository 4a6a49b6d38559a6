//! Batch rebuild pipeline for the graph reindexer.
//!
//! Moves every entity of every requested schema class from a source into
//! a bulk index and, optionally, a streamed XML export.
//!
//! ## Key Components
//!
//! - [`SourceProvider`] / [`DocumentBuilder`]: where documents come from
//! - [`BulkSink`]: where indexed documents go
//! - [`Producer`]: parallel traversal over one class's ids on a long-lived pool
//! - [`relay_queue`]: bounded single-consumer channel between producer and a sink worker
//! - [`spawn_index_worker`] / [`spawn_export_worker`]: one thread per sink role per class
//! - [`Reindexer`]: sequences the per-class cycles and writes the export footer
//!
//! ## Cycle
//!
//! For each class: list ids, start the sink workers, run the producer to
//! completion, send one [`RelayMessage::End`] per queue, join the workers,
//! commit the sink. A failing entity is recorded as missing; a failing class
//! is recorded in the [`RunReport`] and the next class still runs.
//!
//! All queue operations block the calling thread. Do not drive the pipeline
//! from inside an async runtime.

pub mod config;
pub mod error;
pub mod export;
pub mod graph_builder;
pub mod graph_source;
pub mod index_worker;
pub mod missing;
pub mod orchestrator;
pub mod progress;
pub mod relay;
pub mod report;
pub mod sink;
pub mod source;
pub mod tantivy_sink;
pub mod traversal;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ReindexConfig;
pub use error::{BuildError, RelayClosed, ReindexError, SinkError, SourceError};
pub use export::{
    spawn_export_worker, ExportFilter, ExportHeader, ExportPlan, ExportTarget, ExportTargets,
    ExportWorkerReport, ExportWriter, FilteredExportPlan,
};
pub use graph_builder::GraphDocumentBuilder;
pub use graph_source::GraphSource;
pub use index_worker::{spawn_index_worker, IndexWorkerReport};
pub use missing::{MissingEntity, MissingList, MissingReason};
pub use orchestrator::Reindexer;
pub use progress::ProgressTracker;
pub use relay::{relay_queue, RelayMessage, RelayReceiver, RelaySender};
pub use report::{ClassReport, RunFailure, RunReport};
pub use sink::{BulkSink, SinkQuery};
pub use source::{DocumentBuilder, SourceProvider};
pub use tantivy_sink::TantivySink;
pub use traversal::{Producer, TraversalContext, TraversalStats};
