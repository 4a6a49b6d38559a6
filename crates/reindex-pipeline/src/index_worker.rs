//! Bulk index sink worker.
//!
//! One thread per class cycle. Drains its relay queue into batched
//! `add_many` calls until it sees [`RelayMessage::End`]. A failed batch is
//! retried item by item; an item failing transiently gets one more try. An
//! item that still fails is logged and dropped, never requeued.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use reindex_types::{Document, SchemaClass};

use crate::relay::{RelayMessage, RelayReceiver};
use crate::sink::BulkSink;

/// What the index worker did in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexWorkerReport {
    /// Documents dequeued
    pub received: u64,
    /// Documents the sink accepted
    pub written: u64,
    /// Ids given up on after retry
    pub dropped: Vec<String>,
    /// `add_many` calls made
    pub batches: u64,
    /// `add_many` calls that failed and fell back to single writes
    pub batch_failures: u64,
    /// Whether the cycle ended with an end marker
    pub saw_end: bool,
}

/// Start the index worker thread for one class.
pub fn spawn_index_worker(
    class: SchemaClass,
    sink: Arc<dyn BulkSink>,
    receiver: RelayReceiver,
    batch_size: usize,
) -> std::io::Result<JoinHandle<IndexWorkerReport>> {
    let name = format!("index-worker-{}", class);
    let worker = IndexWorker {
        class,
        sink,
        batch_size: batch_size.max(1),
        batch: Vec::with_capacity(batch_size.max(1)),
        report: IndexWorkerReport::default(),
    };
    thread::Builder::new()
        .name(name)
        .spawn(move || worker.run(receiver))
}

struct IndexWorker {
    class: SchemaClass,
    sink: Arc<dyn BulkSink>,
    batch_size: usize,
    batch: Vec<Document>,
    report: IndexWorkerReport,
}

impl IndexWorker {
    fn run(mut self, mut receiver: RelayReceiver) -> IndexWorkerReport {
        debug!(class = %self.class, sink = self.sink.name(), "Index worker started");

        loop {
            match receiver.recv() {
                Some(RelayMessage::Item(document)) => {
                    self.report.received += 1;
                    self.batch.push(document);
                    if self.batch.len() >= self.batch_size {
                        self.flush();
                    }
                }
                Some(RelayMessage::End) => {
                    self.report.saw_end = true;
                    break;
                }
                None => {
                    warn!(class = %self.class, "Index queue closed without end marker");
                    break;
                }
            }
        }
        self.flush();

        info!(
            class = %self.class,
            received = self.report.received,
            written = self.report.written,
            dropped = self.report.dropped.len(),
            batch_failures = self.report.batch_failures,
            "Index worker stopped"
        );
        self.report
    }

    fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        self.report.batches += 1;

        match self.sink.add_many(&batch) {
            Ok(()) => {
                self.report.written += batch.len() as u64;
                debug!(class = %self.class, count = batch.len(), "Wrote batch");
            }
            Err(e) => {
                self.report.batch_failures += 1;
                warn!(
                    class = %self.class,
                    count = batch.len(),
                    error = %e,
                    "Batch write failed, retrying items individually"
                );
                for document in &batch {
                    self.write_one(document);
                }
            }
        }
    }

    fn write_one(&mut self, document: &Document) {
        let result = match self.sink.add_one(document) {
            Err(e) if e.is_transient() => {
                debug!(id = %document.id, error = %e, "Transient write failure, retrying once");
                self.sink.add_one(document)
            }
            other => other,
        };

        match result {
            Ok(()) => self.report.written += 1,
            Err(e) => {
                error!(class = %self.class, id = %document.id, error = %e, "Dropping document");
                self.report.dropped.push(document.id.clone());
            }
        }
    }
}
