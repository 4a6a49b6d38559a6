//! Streaming export sink worker.
//!
//! One scoped thread per class cycle. It borrows the export writers for the
//! duration of the cycle, so the next cycle (and finally the footer)
//! continues the same streams.

use std::thread::{self, ScopedJoinHandle};

use tracing::{debug, info, warn};

use reindex_types::{Document, ExportFieldMapping, SchemaClass};

use super::writer::ExportWriter;
use crate::relay::{RelayMessage, RelayReceiver};

/// Selects documents for the filtered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFilter {
    pub field: String,
    pub value: String,
}

impl ExportFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive containment on the configured field.
    pub fn matches(&self, document: &Document) -> bool {
        document.field_contains(&self.field, &self.value)
    }
}

/// The open export streams of a run.
pub struct ExportTargets {
    pub main: ExportWriter,
    pub filtered: Option<(ExportWriter, ExportFilter)>,
}

/// What the export worker did in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportWorkerReport {
    pub received: u64,
    /// Entries written to the main export
    pub written: u64,
    /// Entries written to the filtered export
    pub filtered_written: u64,
    /// Entries not written because a stream had failed
    pub skipped: u64,
    pub saw_end: bool,
}

/// Start the export worker for one class inside `scope`.
///
/// The worker borrows the run's export streams, so they stay with the
/// caller when the worker panics or cannot be spawned at all, and the
/// footer can still be written.
pub fn spawn_export_worker<'scope, 'env>(
    scope: &'scope thread::Scope<'scope, 'env>,
    class: SchemaClass,
    targets: &'scope mut ExportTargets,
    fields: &'scope ExportFieldMapping,
    receiver: RelayReceiver,
) -> std::io::Result<ScopedJoinHandle<'scope, ExportWorkerReport>> {
    thread::Builder::new()
        .name(format!("export-worker-{}", class))
        .spawn_scoped(scope, move || run(class, targets, fields, receiver))
}

fn run(
    class: SchemaClass,
    targets: &mut ExportTargets,
    fields: &ExportFieldMapping,
    mut receiver: RelayReceiver,
) -> ExportWorkerReport {
    debug!(class = %class, "Export worker started");
    let mut report = ExportWorkerReport::default();

    loop {
        let document = match receiver.recv() {
            Some(RelayMessage::Item(document)) => document,
            Some(RelayMessage::End) => {
                report.saw_end = true;
                break;
            }
            None => {
                warn!(class = %class, "Export queue closed without end marker");
                break;
            }
        };
        report.received += 1;

        if targets.main.write_entry(&document, fields) {
            report.written += 1;
        } else {
            report.skipped += 1;
        }

        if let Some((writer, filter)) = targets.filtered.as_mut() {
            if filter.matches(&document) {
                if writer.write_entry(&document, fields) {
                    report.filtered_written += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
    }

    info!(
        class = %class,
        received = report.received,
        written = report.written,
        filtered = report.filtered_written,
        "Export worker stopped"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::xml::ExportHeader;
    use crate::relay::relay_queue;
    use crate::test_support::SharedBuffer;
    use chrono::NaiveDate;

    fn header(name: &str) -> ExportHeader {
        ExportHeader::new(name, "d", "1", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    fn species(id: &str, species: &str) -> Document {
        Document::new(id, "Pathway")
            .with_field("name", format!("Pathway {}", id))
            .with_field("species", vec![species.to_string()])
    }

    /// Run one worker cycle over `documents` and return its report.
    fn drain(
        targets: &mut ExportTargets,
        capacity: usize,
        documents: Vec<Document>,
    ) -> thread::Result<ExportWorkerReport> {
        let fields = ExportFieldMapping::default();
        thread::scope(|scope| {
            let (tx, rx) = relay_queue("export", capacity);
            let handle =
                spawn_export_worker(scope, "Pathway".into(), targets, &fields, rx).unwrap();
            for document in documents {
                // A panicked worker has dropped its receiver.
                if tx.send(document).is_err() {
                    break;
                }
            }
            let _ = tx.end();
            drop(tx);
            handle.join()
        })
    }

    #[test]
    fn test_three_documents_then_end() {
        let buffer = SharedBuffer::new();
        let main = ExportWriter::from_writer(buffer.writer(), "main", &header("Graph"), 100).unwrap();
        let mut targets = ExportTargets {
            main,
            filtered: None,
        };

        let documents = ["1", "2", "3"]
            .iter()
            .map(|id| species(id, "Homo sapiens"))
            .collect();
        let report = drain(&mut targets, 8, documents).unwrap();
        assert!(report.saw_end);
        assert_eq!(report.written, 3);

        assert_eq!(targets.main.finish().unwrap(), 3);
        assert!(buffer.is_closed());

        let xml = buffer.contents();
        assert_eq!(xml.matches("<?xml").count(), 1);
        assert_eq!(xml.matches("<database>").count(), 1);
        assert_eq!(xml.matches("<entry id=").count(), 3);
        assert!(xml.ends_with("</entries>\n<entry_count>3</entry_count>\n</database>\n"));
    }

    #[test]
    fn test_filtered_stream_counts_independently() {
        let main_buf = SharedBuffer::new();
        let filtered_buf = SharedBuffer::new();
        let mut targets = ExportTargets {
            main: ExportWriter::from_writer(main_buf.writer(), "main", &header("Graph"), 10)
                .unwrap(),
            filtered: Some((
                ExportWriter::from_writer(filtered_buf.writer(), "human", &header("Human"), 10)
                    .unwrap(),
                ExportFilter::new("species", "homo"),
            )),
        };

        let documents = vec![
            species("1", "Homo sapiens"),
            species("2", "Mus musculus"),
            species("3", "HOMO SAPIENS"),
        ];
        let report = drain(&mut targets, 8, documents).unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(report.filtered_written, 2);

        let ExportTargets { main, filtered } = targets;
        let (filtered, _) = filtered.unwrap();
        assert_eq!(filtered.finish().unwrap(), 2);
        assert_eq!(main.finish().unwrap(), 3);
        assert!(filtered_buf.contents().contains("<name>Human</name>"));
        assert!(!filtered_buf.contents().contains("entry id=\"2\""));
    }

    #[test]
    fn test_keeps_draining_after_write_failure() {
        let buffer = SharedBuffer::new();
        let mut targets = ExportTargets {
            main: ExportWriter::from_writer(buffer.writer(), "main", &header("Graph"), 1).unwrap(),
            filtered: None,
        };
        buffer.break_pipe();

        let documents = ["1", "2", "3", "4"].iter().map(|id| species(id, "x")).collect();
        let report = drain(&mut targets, 1, documents).unwrap();
        assert_eq!(report.received, 4);
        assert_eq!(report.skipped, 4);
        assert!(targets.main.failure().is_some());
    }

    #[test]
    fn test_streams_survive_worker_panic() {
        let buffer = SharedBuffer::new();
        let mut targets = ExportTargets {
            main: ExportWriter::from_writer(buffer.writer(), "main", &header("Graph"), 1).unwrap(),
            filtered: None,
        };
        buffer.panic_once_on("<entry id=\"2\">");

        let documents = ["1", "2", "3"].iter().map(|id| species(id, "x")).collect();
        assert!(drain(&mut targets, 8, documents).is_err());

        assert_eq!(targets.main.entries(), 1);
        assert_eq!(targets.main.finish().unwrap(), 1);
        assert!(buffer
            .contents()
            .ends_with("<entry_count>1</entry_count>\n</database>\n"));
    }
}
