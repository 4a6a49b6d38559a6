//! Incremental export file writer.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::{debug, error, info};

use reindex_types::{Document, ExportFieldMapping};

use super::xml::{render_entry, render_footer, render_header, ExportHeader};

/// One export stream: header once, entries as they arrive, footer at the end.
///
/// A failed entry write marks the stream failed; later entries are skipped
/// but still accepted so the caller can keep draining its queue.
pub struct ExportWriter {
    label: String,
    out: BufWriter<Box<dyn Write + Send>>,
    entries: u64,
    since_flush: u64,
    flush_interval: u64,
    failure: Option<String>,
}

impl ExportWriter {
    /// Create the file (and its parent directory) and write the header.
    pub fn create(
        path: &Path,
        label: impl Into<String>,
        header: &ExportHeader,
        flush_interval: u64,
    ) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!(path = ?path, "Opened export file");
        Self::from_writer(Box::new(file), label, header, flush_interval)
    }

    /// Wrap an already-open stream and write the header.
    pub fn from_writer(
        out: Box<dyn Write + Send>,
        label: impl Into<String>,
        header: &ExportHeader,
        flush_interval: u64,
    ) -> io::Result<Self> {
        let mut writer = Self {
            label: label.into(),
            out: BufWriter::new(out),
            entries: 0,
            since_flush: 0,
            flush_interval: flush_interval.max(1),
            failure: None,
        };
        writer.out.write_all(render_header(header).as_bytes())?;
        writer.out.flush()?;
        Ok(writer)
    }

    /// Append one entry. Returns whether it was written.
    pub fn write_entry(&mut self, document: &Document, fields: &ExportFieldMapping) -> bool {
        if self.failure.is_some() {
            return false;
        }

        let entry = render_entry(document, fields);
        if let Err(e) = self.out.write_all(entry.as_bytes()) {
            self.fail(&document.id, e);
            return false;
        }
        self.since_flush += 1;

        if self.since_flush >= self.flush_interval {
            self.since_flush = 0;
            if let Err(e) = self.out.flush() {
                self.fail(&document.id, e);
                return false;
            }
            debug!(export = %self.label, entries = self.entries + 1, "Flushed export");
        }
        self.entries += 1;
        true
    }

    fn fail(&mut self, id: &str, e: io::Error) {
        error!(export = %self.label, id, error = %e, "Export write failed, skipping further entries");
        self.failure = Some(e.to_string());
    }

    /// Write the footer with the entry count, flush, and close the stream.
    pub fn finish(mut self) -> io::Result<u64> {
        self.out.write_all(render_footer(self.entries).as_bytes())?;
        self.out.flush()?;
        info!(export = %self.label, entries = self.entries, "Closed export");
        Ok(self.entries)
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Why the stream stopped accepting entries, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
