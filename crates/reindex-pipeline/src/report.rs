//! Run and per-class reports.

use std::time::Duration;

use crate::missing::MissingEntity;

/// Outcome of one class cycle.
#[derive(Debug, Clone, Default)]
pub struct ClassReport {
    pub class: String,
    /// Entry count reported by the source before traversal
    pub expected: u64,
    pub attempted: u64,
    pub built: u64,
    pub missing: Vec<MissingEntity>,
    /// Documents the bulk sink accepted
    pub indexed: u64,
    /// Ids the index worker gave up on
    pub dropped: Vec<String>,
    pub batch_failures: u64,
    /// Entries written to the main export, if exporting
    pub exported: Option<u64>,
    /// Entries written to the filtered export, if configured
    pub filtered_exported: Option<u64>,
    pub send_failures: u64,
    pub evictions: u64,
    pub elapsed: Duration,
}

/// A class or run step that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Class being processed, `None` for run-level steps
    pub class: Option<String>,
    pub message: String,
}

/// Outcome of a whole rebuild run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub classes: Vec<ClassReport>,
    pub failures: Vec<RunFailure>,
    /// Final entry count of the main export
    pub export_entries: Option<u64>,
    /// Final entry count of the filtered export
    pub filtered_entries: Option<u64>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_indexed(&self) -> u64 {
        self.classes.iter().map(|c| c.indexed).sum()
    }

    pub fn total_attempted(&self) -> u64 {
        self.classes.iter().map(|c| c.attempted).sum()
    }

    /// Every missing id across all classes, in class order.
    pub fn missing(&self) -> impl Iterator<Item = &MissingEntity> {
        self.classes.iter().flat_map(|c| c.missing.iter())
    }

    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.classes
            .iter()
            .flat_map(|c| c.dropped.iter().map(String::as_str))
    }

    pub(crate) fn record_failure(&mut self, class: Option<&str>, message: impl Into<String>) {
        self.failures.push(RunFailure {
            class: class.map(str::to_string),
            message: message.into(),
        });
    }
}
