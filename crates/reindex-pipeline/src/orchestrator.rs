//! Run orchestration: per-class cycles over a shared producer pool.
//!
//! ```text
//! clear sink -> open exports (headers)
//! for each class:
//!     list ids -> count -> spawn sink workers -> traverse (joined)
//!     -> End on every queue -> join workers -> commit -> evict cache
//! footers -> close sink
//! ```

use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use tracing::{error, info, warn};

use reindex_types::{ExportFieldMapping, SchemaClass};

use crate::config::ReindexConfig;
use crate::error::{ReindexError, SinkError};
use crate::export::{spawn_export_worker, ExportPlan, ExportTargets, ExportWriter};
use crate::index_worker::spawn_index_worker;
use crate::missing::MissingList;
use crate::progress::ProgressTracker;
use crate::relay::relay_queue;
use crate::report::{ClassReport, RunReport};
use crate::sink::{BulkSink, SinkQuery};
use crate::source::{DocumentBuilder, SourceProvider};
use crate::traversal::{panic_message, Producer, TraversalContext};

/// Full rebuild of a bulk sink (and optional export) from a source.
pub struct Reindexer {
    source: Arc<dyn SourceProvider>,
    builder: Arc<dyn DocumentBuilder>,
    sink: Arc<dyn BulkSink>,
    config: ReindexConfig,
    export: Option<ExportPlan>,
}

impl Reindexer {
    pub fn new(
        source: Arc<dyn SourceProvider>,
        builder: Arc<dyn DocumentBuilder>,
        sink: Arc<dyn BulkSink>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            source,
            builder,
            sink,
            config,
            export: None,
        }
    }

    /// Also stream every document into the export described by `plan`.
    pub fn with_export(mut self, plan: ExportPlan) -> Self {
        self.export = Some(plan);
        self
    }

    /// Rebuild the given classes in order. An empty slice means every class
    /// the source knows.
    ///
    /// Returns `Err` only for failures before any class starts (bad
    /// configuration, unopenable export, failed clear). Failures of
    /// individual classes and of the closing steps are collected in the
    /// report.
    pub fn run(mut self, classes: &[SchemaClass]) -> Result<RunReport, ReindexError> {
        let started = Instant::now();
        self.config.validate()?;

        let producer = Producer::new(
            self.config.worker_threads,
            self.config.progress_interval,
            self.config.cache_eviction_interval,
        )?;

        let classes = if classes.is_empty() {
            self.source.classes()?
        } else {
            classes.to_vec()
        };

        info!(
            classes = classes.len(),
            sink = self.sink.name(),
            producer_threads = producer.threads(),
            queue_capacity = self.config.queue_capacity,
            "Starting rebuild"
        );

        if self.config.clear_first {
            self.sink.delete_by_query(&SinkQuery::All)?;
            info!(sink = self.sink.name(), "Cleared sink");
        }

        let (mut exports, fields) = match self.export.take() {
            Some(plan) => {
                let (targets, fields) = open_exports(plan, self.config.flush_interval)?;
                (Some(targets), fields)
            }
            None => (None, ExportFieldMapping::default()),
        };

        let mut report = RunReport::default();
        // The clear only becomes durable with the first successful commit.
        let mut clear_pending = self.config.clear_first;
        for class in &classes {
            match self.run_class(&producer, class, &mut exports, &fields) {
                Ok(class_report) => {
                    report.classes.push(class_report);
                    clear_pending = false;
                }
                Err(e) => {
                    error!(class = %class, error = %e, "Class cycle failed");
                    report.record_failure(Some(class.as_str()), e.to_string());
                    if let Err(e) = self.discard_uncommitted(clear_pending) {
                        error!(class = %class, error = %e, "Discarding class writes failed");
                        report.record_failure(
                            Some(class.as_str()),
                            format!("discarding uncommitted writes: {}", e),
                        );
                    }
                }
            }
        }

        if let Some(targets) = exports {
            finish_exports(targets, &mut report);
        }

        if let Err(e) = self.sink.close() {
            error!(error = %e, "Closing sink failed");
            report.record_failure(None, format!("closing sink: {}", e));
        }

        report.elapsed = started.elapsed();
        info!(
            classes = report.classes.len(),
            indexed = report.total_indexed(),
            missing = report.missing().count(),
            dropped = report.dropped().count(),
            failures = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Rebuild finished"
        );
        Ok(report)
    }

    /// Roll back whatever a failed class left in the sink so it is not
    /// committed along with the next class. A rollback also drops a clear
    /// that no commit has made durable yet, so that clear is issued again.
    fn discard_uncommitted(&self, reclear: bool) -> Result<(), SinkError> {
        self.sink.rollback()?;
        if reclear {
            self.sink.delete_by_query(&SinkQuery::All)?;
        }
        warn!(sink = self.sink.name(), reclear, "Rolled back uncommitted class writes");
        Ok(())
    }

    fn run_class(
        &self,
        producer: &Producer,
        class: &SchemaClass,
        exports: &mut Option<ExportTargets>,
        fields: &ExportFieldMapping,
    ) -> Result<ClassReport, ReindexError> {
        let started = Instant::now();

        let ids = self.source.list_identifiers(class)?;
        let expected = match self.source.count_entries(class) {
            Ok(count) => count,
            Err(e) => {
                warn!(class = %class, error = %e, "Count failed, using listed id count");
                ids.len() as u64
            }
        };
        info!(class = %class, ids = ids.len(), expected, "Starting class cycle");

        let progress = ProgressTracker::new(class.as_str(), expected, self.config.show_progress);
        let missing = MissingList::new();

        let (index_tx, index_rx) = relay_queue("index", self.config.queue_capacity);
        let index_handle = spawn_index_worker(
            class.clone(),
            Arc::clone(&self.sink),
            index_rx,
            self.config.batch_size,
        )
        .map_err(|e| ReindexError::Unexpected(format!("spawning index worker: {}", e)))?;

        let filtered_configured = exports
            .as_ref()
            .is_some_and(|targets| targets.filtered.is_some());

        // The export worker borrows the streams; they stay in `exports`
        // whatever happens to the worker.
        let (stats, export_joined) = thread::scope(|scope| {
            let mut queues = vec![index_tx];
            let export_handle = match exports.as_mut() {
                Some(targets) => {
                    let (export_tx, export_rx) =
                        relay_queue("export", self.config.queue_capacity);
                    let handle =
                        spawn_export_worker(scope, class.clone(), targets, fields, export_rx)
                            .map_err(|e| {
                                ReindexError::Unexpected(format!(
                                    "spawning export worker: {}",
                                    e
                                ))
                            })?;
                    queues.push(export_tx);
                    Some(handle)
                }
                None => None,
            };

            let ctx = TraversalContext {
                class,
                source: self.source.as_ref(),
                builder: self.builder.as_ref(),
                queues: &queues,
                progress: &progress,
                missing: &missing,
            };
            let stats = producer.traverse(&ids, &ctx);

            for queue in &queues {
                if let Err(e) = queue.end() {
                    warn!(class = %class, error = %e, "End marker not delivered");
                }
            }
            drop(queues);

            Ok::<_, ReindexError>((stats, export_handle.map(ScopedJoinHandle::join)))
        })?;

        let index_joined = index_handle.join();
        progress.finish();

        // Panics fail the class before its commit, so its writes are rolled
        // back with it.
        let index_report = index_joined.map_err(|payload| {
            ReindexError::Unexpected(format!(
                "index worker panicked: {}",
                panic_message(payload.as_ref())
            ))
        })?;
        let export_report = export_joined
            .transpose()
            .map_err(|payload| {
                ReindexError::Unexpected(format!(
                    "export worker panicked: {}",
                    panic_message(payload.as_ref())
                ))
            })?;

        self.sink.commit()?;
        info!(class = %class, indexed = index_report.written, "Committed class");

        if self.config.evict_after_class {
            self.source.clear_cache();
        }

        let missing = missing.into_sorted();
        if !missing.is_empty() {
            warn!(class = %class, count = missing.len(), "Ids produced no document");
        }

        Ok(ClassReport {
            class: class.to_string(),
            expected,
            attempted: stats.attempted,
            built: stats.built,
            missing,
            indexed: index_report.written,
            dropped: index_report.dropped,
            batch_failures: index_report.batch_failures,
            exported: export_report.as_ref().map(|r| r.written),
            filtered_exported: export_report
                .as_ref()
                .filter(|_| filtered_configured)
                .map(|r| r.filtered_written),
            send_failures: stats.send_failures,
            evictions: stats.evictions,
            elapsed: started.elapsed(),
        })
    }
}

fn open_exports(
    plan: ExportPlan,
    flush_interval: u64,
) -> Result<(ExportTargets, ExportFieldMapping), ReindexError> {
    let main = plan
        .target
        .open("main", &plan.header, flush_interval)
        .map_err(|e| ReindexError::Configuration(format!("opening export: {}", e)))?;

    let filtered = match plan.filtered {
        Some(filtered) => {
            let writer = filtered
                .target
                .open("filtered", &filtered.header, flush_interval)
                .map_err(|e| {
                    ReindexError::Configuration(format!("opening filtered export: {}", e))
                })?;
            Some((writer, filtered.filter))
        }
        None => None,
    };

    Ok((ExportTargets { main, filtered }, plan.fields))
}

fn finish_exports(targets: ExportTargets, report: &mut RunReport) {
    let ExportTargets { main, filtered } = targets;

    let entries = finish_export(main, report);
    report.export_entries = entries;
    if let Some((writer, _)) = filtered {
        let entries = finish_export(writer, report);
        report.filtered_entries = entries;
    }
}

fn finish_export(writer: ExportWriter, report: &mut RunReport) -> Option<u64> {
    if let Some(failure) = writer.failure() {
        report.record_failure(None, format!("export '{}' failed: {}", writer.label(), failure));
    }
    let label = writer.label().to_string();
    match writer.finish() {
        Ok(count) => Some(count),
        Err(e) => {
            error!(export = %label, error = %e, "Writing export footer failed");
            report.record_failure(None, format!("export '{}' footer: {}", label, e));
            None
        }
    }
}
