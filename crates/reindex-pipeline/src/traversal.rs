//! Producer: parallel traversal over one class's ids.
//!
//! Each id is built on the producer pool and the resulting document is
//! routed to every relay queue of the cycle. An id that yields no document,
//! fails, or panics is recorded as missing and the traversal moves on.
//! [`Producer::traverse`] returns only after every id has been handled, so
//! the caller can send the end markers right after it.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use reindex_types::{Document, EntityId, SchemaClass};

use crate::error::ReindexError;
use crate::missing::{MissingList, MissingReason};
use crate::progress::ProgressTracker;
use crate::relay::RelaySender;
use crate::source::{DocumentBuilder, SourceProvider};

/// Everything one class traversal reads from or writes to.
pub struct TraversalContext<'a> {
    pub class: &'a SchemaClass,
    pub source: &'a dyn SourceProvider,
    pub builder: &'a dyn DocumentBuilder,
    /// One queue per sink role
    pub queues: &'a [RelaySender],
    pub progress: &'a ProgressTracker,
    pub missing: &'a MissingList,
}

/// Counters from one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub attempted: u64,
    pub built: u64,
    pub missing: u64,
    /// Sends dropped because a queue's consumer was gone
    pub send_failures: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    attempted: AtomicU64,
    built: AtomicU64,
    missing: AtomicU64,
    send_failures: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TraversalStats {
        TraversalStats {
            attempted: self.attempted.load(Ordering::Relaxed),
            built: self.built.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Long-lived producer pool, built once per run.
pub struct Producer {
    pool: ThreadPool,
    progress_interval: u64,
    cache_eviction_interval: u64,
}

impl Producer {
    /// Build the producer pool. `worker_threads == 0` means one per core.
    pub fn new(
        worker_threads: usize,
        progress_interval: u64,
        cache_eviction_interval: u64,
    ) -> Result<Self, ReindexError> {
        if progress_interval == 0 || cache_eviction_interval == 0 {
            return Err(ReindexError::Configuration(
                "producer intervals must be > 0".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("reindex-producer-{}", i))
            .build()
            .map_err(|e| ReindexError::Configuration(format!("producer pool: {}", e)))?;

        info!(threads = pool.current_num_threads(), "Built producer pool");

        Ok(Self {
            pool,
            progress_interval,
            cache_eviction_interval,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Build and route every id, returning once all of them are handled.
    pub fn traverse(&self, ids: &[EntityId], ctx: &TraversalContext<'_>) -> TraversalStats {
        let counters = Counters::default();

        self.pool.install(|| {
            ids.par_iter().for_each(|id| self.visit(id, ctx, &counters));
        });

        let stats = counters.snapshot();
        debug!(
            class = %ctx.class,
            attempted = stats.attempted,
            built = stats.built,
            missing = stats.missing,
            "Traversal joined"
        );
        stats
    }

    fn visit(&self, id: &EntityId, ctx: &TraversalContext<'_>, counters: &Counters) {
        match catch_unwind(AssertUnwindSafe(|| ctx.builder.build(id))) {
            Ok(Ok(Some(document))) => {
                counters.built.fetch_add(1, Ordering::Relaxed);
                route(document, ctx, counters);
            }
            Ok(Ok(None)) => {
                debug!(class = %ctx.class, id = %id, "No document for id");
                record_missing(id, MissingReason::Absent, ctx, counters);
            }
            Ok(Err(e)) => {
                warn!(class = %ctx.class, id = %id, error = %e, "Document build failed");
                record_missing(id, MissingReason::from(&e), ctx, counters);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(class = %ctx.class, id = %id, panic = %message, "Document builder panicked");
                record_missing(id, MissingReason::Panic(message), ctx, counters);
            }
        }

        let attempted = ctx.progress.record_attempt();
        counters.attempted.fetch_add(1, Ordering::Relaxed);

        if attempted % self.progress_interval == 0 {
            ctx.progress.update(attempted);
        }
        if attempted % self.cache_eviction_interval == 0 {
            ctx.source.clear_cache();
            counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(class = %ctx.class, attempted, "Evicted source cache");
        }
    }
}

fn route(document: Document, ctx: &TraversalContext<'_>, counters: &Counters) {
    let Some((last, rest)) = ctx.queues.split_last() else {
        return;
    };
    for queue in rest {
        send(queue, document.clone(), counters);
    }
    send(last, document, counters);
}

fn send(queue: &RelaySender, document: Document, counters: &Counters) {
    let id = document.id.clone();
    if let Err(e) = queue.send(document) {
        counters.send_failures.fetch_add(1, Ordering::Relaxed);
        debug!(id = %id, error = %e, "Dropped document for closed queue");
    }
}

fn record_missing(
    id: &EntityId,
    reason: MissingReason,
    ctx: &TraversalContext<'_>,
    counters: &Counters,
) {
    counters.missing.fetch_add(1, Ordering::Relaxed);
    ctx.missing.record(id.clone(), ctx.class.clone(), reason);
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
