//! Run configuration for the rebuild pipeline.

use reindex_types::PipelineSettings;

use crate::error::ReindexError;

/// Configuration for one rebuild run.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Capacity of each relay queue.
    pub queue_capacity: usize,
    /// Producer pool size. 0 lets rayon pick one thread per core.
    pub worker_threads: usize,
    /// Documents per `add_many` call.
    pub batch_size: usize,
    /// Attempts between progress updates.
    pub progress_interval: u64,
    /// Attempts between source cache evictions.
    pub cache_eviction_interval: u64,
    /// Export entries between flushes.
    pub flush_interval: u64,
    /// Whether to delete everything from the sink before the first class.
    pub clear_first: bool,
    /// Whether to evict the source cache after each class commits.
    pub evict_after_class: bool,
    /// Whether to draw a terminal progress bar.
    pub show_progress: bool,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            worker_threads: 0,
            batch_size: 100,
            progress_interval: 100,
            cache_eviction_interval: 10_000,
            flush_interval: 1000,
            clear_first: true,
            evict_after_class: true,
            show_progress: false,
        }
    }
}

impl ReindexConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_cache_eviction_interval(mut self, interval: u64) -> Self {
        self.cache_eviction_interval = interval;
        self
    }

    pub fn with_flush_interval(mut self, interval: u64) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_clear_first(mut self, clear: bool) -> Self {
        self.clear_first = clear;
        self
    }

    pub fn with_evict_after_class(mut self, evict: bool) -> Self {
        self.evict_after_class = evict;
        self
    }

    pub fn with_show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Reject values that would stall the pipeline.
    pub fn validate(&self) -> Result<(), ReindexError> {
        let zero = [
            ("queue_capacity", self.queue_capacity as u64),
            ("batch_size", self.batch_size as u64),
            ("progress_interval", self.progress_interval),
            ("cache_eviction_interval", self.cache_eviction_interval),
            ("flush_interval", self.flush_interval),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((name, _)) => Err(ReindexError::Configuration(format!(
                "{} must be > 0",
                name
            ))),
            None => Ok(()),
        }
    }
}

impl From<&PipelineSettings> for ReindexConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            worker_threads: settings.worker_threads,
            batch_size: settings.batch_size,
            progress_interval: settings.progress_interval,
            cache_eviction_interval: settings.cache_eviction_interval,
            flush_interval: settings.flush_interval,
            clear_first: settings.clear_first,
            evict_after_class: settings.evict_after_class,
            show_progress: settings.show_progress,
        }
    }
}
