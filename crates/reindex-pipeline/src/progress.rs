//! Per-class progress counter with an optional terminal progress bar.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

const BAR_TEMPLATE: &str =
    "{prefix:>20} [{elapsed_precise}] {wide_bar} {pos}/{len} ({per_sec}, eta {eta})";

/// Attempted-versus-total counter for one class cycle.
///
/// `record_attempt` is called for every id; the visible position only moves
/// when `update` is called, which the producer does every progress interval.
pub struct ProgressTracker {
    class: String,
    total: u64,
    attempted: AtomicU64,
    reported: AtomicU64,
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Tracker that draws a bar on stderr when `show` is set.
    ///
    /// The bar stays hidden when stderr is not a terminal.
    pub fn new(class: impl Into<String>, total: u64, show: bool) -> Self {
        let class = class.into();
        let bar = if show {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                bar.set_style(style);
            }
            bar.set_prefix(class.clone());
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            class,
            total,
            attempted: AtomicU64::new(0),
            reported: AtomicU64::new(0),
            bar,
        }
    }

    pub fn hidden(class: impl Into<String>, total: u64) -> Self {
        Self::new(class, total, false)
    }

    /// Count one attempt and return the running total.
    pub fn record_attempt(&self) -> u64 {
        self.attempted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Publish a position. Never moves backwards.
    pub fn update(&self, attempted: u64) {
        let previous = self.reported.fetch_max(attempted, Ordering::Relaxed);
        if attempted > previous {
            self.bar.set_position(attempted);
        }
    }

    pub fn attempted(&self) -> u64 {
        self.attempted.load(Ordering::Relaxed)
    }

    /// Last published position.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Publish the final count and remove the bar.
    pub fn finish(&self) {
        let attempted = self.attempted();
        self.update(attempted);
        self.bar.finish_and_clear();
        info!(
            class = %self.class,
            attempted,
            total = self.total,
            "Class traversal finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_monotonic() {
        let progress = ProgressTracker::hidden("Pathway", 10);
        for _ in 0..4 {
            progress.record_attempt();
        }
        progress.update(4);
        progress.update(2);
        assert_eq!(progress.reported(), 4);
        assert_eq!(progress.attempted(), 4);
    }

    #[test]
    fn test_finish_publishes_attempted() {
        let progress = ProgressTracker::hidden("Pathway", 3);
        progress.record_attempt();
        progress.record_attempt();
        progress.finish();
        assert_eq!(progress.reported(), 2);
        assert_eq!(progress.total(), 3);
    }
}
