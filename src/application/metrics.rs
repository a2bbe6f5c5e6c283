//! Observability metrics for error reporting.
//!
//! Counts what happened to each raised error: recorded, ignored, trimmed out
//! of the history, forwarded to the system log, or held back by the rate
//! limiter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking error reporting statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Records appended to the log store
    records_appended: AtomicU64,
    /// Errors skipped because their type is ignored
    errors_ignored: AtomicU64,
    /// Records dropped from the front of a history
    entries_trimmed: AtomicU64,
    /// Errors copied to the system log
    log_copies_emitted: AtomicU64,
    /// Errors held back by the rate limiter
    log_copies_suppressed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                records_appended: AtomicU64::new(0),
                errors_ignored: AtomicU64::new(0),
                entries_trimmed: AtomicU64::new(0),
                log_copies_emitted: AtomicU64::new(0),
                log_copies_suppressed: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_appended(&self) {
        self.inner.records_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.inner.errors_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_trimmed(&self, count: usize) {
        self.inner
            .entries_trimmed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_log_copy(&self) {
        self.inner.log_copies_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_log_suppressed(&self) {
        self.inner
            .log_copies_suppressed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_appended(&self) -> u64 {
        self.inner.records_appended.load(Ordering::Relaxed)
    }

    pub fn errors_ignored(&self) -> u64 {
        self.inner.errors_ignored.load(Ordering::Relaxed)
    }

    pub fn entries_trimmed(&self) -> u64 {
        self.inner.entries_trimmed.load(Ordering::Relaxed)
    }

    pub fn log_copies_emitted(&self) -> u64 {
        self.inner.log_copies_emitted.load(Ordering::Relaxed)
    }

    pub fn log_copies_suppressed(&self) -> u64 {
        self.inner.log_copies_suppressed.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_appended: self.records_appended(),
            errors_ignored: self.errors_ignored(),
            entries_trimmed: self.entries_trimmed(),
            log_copies_emitted: self.log_copies_emitted(),
            log_copies_suppressed: self.log_copies_suppressed(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.records_appended.store(0, Ordering::Relaxed);
        self.inner.errors_ignored.store(0, Ordering::Relaxed);
        self.inner.entries_trimmed.store(0, Ordering::Relaxed);
        self.inner.log_copies_emitted.store(0, Ordering::Relaxed);
        self.inner.log_copies_suppressed.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_appended: u64,
    pub errors_ignored: u64,
    pub entries_trimmed: u64,
    pub log_copies_emitted: u64,
    pub log_copies_suppressed: u64,
}

impl MetricsSnapshot {
    /// Fraction of log copies held back by the rate limiter (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing was considered for the system log.
    pub fn suppression_rate(&self) -> f64 {
        let total = self
            .log_copies_emitted
            .saturating_add(self.log_copies_suppressed);
        if total == 0 {
            0.0
        } else {
            self.log_copies_suppressed as f64 / total as f64
        }
    }

    /// Errors handed to the utility, ignored ones included.
    pub fn total_errors(&self) -> u64 {
        self.records_appended.saturating_add(self.errors_ignored)
    }
}
