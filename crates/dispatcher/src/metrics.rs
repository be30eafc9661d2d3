//! Logger metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single logger registration, shared by all workers
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    /// Workers currently holding a context for this logger
    active_threads: AtomicUsize,
    /// Records handed to the logger's handler
    delivered: AtomicU64,
    /// Records of another kind passed over
    skipped: AtomicU64,
}

impl LoggerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_threads(&self) -> usize {
        self.active_threads.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_active_threads(&self) {
        self.active_threads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_active_threads(&self) {
        self.active_threads.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_threads: self.active_threads(),
            delivered: self.delivered(),
            skipped: self.skipped(),
        }
    }
}

/// Snapshot of logger metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub active_threads: usize,
    pub delivered: u64,
    pub skipped: u64,
}
