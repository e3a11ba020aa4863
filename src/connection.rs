use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

/// Per-connection counters, touched under their own lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConnMetrics {
    pub queries_processed: u64,
    pub queries_errored: u64,
    /// Running mean of per-statement wall time, in seconds
    pub avg_query_secs: f64,
    /// Cumulative wall time spent executing, in seconds
    pub busy_secs: f64,
}

/// One pooled session: the driver handle behind its own lock, a busy flag
/// readable without locking, and the connection's counters.
///
/// The busy flag is true for the entire duration of exactly one in-flight
/// statement. Selection reads it lock-free; execution serializes on the
/// session lock.
pub(crate) struct PoolConnection<D> {
    pub(crate) session: Mutex<D>,
    busy: AtomicBool,
    metrics: Mutex<ConnMetrics>,
}

impl<D> PoolConnection<D> {
    pub(crate) fn new(session: D) -> Self {
        Self {
            session: Mutex::new(session),
            busy: AtomicBool::new(false),
            metrics: Mutex::new(ConnMetrics::default()),
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    pub(crate) fn note_dispatch(&self) {
        self.metrics.lock().queries_processed += 1;
    }

    pub(crate) fn note_error(&self) {
        self.metrics.lock().queries_errored += 1;
    }

    /// Fold one statement's wall time into the running mean and busy total.
    ///
    /// The mean divides by the processed count; the background worker bumps
    /// that count only after a task completes, so the count is clamped to 1
    /// to keep the first sample well-defined.
    pub(crate) fn record_completion(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        let mut metrics = self.metrics.lock();
        metrics.busy_secs += secs;
        let count = metrics.queries_processed.max(1) as f64;
        metrics.avg_query_secs -= metrics.avg_query_secs / count;
        metrics.avg_query_secs += secs / count;
    }

    pub(crate) fn metrics_snapshot(&self) -> ConnMetrics {
        self.metrics.lock().clone()
    }
}
