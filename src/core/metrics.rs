//! Dispatch counters for observability
//!
//! One instance is shared by a registry and every logger it creates.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing what the dispatch path has done
///
/// # Example
///
/// ```
/// use hierlog::DispatchMetrics;
///
/// let metrics = DispatchMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_append();
/// metrics.record_append_failure();
///
/// assert_eq!(metrics.records_dispatched(), 1);
/// assert_eq!(metrics.append_failures(), 1);
/// ```
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Records that passed the level check and were fanned out
    records_dispatched: AtomicU64,

    /// Sink append calls that succeeded
    appends: AtomicU64,

    /// Sink append calls that returned an error
    append_failures: AtomicU64,
}

impl DispatchMetrics {
    pub const fn new() -> Self {
        Self {
            records_dispatched: AtomicU64::new(0),
            appends: AtomicU64::new(0),
            append_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_dispatched(&self) -> u64 {
        self.records_dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn appends(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn append_failures(&self) -> u64 {
        self.append_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.records_dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_append(&self) -> u64 {
        self.appends.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_append_failure(&self) -> u64 {
        self.append_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed appends as a percentage of all appends (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been appended yet.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.append_failures();
        let total = self.appends() + failed;
        if total == 0 {
            return 0.0;
        }
        (failed as f64 / total as f64) * 100.0
    }
}
