//! Outcome counters for the reservation coordinator

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of reservation outcomes
///
/// Counters are independent atomics; a snapshot taken while reservations
/// are in flight may be off by the in-flight calls.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    committed: AtomicU64,
    conflicts: AtomicU64,
    not_found: AtomicU64,
    failures: AtomicU64,
}

impl CoordinatorMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            committed: self.committed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`CoordinatorMetrics`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Reservations committed
    pub committed: u64,
    /// Reservations rejected with a stale version
    pub conflicts: u64,
    /// Reservations for unknown resources
    pub not_found: u64,
    /// Reservations that hit a storage or ledger failure
    pub failures: u64,
}

impl MetricsSnapshot {
    /// Every reservation attempt that reached an outcome
    pub fn total(&self) -> u64 {
        self.committed + self.conflicts + self.not_found + self.failures
    }

    /// Commit success rate (0.0 - 1.0), 0.0 before any attempt
    pub fn commit_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.committed as f64 / total as f64,
        }
    }
}
