//! Counters for async queues
//!
//! Shared between the enqueuing side and the worker thread of an async
//! appender or the async logger delegate.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use rust_logger_config::core::QueueMetrics;
///
/// let metrics = QueueMetrics::new();
/// metrics.record_dropped();
/// metrics.record_processed();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.dropped, 1);
/// assert_eq!(snapshot.processed, 1);
/// ```
#[derive(Debug, Default)]
pub struct QueueMetrics {
    dropped: AtomicU64,
    processed: AtomicU64,
    queue_full: AtomicU64,
    blocked: AtomicU64,
    /// Events written on the caller's thread because the queue was full
    synchronous: AtomicU64,
}

/// Point-in-time copy of [`QueueMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub dropped: u64,
    pub processed: u64,
    pub queue_full: u64,
    pub blocked: u64,
    pub synchronous: u64,
}

impl QueueSnapshot {
    /// Percentage of events dropped; 0.0 before any event
    pub fn drop_rate(&self) -> f64 {
        let total = self.processed + self.dropped;
        if total == 0 {
            return 0.0;
        }
        self.dropped as f64 * 100.0 / total as f64
    }
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn total_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn queue_full_events(&self) -> u64 {
        self.queue_full.load(Ordering::Relaxed)
    }

    pub fn synchronous_writes(&self) -> u64 {
        self.synchronous.load(Ordering::Relaxed)
    }

    /// Record a dropped event, returning the previous count
    pub fn record_dropped(&self) -> u64 {
        bump(&self.dropped)
    }

    pub fn record_processed(&self) -> u64 {
        bump(&self.processed)
    }

    pub fn record_queue_full(&self) -> u64 {
        bump(&self.queue_full)
    }

    pub fn record_block(&self) -> u64 {
        bump(&self.blocked)
    }

    pub fn record_synchronous_write(&self) -> u64 {
        bump(&self.synchronous)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            dropped: self.dropped_count(),
            processed: self.total_processed(),
            queue_full: self.queue_full_events(),
            blocked: self.blocked.load(Ordering::Relaxed),
            synchronous: self.synchronous_writes(),
        }
    }
}
