//! Observability and Metrics
//!
//! Counters for connection churn, retries and traffic on one client.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector owned by a client
#[derive(Debug)]
pub struct Metrics {
    /// Gateway and feedback connections opened
    pub connections_opened: AtomicU64,
    /// Connections closed (by policy or after a failure)
    pub connections_closed: AtomicU64,
    /// Failed connection attempts (TCP or TLS)
    pub connect_failures: AtomicU64,
    /// Attempts repeated after a transport failure
    pub retries: AtomicU64,
    /// Notification frames written
    pub notifications_sent: AtomicU64,
    /// Bytes of notification frames written
    pub bytes_sent: AtomicU64,
    /// Feedback records decoded
    pub feedback_records: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            feedback_records: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_failed(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one batch written to the gateway
    pub fn notifications_written(&self, count: u64, byte_count: u64) {
        self.notifications_sent.fetch_add(count, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn feedback_received(&self, count: u64) {
        self.feedback_records.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            feedback_records: self.feedback_records.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_opened = snapshot.connections_opened,
            connections_closed = snapshot.connections_closed,
            connect_failures = snapshot.connect_failures,
            retries = snapshot.retries,
            notifications_sent = snapshot.notifications_sent,
            bytes_sent = snapshot.bytes_sent,
            feedback_records = snapshot.feedback_records,
            uptime_seconds = snapshot.uptime_seconds,
            "Push client metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub connect_failures: u64,
    pub retries: u64,
    pub notifications_sent: u64,
    pub bytes_sent: u64,
    pub feedback_records: u64,
    pub uptime_seconds: u64,
}
