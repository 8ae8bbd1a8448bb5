// Runtime metrics
//
// Lightweight counters for polling, submissions and settings traffic

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by the job controller, progress monitor and settings sync
///
/// Uses atomic operations for thread-safe tracking without locks. Counters
/// only grow; read them with [`Metrics::get`] or log them with
/// [`Metrics::log_summary`].
#[derive(Debug)]
pub struct Metrics {
    /// Progress queries sent to the backend
    pub progress_queries: AtomicU64,

    /// Progress queries that failed and were treated as "no progress"
    pub progress_query_failures: AtomicU64,

    /// Progress snapshots received
    pub snapshots_received: AtomicU64,

    /// Jobs handed to the backend
    pub jobs_submitted: AtomicU64,

    /// Jobs refused by the validator before reaching the backend
    pub jobs_invalid: AtomicU64,

    /// Jobs the backend rejected
    pub jobs_rejected: AtomicU64,

    /// Cancellation requests
    pub cancellations: AtomicU64,

    /// Writes from forms into the settings store
    pub settings_updates: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            progress_queries: AtomicU64::new(0),
            progress_query_failures: AtomicU64::new(0),
            snapshots_received: AtomicU64::new(0),
            jobs_submitted: AtomicU64::new(0),
            jobs_invalid: AtomicU64::new(0),
            jobs_rejected: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            settings_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Read a counter
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn record_progress_query(&self) {
        self.progress_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_progress_query_failure(&self) {
        self.progress_query_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot(&self) {
        self.snapshots_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_invalid(&self) {
        self.jobs_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_rejected(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_settings_update(&self) {
        self.settings_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fraction of progress queries that failed
    pub fn poll_failure_rate(&self) -> f64 {
        let queries = Self::get(&self.progress_queries);
        if queries > 0 {
            Self::get(&self.progress_query_failures) as f64 / queries as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Jobs: {} submitted, {} invalid, {} rejected, {} cancellations",
            Self::get(&self.jobs_submitted),
            Self::get(&self.jobs_invalid),
            Self::get(&self.jobs_rejected),
            Self::get(&self.cancellations)
        );
        tracing::info!(
            "Progress: {} queries, {} failures ({:.1}%), {} snapshots",
            Self::get(&self.progress_queries),
            Self::get(&self.progress_query_failures),
            self.poll_failure_rate() * 100.0,
            Self::get(&self.snapshots_received)
        );
        tracing::info!("Settings updates: {}", Self::get(&self.settings_updates));
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
