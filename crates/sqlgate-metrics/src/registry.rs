//! The metrics registry and its recording surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::snapshot::{DurationSnapshot, MetricsSnapshot};

/// Configuration for a [`MetricsRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Recent samples kept per duration aggregate for percentile reads.
    /// Zero disables the windows; percentiles then always read 0.
    pub window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { window: 128 }
    }
}

impl MetricsConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recent-sample window size.
    #[must_use]
    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

/// Running sum/count for a duration series, plus a bounded ring of recent
/// samples for approximate percentile reads.
struct DurationStat {
    total_nanos: AtomicU64,
    count: AtomicU64,
    window: Mutex<SampleRing>,
}

impl DurationStat {
    fn new(window: usize) -> Self {
        Self {
            total_nanos: AtomicU64::new(0),
            count: AtomicU64::new(0),
            window: Mutex::new(SampleRing::new(window)),
        }
    }

    fn record(&self, duration: Duration) {
        let nanos = duration.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.window.lock().push(nanos);
    }

    fn read(&self) -> DurationSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total = Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed));
        let mean = if count == 0 {
            Duration::ZERO
        } else {
            total / count.min(u64::from(u32::MAX)) as u32
        };
        let mut samples = self.window.lock().to_vec();
        samples.sort_unstable();
        DurationSnapshot {
            count,
            total,
            mean,
            p50: percentile(&samples, 0.50),
            p95: percentile(&samples, 0.95),
            p99: percentile(&samples, 0.99),
        }
    }
}

/// Fixed-capacity overwrite-oldest sample buffer.
struct SampleRing {
    samples: Vec<u64>,
    capacity: usize,
    next: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    fn push(&mut self, nanos: u64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() < self.capacity {
            self.samples.push(nanos);
        } else {
            self.samples[self.next] = nanos;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    fn to_vec(&self) -> Vec<u64> {
        self.samples.clone()
    }
}

/// Nearest-rank percentile over sorted samples; empty input reads 0.
fn percentile(sorted: &[u64], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    Duration::from_nanos(sorted[rank.clamp(1, sorted.len()) - 1])
}

/// Process-wide sink for operational counters and timers.
///
/// All counters are monotonically increasing for the life of the registry.
/// Each field is an independent atomic; concurrent writers to different
/// fields never contend, and writers to the same field only contend on the
/// atomic itself. The duration windows are the one place a brief lock is
/// taken.
pub struct MetricsRegistry {
    started_at: Instant,

    rows_read: AtomicU64,
    rows_affected: AtomicU64,
    statements_evicted: AtomicU64,
    commands_executed: AtomicU64,
    commands_failed: AtomicU64,
    transactions_begun: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    pool_timeouts: AtomicU64,
    lock_timeouts: AtomicU64,

    command_duration: DurationStat,
    pool_wait: DurationStat,
    lock_wait: DurationStat,
}

impl MetricsRegistry {
    /// Create a registry.
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            started_at: Instant::now(),
            rows_read: AtomicU64::new(0),
            rows_affected: AtomicU64::new(0),
            statements_evicted: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            transactions_begun: AtomicU64::new(0),
            transactions_committed: AtomicU64::new(0),
            transactions_rolled_back: AtomicU64::new(0),
            pool_timeouts: AtomicU64::new(0),
            lock_timeouts: AtomicU64::new(0),
            command_duration: DurationStat::new(config.window),
            pool_wait: DurationStat::new(config.window),
            lock_wait: DurationStat::new(config.window),
        }
    }

    /// Record one executed command and its duration.
    ///
    /// A zero duration is discarded entirely: neither the execution counter
    /// nor the duration aggregate moves.
    pub fn record_command(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
        self.command_duration.record(duration);
    }

    /// Record one failed command.
    pub fn record_command_failure(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rows read by a query. Zero is discarded.
    pub fn record_rows_read(&self, rows: u64) {
        if rows == 0 {
            return;
        }
        self.rows_read.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record rows affected by a statement. Zero is discarded.
    pub fn record_rows_affected(&self, rows: u64) {
        if rows == 0 {
            return;
        }
        self.rows_affected.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record prepared statements evicted from a statement cache. Zero is
    /// discarded.
    pub fn record_statements_evicted(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.statements_evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a transaction begin.
    pub fn record_transaction_begun(&self) {
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transaction commit.
    pub fn record_transaction_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transaction rollback.
    pub fn record_transaction_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a measured wait for a pool permit. Zero is discarded.
    pub fn record_pool_wait(&self, waited: Duration) {
        if waited.is_zero() {
            return;
        }
        self.pool_wait.record(waited);
    }

    /// Record an admission timeout.
    pub fn record_pool_timeout(&self) {
        self.pool_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a measured wait for the contention lock. Zero is discarded.
    pub fn record_lock_wait(&self, waited: Duration) {
        if waited.is_zero() {
            return;
        }
        self.lock_wait.record(waited);
    }

    /// Record a contention-lock timeout.
    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Immutable point-in-time copy of every aggregate.
    ///
    /// Each field is read atomically; the snapshot never shows a torn value.
    /// Fields are not mutually consistent at a single instant, which is the
    /// documented trade-off for contention-free writes.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            statements_evicted: self.statements_evicted.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            transactions_begun: self.transactions_begun.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            pool_timeouts: self.pool_timeouts.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            command_duration: self.command_duration.read(),
            pool_wait: self.pool_wait.read(),
            lock_wait: self.lock_wait.read(),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
