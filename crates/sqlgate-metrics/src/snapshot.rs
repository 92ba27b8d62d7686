//! Immutable metrics snapshots.

use std::time::Duration;

use serde::Serialize;

/// Point-in-time view of one duration series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationSnapshot {
    /// Samples recorded since registry creation.
    pub count: u64,
    /// Sum of all recorded samples.
    pub total: Duration,
    /// `total / count`; zero when nothing was recorded.
    pub mean: Duration,
    /// Median of the recent-sample window; zero when the window is empty.
    pub p50: Duration,
    /// 95th percentile of the recent-sample window.
    pub p95: Duration,
    /// 99th percentile of the recent-sample window.
    pub p99: Duration,
}

/// Immutable copy of every registry aggregate.
///
/// Produced by [`MetricsRegistry::snapshot`](crate::MetricsRegistry::snapshot);
/// nothing in it changes after creation.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Rows returned to callers by queries.
    pub rows_read: u64,
    /// Rows changed by statements.
    pub rows_affected: u64,
    /// Prepared statements evicted from statement caches.
    pub statements_evicted: u64,
    /// Commands executed.
    pub commands_executed: u64,
    /// Commands that failed.
    pub commands_failed: u64,
    /// Transactions begun.
    pub transactions_begun: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back.
    pub transactions_rolled_back: u64,
    /// Pool admission timeouts.
    pub pool_timeouts: u64,
    /// Contention-lock timeouts.
    pub lock_timeouts: u64,
    /// Command execution durations.
    pub command_duration: DurationSnapshot,
    /// Waits for a pool permit.
    pub pool_wait: DurationSnapshot,
    /// Waits for the contention lock.
    pub lock_wait: DurationSnapshot,
    /// Time since registry creation.
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Fraction of commands that succeeded, in `[0, 1]`.
    #[must_use]
    pub fn command_success_rate(&self) -> f64 {
        let total = self.commands_executed + self.commands_failed;
        if total == 0 {
            return 1.0;
        }
        self.commands_executed as f64 / total as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_success_rate() {
        let zero = DurationSnapshot {
            count: 0,
            total: Duration::ZERO,
            mean: Duration::ZERO,
            p50: Duration::ZERO,
            p95: Duration::ZERO,
            p99: Duration::ZERO,
        };
        let snap = MetricsSnapshot {
            rows_read: 0,
            rows_affected: 0,
            statements_evicted: 0,
            commands_executed: 90,
            commands_failed: 10,
            transactions_begun: 0,
            transactions_committed: 0,
            transactions_rolled_back: 0,
            pool_timeouts: 0,
            lock_timeouts: 0,
            command_duration: zero,
            pool_wait: zero,
            lock_wait: zero,
            uptime: Duration::from_secs(1),
        };
        assert!((snap.command_success_rate() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serializes() {
        let zero = DurationSnapshot {
            count: 0,
            total: Duration::ZERO,
            mean: Duration::ZERO,
            p50: Duration::ZERO,
            p95: Duration::ZERO,
            p99: Duration::ZERO,
        };
        let snap = MetricsSnapshot {
            rows_read: 1,
            rows_affected: 2,
            statements_evicted: 0,
            commands_executed: 3,
            commands_failed: 0,
            transactions_begun: 0,
            transactions_committed: 0,
            transactions_rolled_back: 0,
            pool_timeouts: 0,
            lock_timeouts: 0,
            command_duration: zero,
            pool_wait: zero,
            lock_wait: zero,
            uptime: Duration::from_secs(1),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"commands_executed\":3"));
    }
}
