//! Contention-instrumented mutual exclusion.
//!
//! When a context's effective mode requires a single logical connection or a
//! single writer, every access funnels through a [`ContentionLock`]: a
//! one-holder async mutex that accounts for the waiting it causes. Its
//! bookkeeping is serialized by its own mutex, independent of whatever the
//! lock guards, so recording a wait never blocks on the guarded resource.
//!
//! This is deliberately not a [`PoolGovernor`](crate::PoolGovernor) with one
//! permit: the two primitives have different peak-concurrency invariants and
//! different telemetry, and conflating them would hide which discipline a
//! context is actually enforcing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use sqlgate_engine::EffectiveMode;
use sqlgate_metrics::MetricsRegistry;

use crate::error::GovernorError;
use crate::waiter::{SlotOutcome, WaitSlot};

/// One-holder async lock with contention accounting.
///
/// An immediately-available acquisition is *uncontended* and records only the
/// trivial acquire count. Anything else becomes a waiter and is fully
/// accounted: queue depth, peak depth, accumulated wait time, timeouts.
pub struct ContentionLock {
    shared: Arc<LockShared>,
}

struct LockShared {
    mode: EffectiveMode,
    metrics: Arc<MetricsRegistry>,
    state: Mutex<LockState>,
}

struct LockState {
    closed: bool,
    held: bool,
    queue: VecDeque<Arc<WaitSlot>>,
    total_acquires: u64,
    total_waits: u64,
    total_wait_time: Duration,
    peak_waiters: usize,
    current_waiters: usize,
    total_timeouts: u64,
}

impl ContentionLock {
    /// Create a lock serving the given effective mode.
    #[must_use]
    pub fn new(mode: EffectiveMode, metrics: Arc<MetricsRegistry>) -> Self {
        tracing::debug!(mode = %mode, "contention lock created");
        Self {
            shared: Arc::new(LockShared {
                mode,
                metrics,
                state: Mutex::new(LockState {
                    closed: false,
                    held: false,
                    queue: VecDeque::new(),
                    total_acquires: 0,
                    total_waits: 0,
                    total_wait_time: Duration::ZERO,
                    peak_waiters: 0,
                    current_waiters: 0,
                    total_timeouts: 0,
                }),
            }),
        }
    }

    /// Acquire the lock, waiting up to `timeout` for the holder to release.
    ///
    /// Waiters are served strictly in arrival order. A timed-out waiter
    /// removes itself from the accounting without disturbing the holder.
    ///
    /// # Errors
    ///
    /// [`GovernorError::ModeContention`] on timeout;
    /// [`GovernorError::LockClosed`] once [`close`](Self::close) has begun.
    pub async fn lock(&self, timeout: Duration) -> Result<LockGuard, GovernorError> {
        let waiter = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(GovernorError::LockClosed {
                    mode: self.shared.mode,
                });
            }
            if !state.held {
                state.held = true;
                state.total_acquires += 1;
                return Ok(LockGuard {
                    shared: Some(Arc::clone(&self.shared)),
                });
            }
            let waiter = Arc::new(WaitSlot::new());
            state.queue.push_back(Arc::clone(&waiter));
            state.current_waiters += 1;
            state.peak_waiters = state.peak_waiters.max(state.current_waiters);
            waiter
        };

        let started = Instant::now();
        let mut guard = AbandonGuard {
            shared: &self.shared,
            waiter: &waiter,
            armed: true,
        };
        let _ = tokio::time::timeout(timeout, waiter.parked()).await;
        guard.armed = false;

        let mut state = self.shared.state.lock();
        match waiter.outcome() {
            SlotOutcome::Granted => {
                let waited = started.elapsed();
                state.total_waits += 1;
                state.total_wait_time += waited;
                drop(state);
                self.shared.metrics.record_lock_wait(waited);
                tracing::trace!(
                    mode = %self.shared.mode,
                    waited_us = waited.as_micros() as u64,
                    "contention lock acquired after wait"
                );
                Ok(LockGuard {
                    shared: Some(Arc::clone(&self.shared)),
                })
            }
            SlotOutcome::Closed => Err(GovernorError::LockClosed {
                mode: self.shared.mode,
            }),
            SlotOutcome::Waiting => {
                state.remove_waiter(&waiter);
                state.current_waiters -= 1;
                state.total_timeouts += 1;
                let snapshot = state.snapshot();
                drop(state);
                self.shared.metrics.record_lock_timeout();
                tracing::debug!(
                    mode = %self.shared.mode,
                    timeout_ms = timeout.as_millis() as u64,
                    "contention lock timed out"
                );
                Err(GovernorError::ModeContention {
                    mode: self.shared.mode,
                    snapshot,
                })
            }
        }
    }

    /// Point-in-time copy of the lock's counters.
    #[must_use]
    pub fn snapshot(&self) -> ContentionSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// The effective mode this lock serves.
    #[must_use]
    pub fn mode(&self) -> EffectiveMode {
        self.shared.mode
    }

    /// Close the lock.
    ///
    /// Queued waiters wake immediately with [`GovernorError::LockClosed`],
    /// as do all later lock attempts. A guard already out may still release.
    /// Idempotent.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let woken = state.queue.len();
        while let Some(waiter) = state.queue.pop_front() {
            state.current_waiters -= 1;
            waiter.close();
        }
        tracing::debug!(mode = %self.shared.mode, woken, "contention lock closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

impl std::fmt::Debug for ContentionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentionLock")
            .field("mode", &self.shared.mode)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl LockState {
    fn remove_waiter(&mut self, waiter: &Arc<WaitSlot>) {
        if let Some(position) = self
            .queue
            .iter()
            .position(|queued| Arc::ptr_eq(queued, waiter))
        {
            self.queue.remove(position);
        }
    }

    fn snapshot(&self) -> ContentionSnapshot {
        ContentionSnapshot {
            total_acquires: self.total_acquires,
            total_waits: self.total_waits,
            total_wait_time: self.total_wait_time,
            peak_waiters: self.peak_waiters,
            current_waiters: self.current_waiters,
            total_timeouts: self.total_timeouts,
        }
    }
}

impl LockShared {
    /// Release the lock: hand it to the longest-waiting caller if any, else
    /// mark it free.
    fn release(&self) {
        let mut state = self.state.lock();
        if let Some(waiter) = state.queue.pop_front() {
            state.current_waiters -= 1;
            state.total_acquires += 1;
            waiter.grant();
        } else {
            state.held = false;
        }
    }
}

/// Restores queue consistency if a lock future is dropped mid-wait.
struct AbandonGuard<'a> {
    shared: &'a Arc<LockShared>,
    waiter: &'a Arc<WaitSlot>,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.state.lock();
        match self.waiter.outcome() {
            SlotOutcome::Waiting => {
                state.remove_waiter(self.waiter);
                state.current_waiters -= 1;
            }
            // Granted but nobody left to claim it: pass the lock on.
            SlotOutcome::Granted => {
                drop(state);
                self.shared.release();
            }
            SlotOutcome::Closed => {}
        }
    }
}

/// Scoped ownership of the contention lock.
///
/// Releases on drop, on every exit path, including caller panics while the
/// guard is live.
pub struct LockGuard {
    shared: Option<Arc<LockShared>>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// Immutable point-in-time copy of a lock's counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContentionSnapshot {
    /// Successful acquisitions, contended or not.
    pub total_acquires: u64,
    /// Acquisitions that had to wait.
    pub total_waits: u64,
    /// Accumulated time spent waiting by successful acquisitions.
    pub total_wait_time: Duration,
    /// Highest queue depth ever observed.
    pub peak_waiters: usize,
    /// Callers currently queued.
    pub current_waiters: usize,
    /// Lock timeouts since creation.
    pub total_timeouts: u64,
}
