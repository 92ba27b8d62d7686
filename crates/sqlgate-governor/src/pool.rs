//! Bounded admission control with fair queuing.
//!
//! A [`PoolGovernor`] bounds how many operations of one class may be
//! outstanding against a physical resource at once. Callers past the bound
//! queue strictly FIFO; a released slot always goes to the longest-waiting
//! caller, never to a late arrival that happened to be scheduled first.
//!
//! Every counter moves inside the same critical section as the state
//! transition it describes, so a snapshot can never observe a half-applied
//! transition.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use sqlgate_metrics::MetricsRegistry;

use crate::error::GovernorError;
use crate::waiter::{SlotOutcome, WaitSlot};

/// The resource class a governor admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PoolLabel {
    /// Read operations.
    Reader,
    /// Write operations.
    Writer,
}

impl PoolLabel {
    /// Human-readable label for diagnostics and log fields.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        }
    }
}

impl std::fmt::Display for PoolLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bounded FIFO admission control for one resource class.
///
/// A governor with `max_permits == 0` is *disabled*: every acquire succeeds
/// immediately and uncounted. This is how contexts model modes where pooling
/// does not apply without sprinkling `if` at every call site.
pub struct PoolGovernor {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    label: PoolLabel,
    max_permits: usize,
    key_hash: u64,
    metrics: Arc<MetricsRegistry>,
    state: Mutex<PoolState>,
}

struct PoolState {
    closed: bool,
    in_use: usize,
    peak_in_use: usize,
    total_acquired: u64,
    total_timeouts: u64,
    queue: VecDeque<Arc<WaitSlot>>,
}

impl PoolGovernor {
    /// Create a governor.
    ///
    /// `max_permits == 0` creates a disabled governor. `key_hash` identifies
    /// the connection target in saturation errors without exposing it.
    #[must_use]
    pub fn new(
        label: PoolLabel,
        max_permits: usize,
        key_hash: u64,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        tracing::debug!(
            label = %label,
            max_permits,
            disabled = max_permits == 0,
            "pool governor created"
        );
        Self {
            shared: Arc::new(PoolShared {
                label,
                max_permits,
                key_hash,
                metrics,
                state: Mutex::new(PoolState {
                    closed: false,
                    in_use: 0,
                    peak_in_use: 0,
                    total_acquired: 0,
                    total_timeouts: 0,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// Acquire a permit, waiting up to `timeout` for a slot.
    ///
    /// Waiters are served strictly in arrival order. On expiry the waiter is
    /// removed from the queue and
    /// [`GovernorError::PoolSaturated`] is returned with a snapshot taken in
    /// the same critical section as the removal.
    ///
    /// # Errors
    ///
    /// [`GovernorError::PoolSaturated`] on timeout;
    /// [`GovernorError::PoolClosed`] once [`close`](Self::close) has begun.
    pub async fn acquire(&self, timeout: Duration) -> Result<Permit, GovernorError> {
        let waiter = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(GovernorError::PoolClosed {
                    label: self.shared.label,
                });
            }
            if self.shared.max_permits == 0 {
                return Ok(Permit::uncounted(self.shared.label));
            }
            if state.in_use < self.shared.max_permits {
                state.grant_immediate();
                return Ok(Permit::counted(Arc::clone(&self.shared)));
            }
            let waiter = Arc::new(WaitSlot::new());
            state.queue.push_back(Arc::clone(&waiter));
            waiter
        };

        let started = Instant::now();
        let mut guard = AbandonGuard {
            shared: &self.shared,
            waiter: &waiter,
            armed: true,
        };
        let _ = tokio::time::timeout(timeout, waiter.parked()).await;
        // Past the last suspension point; the guard is only for callers that
        // drop the acquire future mid-wait.
        guard.armed = false;

        let mut state = self.shared.state.lock();
        match waiter.outcome() {
            // Granted wins even if the clock expired first: the releaser
            // already transferred the slot to us under the state lock.
            SlotOutcome::Granted => {
                drop(state);
                let waited = started.elapsed();
                self.shared.metrics.record_pool_wait(waited);
                tracing::trace!(
                    label = %self.shared.label,
                    waited_us = waited.as_micros() as u64,
                    "pool permit acquired after wait"
                );
                Ok(Permit::counted(Arc::clone(&self.shared)))
            }
            SlotOutcome::Closed => Err(GovernorError::PoolClosed {
                label: self.shared.label,
            }),
            SlotOutcome::Waiting => {
                state.remove_waiter(&waiter);
                state.total_timeouts += 1;
                let snapshot = state.snapshot(&self.shared);
                drop(state);
                self.shared.metrics.record_pool_timeout();
                tracing::debug!(
                    label = %self.shared.label,
                    timeout_ms = timeout.as_millis() as u64,
                    "pool acquire timed out"
                );
                Err(GovernorError::PoolSaturated {
                    label: self.shared.label,
                    key_hash: self.shared.key_hash,
                    snapshot,
                })
            }
        }
    }

    /// Acquire a permit only if one is free right now.
    ///
    /// Returns `None` when the governor is saturated or closed. Disabled
    /// governors always return a permit.
    #[must_use]
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return None;
        }
        if self.shared.max_permits == 0 {
            return Some(Permit::uncounted(self.shared.label));
        }
        if state.in_use < self.shared.max_permits {
            state.grant_immediate();
            return Some(Permit::counted(Arc::clone(&self.shared)));
        }
        None
    }

    /// Point-in-time copy of the governor's counters.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        self.shared.state.lock().snapshot(&self.shared)
    }

    /// Close the governor.
    ///
    /// Queued waiters wake immediately with [`GovernorError::PoolClosed`],
    /// as do all later acquires. Permits already out remain valid and their
    /// release is still accounted. Idempotent.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let woken = state.queue.len();
        while let Some(waiter) = state.queue.pop_front() {
            waiter.close();
        }
        tracing::debug!(label = %self.shared.label, woken, "pool governor closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

impl std::fmt::Debug for PoolGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGovernor")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl PoolState {
    /// Take a free slot. Caller has checked capacity.
    fn grant_immediate(&mut self) {
        self.in_use += 1;
        self.peak_in_use = self.peak_in_use.max(self.in_use);
        self.total_acquired += 1;
    }

    fn remove_waiter(&mut self, waiter: &Arc<WaitSlot>) {
        if let Some(position) = self
            .queue
            .iter()
            .position(|queued| Arc::ptr_eq(queued, waiter))
        {
            self.queue.remove(position);
        }
    }

    fn snapshot(&self, shared: &PoolShared) -> PoolSnapshot {
        PoolSnapshot {
            label: shared.label,
            max_permits: shared.max_permits,
            in_use: self.in_use,
            peak_in_use: self.peak_in_use,
            queued: self.queue.len(),
            total_acquired: self.total_acquired,
            total_timeouts: self.total_timeouts,
            disabled: shared.max_permits == 0,
        }
    }
}

impl PoolShared {
    /// Return a slot: hand it to the longest-waiting caller if any, else
    /// free it. Timed-out waiters remove themselves under this same lock, so
    /// every queued entry is genuinely waiting.
    fn release_slot(&self) {
        let mut state = self.state.lock();
        if let Some(waiter) = state.queue.pop_front() {
            state.total_acquired += 1;
            waiter.grant();
        } else {
            state.in_use -= 1;
        }
    }
}

/// Restores queue/slot consistency if an acquire future is dropped mid-wait.
struct AbandonGuard<'a> {
    shared: &'a Arc<PoolShared>,
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
            SlotOutcome::Waiting => state.remove_waiter(self.waiter),
            // Granted but nobody left to claim it: pass the slot on.
            SlotOutcome::Granted => {
                drop(state);
                self.shared.release_slot();
            }
            SlotOutcome::Closed => {}
        }
    }
}

/// One admitted unit of concurrency.
///
/// Returning the slot happens on drop, exactly once; the internal slot
/// handle is consumed by the first return, so a redundant return is a no-op
/// by construction.
pub struct Permit {
    label: PoolLabel,
    slot: Option<Arc<PoolShared>>,
}

impl Permit {
    fn counted(shared: Arc<PoolShared>) -> Self {
        Self {
            label: shared.label,
            slot: Some(shared),
        }
    }

    fn uncounted(label: PoolLabel) -> Self {
        Self { label, slot: None }
    }

    /// The resource class this permit admits.
    #[must_use]
    pub const fn label(&self) -> PoolLabel {
        self.label
    }

    /// Whether this permit occupies a counted slot. Disabled governors hand
    /// out uncounted permits.
    #[must_use]
    pub const fn is_counted(&self) -> bool {
        self.slot.is_some()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(shared) = self.slot.take() {
            shared.release_slot();
        }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("label", &self.label)
            .field("counted", &self.is_counted())
            .finish()
    }
}

/// Immutable point-in-time copy of a governor's counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolSnapshot {
    /// Resource class the governor admits.
    pub label: PoolLabel,
    /// Permit bound; zero when disabled.
    pub max_permits: usize,
    /// Permits currently out.
    pub in_use: usize,
    /// Highest `in_use` ever observed.
    pub peak_in_use: usize,
    /// Callers currently queued.
    pub queued: usize,
    /// Successful acquisitions since creation.
    pub total_acquired: u64,
    /// Admission timeouts since creation.
    pub total_timeouts: u64,
    /// Whether admission control is switched off for this governor.
    pub disabled: bool,
}

impl PoolSnapshot {
    /// Fraction of the bound currently in use, in `[0, 1]`. Disabled
    /// governors read 0.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max_permits == 0 {
            return 0.0;
        }
        self.in_use as f64 / self.max_permits as f64
    }

    /// Fraction of admission attempts that timed out, in `[0, 1]`.
    #[must_use]
    pub fn timeout_rate(&self) -> f64 {
        let attempts = self.total_acquired + self.total_timeouts;
        if attempts == 0 {
            return 0.0;
        }
        self.total_timeouts as f64 / attempts as f64
    }
}
