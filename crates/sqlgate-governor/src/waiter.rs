//! Shared wait-slot primitive for the FIFO queues in this crate.
//!
//! A [`WaitSlot`] is one parked caller. Its outcome is only ever written
//! while holding the owning primitive's state lock, which is what makes the
//! grant-versus-timeout race resolvable: whichever side takes the state lock
//! first decides, and the loser observes that decision instead of acting on
//! its own view.

use parking_lot::Mutex;
use tokio::sync::Notify;

/// How a parked caller's wait ended, or `Waiting` while it has not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotOutcome {
    /// Still queued.
    Waiting,
    /// The releasing side handed its slot to this waiter.
    Granted,
    /// The primitive was closed while this waiter was queued.
    Closed,
}

/// One queued caller: an outcome cell plus its wake-up signal.
pub(crate) struct WaitSlot {
    outcome: Mutex<SlotOutcome>,
    notify: Notify,
}

impl WaitSlot {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(SlotOutcome::Waiting),
            notify: Notify::new(),
        }
    }

    /// Current outcome. Callers must hold the owning state lock for the
    /// answer to be meaningful.
    pub(crate) fn outcome(&self) -> SlotOutcome {
        *self.outcome.lock()
    }

    /// Mark the slot granted and wake its owner. Must be called with the
    /// owning state lock held.
    pub(crate) fn grant(&self) {
        *self.outcome.lock() = SlotOutcome::Granted;
        self.notify.notify_one();
    }

    /// Mark the slot closed-out and wake its owner. Must be called with the
    /// owning state lock held.
    pub(crate) fn close(&self) {
        *self.outcome.lock() = SlotOutcome::Closed;
        self.notify.notify_one();
    }

    /// Suspend until granted, closed, or externally raced. A `notify` sent
    /// before this is first polled is not lost.
    pub(crate) async fn parked(&self) {
        self.notify.notified().await;
    }
}
