//! Governor error types.

use thiserror::Error;

use sqlgate_engine::EffectiveMode;

use crate::lock::ContentionSnapshot;
use crate::pool::{PoolLabel, PoolSnapshot};

/// Errors raised by the admission and exclusion primitives.
///
/// The timeout variants are recoverable: the caller may retry, ideally with
/// backoff. The closed variants are terminal for the context that produced
/// them.
#[derive(Debug, Error)]
pub enum GovernorError {
    /// Admission timed out while the governor was saturated.
    ///
    /// Carries the hashed pool key, never the raw connection string.
    #[error(
        "{label} pool saturated for target {key_hash:#018x}: \
         {} of {} permits in use, {} queued",
        snapshot.in_use,
        snapshot.max_permits,
        snapshot.queued
    )]
    PoolSaturated {
        /// Resource class that was saturated.
        label: PoolLabel,
        /// Stable hash identifying the connection target.
        key_hash: u64,
        /// Governor counters at the moment of the timeout.
        snapshot: PoolSnapshot,
    },

    /// Acquire attempted during or after governor disposal.
    #[error("{label} pool is closed")]
    PoolClosed {
        /// Resource class of the closed governor.
        label: PoolLabel,
    },

    /// The contention lock timed out under the current mode.
    #[error(
        "contention timeout in {mode} mode: {} waiting, {} timeouts so far",
        snapshot.current_waiters,
        snapshot.total_timeouts
    )]
    ModeContention {
        /// Mode the lock was serving.
        mode: EffectiveMode,
        /// Lock counters at the moment of the timeout.
        snapshot: ContentionSnapshot,
    },

    /// Lock attempted during or after lock disposal.
    #[error("contention lock is closed ({mode} mode)")]
    LockClosed {
        /// Mode the closed lock was serving.
        mode: EffectiveMode,
    },
}

impl GovernorError {
    /// Whether retrying the same call can succeed without reconfiguration.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolSaturated { .. } | Self::ModeContention { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturated_display_hides_raw_target() {
        let err = GovernorError::PoolSaturated {
            label: PoolLabel::Reader,
            key_hash: 0xdead_beef,
            snapshot: PoolSnapshot {
                label: PoolLabel::Reader,
                max_permits: 2,
                in_use: 2,
                peak_in_use: 2,
                queued: 1,
                total_acquired: 5,
                total_timeouts: 1,
                disabled: false,
            },
        };
        let message = err.to_string();
        assert!(message.contains("0x00000000deadbeef"));
        assert!(message.contains("2 of 2 permits"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_closed_variants_are_not_retryable() {
        let err = GovernorError::PoolClosed {
            label: PoolLabel::Writer,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "writer pool is closed");
    }
}
