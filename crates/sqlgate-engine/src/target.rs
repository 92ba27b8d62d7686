//! Connection-target descriptor.

use serde::Serialize;

/// Describes the connection target a context governs access to.
///
/// This is a digest of the raw connection string, not the string itself: the
/// `key_hash` identifies the target in errors and logs without ever exposing
/// credentials or hosts embedded in the raw form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionTarget {
    /// Whether the target database lives only in memory.
    pub memory_backed: bool,

    /// Stable hash of the normalized connection string.
    pub key_hash: u64,
}

impl ConnectionTarget {
    /// Create a target descriptor.
    #[must_use]
    pub const fn new(memory_backed: bool, key_hash: u64) -> Self {
        Self {
            memory_backed,
            key_hash,
        }
    }
}
