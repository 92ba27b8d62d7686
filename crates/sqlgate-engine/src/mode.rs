//! Concurrency mode resolution.
//!
//! A caller declares a [`ConcurrencyMode`]; what a context actually enforces
//! is the [`EffectiveMode`] resolved here, once, at context construction.
//! The distinction is deliberate: an `EffectiveMode` only ever comes out of
//! [`resolve_mode`], so holding one proves the engine and target constraints
//! have already been applied.

use serde::Serialize;

use crate::engine::EngineCapabilities;
use crate::target::ConnectionTarget;

/// Concurrency discipline requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum ConcurrencyMode {
    /// Pooled readers and writers, bounded independently.
    #[default]
    Standard,
    /// Concurrent readers, writers serialized through one logical writer.
    SingleWriter,
    /// All access serialized through one logical connection.
    SingleConnection,
    /// Pooled access with a pinned connection held open for the lifetime of
    /// the context, so the target is never fully released.
    KeepAlive,
}

impl ConcurrencyMode {
    /// Human-readable mode name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::SingleWriter => "single_writer",
            Self::SingleConnection => "single_connection",
            Self::KeepAlive => "keep_alive",
        }
    }
}

impl std::fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Concurrency discipline a context actually enforces.
///
/// Immutable once resolved; contexts never re-resolve mid-lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EffectiveMode {
    /// Pooled readers and writers.
    Standard,
    /// Concurrent readers, single serialized writer.
    SingleWriter,
    /// One logical connection for everything.
    SingleConnection,
    /// Pooled access plus a pinned keep-alive connection.
    KeepAlive,
}

impl EffectiveMode {
    /// Human-readable mode name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::SingleWriter => "single_writer",
            Self::SingleConnection => "single_connection",
            Self::KeepAlive => "keep_alive",
        }
    }

    /// Whether all access is serialized through one logical connection.
    #[must_use]
    pub const fn is_single_connection(&self) -> bool {
        matches!(self, Self::SingleConnection)
    }

    /// Whether writes are serialized through the contention lock.
    #[must_use]
    pub const fn serializes_writes(&self) -> bool {
        matches!(self, Self::SingleWriter | Self::SingleConnection)
    }
}

impl std::fmt::Display for EffectiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve the concurrency discipline to enforce for a context.
///
/// Deterministic and side-effect-free; called once at context construction.
/// Most-restrictive-wins: an in-memory embedded instance is visible only to
/// the connection that created it, so any mode other than single-connection
/// would silently lose data across connection churn. That rule overrides
/// everything the caller asked for.
#[must_use]
pub fn resolve_mode(
    requested: ConcurrencyMode,
    caps: &EngineCapabilities,
    target: &ConnectionTarget,
) -> EffectiveMode {
    if target.memory_backed && caps.embedded {
        return EffectiveMode::SingleConnection;
    }
    if !caps.concurrent_writers && requested == ConcurrencyMode::Standard {
        return EffectiveMode::SingleWriter;
    }
    match requested {
        ConcurrencyMode::Standard => EffectiveMode::Standard,
        ConcurrencyMode::SingleWriter => EffectiveMode::SingleWriter,
        ConcurrencyMode::SingleConnection => EffectiveMode::SingleConnection,
        ConcurrencyMode::KeepAlive => EffectiveMode::KeepAlive,
    }
}
