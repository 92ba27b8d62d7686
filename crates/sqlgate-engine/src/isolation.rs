//! Isolation profiles and their mapping onto engine isolation levels.
//!
//! Callers state what they want in engine-independent terms (an
//! [`IsolationProfile`]); this module resolves that against an engine's
//! capability record into a concrete [`IsolationLevel`], or refuses with a
//! typed error. Consistency is never silently weakened: a profile the engine
//! cannot honor is a hard error, not a downgrade.

use serde::Serialize;

use crate::engine::{Engine, EngineCapabilities, IsolationSupport};
use crate::error::IsolationError;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum IsolationLevel {
    /// Read uncommitted (dirty reads allowed).
    ReadUncommitted,
    /// Read committed.
    #[default]
    ReadCommitted,
    /// Repeatable read.
    RepeatableRead,
    /// Serializable (highest isolation).
    Serializable,
    /// Snapshot isolation (versioned reads, writers not blocked).
    Snapshot,
}

impl IsolationLevel {
    /// Get the SQL statement to set this isolation level.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED",
            Self::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
            Self::Snapshot => "SET TRANSACTION ISOLATION LEVEL SNAPSHOT",
        }
    }

    /// Human-readable level name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read_uncommitted",
            Self::ReadCommitted => "read_committed",
            Self::RepeatableRead => "repeatable_read",
            Self::Serializable => "serializable",
            Self::Snapshot => "snapshot",
        }
    }

    /// The support-matrix flag corresponding to this level.
    #[must_use]
    pub(crate) const fn as_support_flag(self) -> IsolationSupport {
        match self {
            Self::ReadUncommitted => IsolationSupport::READ_UNCOMMITTED,
            Self::ReadCommitted => IsolationSupport::READ_COMMITTED,
            Self::RepeatableRead => IsolationSupport::REPEATABLE_READ,
            Self::Serializable => IsolationSupport::SERIALIZABLE,
            Self::Snapshot => IsolationSupport::SNAPSHOT,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine-independent description of a consistency/performance trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IsolationProfile {
    /// Readers must not block or be blocked by writers, without giving up
    /// a consistent view. Resolves to a snapshot-style level.
    SafeNonBlockingReads,
    /// Full correctness regardless of cost. Always resolves, on any engine.
    StrictConsistency,
    /// Maximum throughput, dirty reads acceptable. Resolves to a relaxed
    /// level only where the engine genuinely provides one.
    FastWithRisks,
}

impl IsolationProfile {
    /// Human-readable profile name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SafeNonBlockingReads => "safe_non_blocking_reads",
            Self::StrictConsistency => "strict_consistency",
            Self::FastWithRisks => "fast_with_risks",
        }
    }
}

impl std::fmt::Display for IsolationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve an isolation profile against an engine's capability record.
///
/// `StrictConsistency` maps to [`IsolationLevel::Serializable`] on every
/// engine, including [`Engine::Unknown`]. The other profiles are table-driven
/// per engine and validated against the support matrix in `caps`; a level
/// with an engine-side prerequisite (snapshot isolation, WAL journal mode)
/// additionally requires `caps.snapshot_enabled`.
///
/// # Errors
///
/// [`IsolationError::ProfileUnsupported`] when the engine has no level for
/// the profile; [`IsolationError::PrerequisiteMissing`] when it has one but
/// the deployment-side switch for it is off.
pub fn resolve_isolation(
    engine: Engine,
    caps: &EngineCapabilities,
    profile: IsolationProfile,
) -> Result<IsolationLevel, IsolationError> {
    let candidate = match (engine, profile) {
        // Uniform across engines, unknown included: the safe default.
        (_, IsolationProfile::StrictConsistency) => IsolationLevel::Serializable,

        (Engine::SqlServer | Engine::Sqlite, IsolationProfile::SafeNonBlockingReads) => {
            IsolationLevel::Snapshot
        }
        // On MVCC engines REPEATABLE READ already gives a transaction-wide
        // snapshot without blocking writers.
        (Engine::Postgres | Engine::MySql, IsolationProfile::SafeNonBlockingReads) => {
            IsolationLevel::RepeatableRead
        }

        (Engine::SqlServer | Engine::MySql, IsolationProfile::FastWithRisks) => {
            IsolationLevel::ReadUncommitted
        }

        // Postgres accepts READ UNCOMMITTED syntax but runs it as READ
        // COMMITTED, so the profile cannot be honored. SQLite only relaxes
        // reads in shared-cache mode, which sqlgate does not govern.
        (Engine::Postgres | Engine::Sqlite, IsolationProfile::FastWithRisks)
        | (Engine::Unknown, _) => {
            return Err(IsolationError::ProfileUnsupported { engine, profile });
        }
    };

    if !caps.supported_isolation.supports(candidate) {
        return Err(IsolationError::ProfileUnsupported { engine, profile });
    }

    if candidate == IsolationLevel::Snapshot && !caps.snapshot_enabled {
        let prerequisite = match engine {
            Engine::Sqlite => "WAL journal mode",
            _ => "snapshot isolation enabled on the target database",
        };
        return Err(IsolationError::PrerequisiteMissing {
            engine,
            level: candidate,
            prerequisite,
        });
    }

    Ok(candidate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_consistency_is_serializable_everywhere() {
        for engine in [
            Engine::SqlServer,
            Engine::Postgres,
            Engine::MySql,
            Engine::Sqlite,
            Engine::Unknown,
        ] {
            let level = resolve_isolation(
                engine,
                &engine.capabilities(),
                IsolationProfile::StrictConsistency,
            )
            .unwrap();
            assert_eq!(level, IsolationLevel::Serializable, "engine {engine}");
        }
    }

    #[test]
    fn test_unknown_engine_rejects_everything_else() {
        let caps = Engine::Unknown.capabilities();
        for profile in [
            IsolationProfile::SafeNonBlockingReads,
            IsolationProfile::FastWithRisks,
        ] {
            let err =
                resolve_isolation(Engine::Unknown, &caps, profile).unwrap_err();
            assert!(matches!(err, IsolationError::ProfileUnsupported { .. }));
        }
    }

    #[test]
    fn test_snapshot_reads_need_prerequisite() {
        // Stock SQL Server: snapshot isolation not yet enabled.
        let caps = Engine::SqlServer.capabilities();
        let err = resolve_isolation(
            Engine::SqlServer,
            &caps,
            IsolationProfile::SafeNonBlockingReads,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IsolationError::PrerequisiteMissing {
                level: IsolationLevel::Snapshot,
                ..
            }
        ));

        // Once enabled, the same profile resolves.
        let caps = caps.with_snapshot_enabled(true);
        let level = resolve_isolation(
            Engine::SqlServer,
            &caps,
            IsolationProfile::SafeNonBlockingReads,
        )
        .unwrap();
        assert_eq!(level, IsolationLevel::Snapshot);
    }

    #[test]
    fn test_mvcc_engines_resolve_snapshot_reads_without_prerequisite() {
        for engine in [Engine::Postgres, Engine::MySql] {
            let level = resolve_isolation(
                engine,
                &engine.capabilities(),
                IsolationProfile::SafeNonBlockingReads,
            )
            .unwrap();
            assert_eq!(level, IsolationLevel::RepeatableRead, "engine {engine}");
        }
    }

    #[test]
    fn test_relaxed_reads_rejected_where_not_real() {
        let err = resolve_isolation(
            Engine::Postgres,
            &Engine::Postgres.capabilities(),
            IsolationProfile::FastWithRisks,
        )
        .unwrap_err();
        assert!(matches!(err, IsolationError::ProfileUnsupported { .. }));
    }

    #[test]
    fn test_relaxed_reads_resolve_where_supported() {
        let level = resolve_isolation(
            Engine::MySql,
            &Engine::MySql.capabilities(),
            IsolationProfile::FastWithRisks,
        )
        .unwrap();
        assert_eq!(level, IsolationLevel::ReadUncommitted);
    }

    #[test]
    fn test_as_sql_round_trip() {
        assert_eq!(
            IsolationLevel::Snapshot.as_sql(),
            "SET TRANSACTION ISOLATION LEVEL SNAPSHOT"
        );
        assert_eq!(
            IsolationLevel::Serializable.as_sql(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"
        );
    }
}
