//! Engine identification and capability records.
//!
//! Supported engines form a closed set. Each variant carries a capability
//! record describing what the engine can enforce, so the resolvers in this
//! crate pattern-match on the tag instead of inspecting driver types at
//! runtime.

use bitflags::bitflags;
use serde::Serialize;

use crate::isolation::IsolationLevel;

/// A database engine known to sqlgate.
///
/// The set is closed on purpose: resolution rules are written per variant,
/// and [`Engine::Unknown`] is the explicit escape hatch for engines the
/// workspace has no rules for. Unknown engines get conservative defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Engine {
    /// Microsoft SQL Server (including Azure SQL).
    SqlServer,
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB (InnoDB semantics assumed).
    MySql,
    /// SQLite (embedded, file- or memory-backed).
    Sqlite,
    /// An engine sqlgate has no capability rules for.
    Unknown,
}

impl Engine {
    /// Human-readable engine name for diagnostics and log fields.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SqlServer => "sqlserver",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Unknown => "unknown",
        }
    }

    /// Default capability record for this engine.
    ///
    /// Defaults describe a stock installation. Deployment-specific settings
    /// (snapshot isolation switched on, WAL journal mode) are overrides on
    /// the returned record, not different engine tags.
    #[must_use]
    pub fn capabilities(self) -> EngineCapabilities {
        match self {
            Self::SqlServer => EngineCapabilities {
                concurrent_writers: true,
                embedded: false,
                supported_isolation: IsolationSupport::READ_UNCOMMITTED
                    | IsolationSupport::READ_COMMITTED
                    | IsolationSupport::REPEATABLE_READ
                    | IsolationSupport::SERIALIZABLE
                    | IsolationSupport::SNAPSHOT,
                // ALLOW_SNAPSHOT_ISOLATION is off until enabled per database.
                snapshot_enabled: false,
            },
            Self::Postgres => EngineCapabilities {
                concurrent_writers: true,
                embedded: false,
                // READ UNCOMMITTED is accepted syntax but behaves as READ
                // COMMITTED, so it is not listed as supported.
                supported_isolation: IsolationSupport::READ_COMMITTED
                    | IsolationSupport::REPEATABLE_READ
                    | IsolationSupport::SERIALIZABLE,
                snapshot_enabled: true,
            },
            Self::MySql => EngineCapabilities {
                concurrent_writers: true,
                embedded: false,
                supported_isolation: IsolationSupport::READ_UNCOMMITTED
                    | IsolationSupport::READ_COMMITTED
                    | IsolationSupport::REPEATABLE_READ
                    | IsolationSupport::SERIALIZABLE,
                snapshot_enabled: true,
            },
            Self::Sqlite => EngineCapabilities {
                concurrent_writers: false,
                embedded: true,
                supported_isolation: IsolationSupport::SERIALIZABLE
                    | IsolationSupport::SNAPSHOT,
                // Non-blocking snapshot reads require WAL journal mode.
                snapshot_enabled: false,
            },
            Self::Unknown => EngineCapabilities {
                concurrent_writers: false,
                embedded: false,
                supported_isolation: IsolationSupport::SERIALIZABLE,
                snapshot_enabled: false,
            },
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of isolation levels an engine actually enforces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IsolationSupport: u8 {
        /// Dirty reads allowed.
        const READ_UNCOMMITTED = 1 << 0;
        /// Statement-level read consistency.
        const READ_COMMITTED = 1 << 1;
        /// Transaction-level read consistency.
        const REPEATABLE_READ = 1 << 2;
        /// Full serializability.
        const SERIALIZABLE = 1 << 3;
        /// Versioned snapshot reads that do not block writers.
        const SNAPSHOT = 1 << 4;
    }
}

impl IsolationSupport {
    /// Whether the given level is in this support set.
    #[must_use]
    pub fn supports(self, level: IsolationLevel) -> bool {
        self.contains(level.as_support_flag())
    }
}

/// What a concrete engine deployment can enforce.
///
/// Built from [`Engine::capabilities`] defaults; deployment-specific flags
/// are adjusted via the builder-style setters before the record is handed
/// to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Whether the engine tolerates multiple concurrent writer connections.
    pub concurrent_writers: bool,

    /// Whether the engine runs inside the client process.
    pub embedded: bool,

    /// Isolation levels the engine enforces.
    pub supported_isolation: IsolationSupport,

    /// Whether the engine-side prerequisite for snapshot-style reads is
    /// currently enabled (e.g. `ALLOW_SNAPSHOT_ISOLATION`, WAL journal mode).
    pub snapshot_enabled: bool,
}

impl EngineCapabilities {
    /// Mark the snapshot-read prerequisite as enabled for this deployment.
    #[must_use]
    pub fn with_snapshot_enabled(mut self, enabled: bool) -> Self {
        self.snapshot_enabled = enabled;
        self
    }

    /// Override the concurrent-writer capability for this deployment.
    #[must_use]
    pub fn with_concurrent_writers(mut self, enabled: bool) -> Self {
        self.concurrent_writers = enabled;
        self
    }
}
