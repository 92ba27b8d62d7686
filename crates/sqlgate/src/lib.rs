//! # sqlgate
//!
//! Concurrency governance for database connection access.
//!
//! This is the primary public API surface for the rust-sqlgate project.
//! Given a declared concurrency intent, an engine's capabilities, and a
//! connection target, an [`AccessContext`] resolves the discipline actually
//! enforced, admits reads and writes through bounded FIFO pools or an
//! instrumented exclusive lock, maps consistency profiles onto engine
//! isolation levels, and aggregates operational telemetry.
//!
//! What it deliberately does not do: generate SQL, map rows, speak any wire
//! protocol, or open connections. Those belong to the driver layer holding
//! the permits this crate hands out.
//!
//! ## Example
//!
//! ```rust
//! use sqlgate::{AccessContext, ContextConfig, Engine, IsolationProfile};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), sqlgate::Error> {
//!     // An in-memory SQLite target: the context detects it and forces
//!     // single-connection access no matter what was requested.
//!     let context = AccessContext::standalone(ContextConfig::new(
//!         Engine::Sqlite,
//!         "Data Source=:memory:",
//!     ))?;
//!     assert!(context.effective_mode().is_single_connection());
//!
//!     let permit = context.acquire_write().await?;
//!     // ... run statements on the connection this permit governs ...
//!     drop(permit);
//!
//!     let level = context.resolve_isolation(IsolationProfile::StrictConsistency)?;
//!     assert_eq!(level, sqlgate::IsolationLevel::Serializable);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;

// Re-export commonly used types
pub use config::ContextConfig;
pub use context::{AccessContext, AccessPermit};
pub use error::{Error, Result};
pub use sqlgate_connstr::{CacheConfig, CacheStats, ConnstrError, NormalizationCache};
pub use sqlgate_engine::{
    ConcurrencyMode, ConnectionTarget, EffectiveMode, Engine, EngineCapabilities,
    IsolationError, IsolationLevel, IsolationProfile, IsolationSupport,
};
pub use sqlgate_governor::{
    ContentionSnapshot, GovernorError, PoolLabel, PoolSnapshot,
};
pub use sqlgate_metrics::{MetricsConfig, MetricsRegistry, MetricsSnapshot};
