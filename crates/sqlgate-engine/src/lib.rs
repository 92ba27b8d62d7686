//! # sqlgate-engine
//!
//! Engine capability records and the pure resolution rules built on them.
//!
//! This crate is the deterministic core of the sqlgate workspace: it knows
//! which database engines exist, what each one is capable of, and how to map
//! abstract requests (a desired concurrency discipline, a desired consistency
//! profile) onto something the engine can actually enforce.
//!
//! Everything here is a pure function over plain data. No I/O, no async, no
//! shared state. The enforcement machinery lives in `sqlgate-governor`.
//!
//! ## Example
//!
//! ```rust
//! use sqlgate_engine::{
//!     ConcurrencyMode, ConnectionTarget, Engine, IsolationProfile,
//!     resolve_isolation, resolve_mode,
//! };
//!
//! let engine = Engine::Sqlite;
//! let caps = engine.capabilities();
//!
//! // An in-memory embedded target forces single-connection access.
//! let target = ConnectionTarget::new(true, 0x1234);
//! let mode = resolve_mode(ConcurrencyMode::Standard, &caps, &target);
//! assert!(mode.is_single_connection());
//!
//! // Strict consistency always resolves, even for engines we know nothing about.
//! let level = resolve_isolation(Engine::Unknown, &Engine::Unknown.capabilities(),
//!     IsolationProfile::StrictConsistency)?;
//! assert_eq!(level, sqlgate_engine::IsolationLevel::Serializable);
//! # Ok::<(), sqlgate_engine::IsolationError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod isolation;
pub mod mode;
pub mod target;

// Re-export commonly used types
pub use engine::{Engine, EngineCapabilities, IsolationSupport};
pub use error::IsolationError;
pub use isolation::{IsolationLevel, IsolationProfile, resolve_isolation};
pub use mode::{ConcurrencyMode, EffectiveMode, resolve_mode};
pub use target::ConnectionTarget;
