//! # sqlgate-connstr
//!
//! Connection-string normalization and its memoization cache.
//!
//! Raw connection strings are parsed once into a [`NormalizedConnectionString`]:
//! a unique, case-insensitive key/value view plus the derived facts the rest
//! of the workspace needs (memory-backed detection, a stable key hash that
//! never exposes the raw string). Parsing the same raw string repeatedly is
//! common — every context construction does it — so a bounded
//! [`NormalizationCache`] memoizes the result.
//!
//! The cache is an explicit object owned by whoever composes contexts, never
//! a process global, and it is bounded: LRU capacity plus an optional TTL,
//! both configurable.
//!
//! ## Example
//!
//! ```rust
//! use sqlgate_connstr::{CacheConfig, NormalizationCache};
//!
//! let cache = NormalizationCache::new(CacheConfig::default());
//! let parsed = cache.get_or_parse("Server=localhost;Database=orders;")?;
//! assert_eq!(parsed.get("database"), Some("orders"));
//! assert!(!parsed.memory_backed());
//! # Ok::<(), sqlgate_connstr::ConnstrError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod error;
pub mod parse;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStats, NormalizationCache};
pub use error::ConnstrError;
pub use parse::NormalizedConnectionString;
