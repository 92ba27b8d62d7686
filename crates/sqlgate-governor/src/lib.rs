//! # sqlgate-governor
//!
//! The enforcement half of sqlgate: two async concurrency primitives that
//! govern access to one connection target.
//!
//! - [`PoolGovernor`] bounds how many operations of one class (reads or
//!   writes) may be outstanding at once. Admission beyond the bound queues
//!   strictly FIFO, with a per-call timeout.
//! - [`ContentionLock`] serializes access entirely when the effective mode
//!   demands a single logical connection or writer, and accounts for every
//!   wait it causes.
//!
//! The two are not interchangeable: the governor's peak concurrency is its
//! permit bound, the lock's is one. A context wires acquires to one or the
//! other based on its resolved mode.
//!
//! Both primitives suspend the calling task while waiting, never a thread,
//! and both fail a timed-out or closed-out wait with a typed error carrying
//! a snapshot of the primitive's counters at that moment.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sqlgate_governor::{PoolGovernor, PoolLabel};
//! use sqlgate_metrics::{MetricsConfig, MetricsRegistry};
//!
//! # async fn demo() -> Result<(), sqlgate_governor::GovernorError> {
//! let metrics = Arc::new(MetricsRegistry::new(MetricsConfig::default()));
//! let pool = PoolGovernor::new(PoolLabel::Reader, 8, 0xfeed, metrics);
//!
//! let permit = pool.acquire(Duration::from_secs(5)).await?;
//! assert_eq!(pool.snapshot().in_use, 1);
//! drop(permit); // slot returns, or hands off to the longest waiter
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod lock;
pub mod pool;
mod waiter;

// Re-export commonly used types
pub use error::GovernorError;
pub use lock::{ContentionLock, ContentionSnapshot, LockGuard};
pub use pool::{Permit, PoolGovernor, PoolLabel, PoolSnapshot};
