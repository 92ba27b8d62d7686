//! # sqlgate-metrics
//!
//! Process-wide operational metrics for the sqlgate workspace.
//!
//! A [`MetricsRegistry`] is a sink for counters and timers fed by every other
//! component: command outcomes from the caller's driver layer, wait times and
//! timeouts from the governors. Writers touch independent atomics, so
//! unrelated recordings never contend; only the bounded recent-sample windows
//! take a brief lock. Readers call [`MetricsRegistry::snapshot`] and get an
//! immutable, non-torn copy.
//!
//! Instrumentation inputs are treated as noise, not data: a zero duration or
//! a zero count is silently discarded rather than raised, since it originates
//! from timing, not from the caller.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use sqlgate_metrics::{MetricsConfig, MetricsRegistry};
//!
//! let metrics = MetricsRegistry::new(MetricsConfig::default());
//! metrics.record_command(Duration::from_millis(12));
//! metrics.record_rows_read(40);
//!
//! let snap = metrics.snapshot();
//! assert_eq!(snap.commands_executed, 1);
//! assert_eq!(snap.rows_read, 40);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod registry;
pub mod snapshot;

// Re-export commonly used types
pub use registry::{MetricsConfig, MetricsRegistry};
pub use snapshot::{DurationSnapshot, MetricsSnapshot};
