//! Facade error type.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by an [`AccessContext`](crate::AccessContext).
///
/// Nothing is swallowed or re-classified on the way up: governance timeouts
/// stay retryable, resolution failures stay configuration errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Admission or exclusion failure from the governors.
    #[error("governor error: {0}")]
    Governor(#[from] sqlgate_governor::GovernorError),

    /// Isolation profile could not be resolved for the engine.
    #[error("isolation error: {0}")]
    Isolation(#[from] sqlgate_engine::IsolationError),

    /// The connection string could not be normalized.
    #[error("connection string error: {0}")]
    ConnectionString(#[from] sqlgate_connstr::ConnstrError),

    /// Invalid context configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the same call can succeed without reconfiguration.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Governor(inner) => inner.is_retryable(),
            Self::Isolation(_) | Self::ConnectionString(_) | Self::Config(_) => false,
        }
    }
}
