//! Connection-string error types.

use thiserror::Error;

/// Errors from parsing a connection string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnstrError {
    /// A `;`-separated segment was not a `key=value` pair.
    #[error("invalid key-value segment: {segment}")]
    InvalidPair {
        /// The offending segment, verbatim.
        segment: String,
    },
}
