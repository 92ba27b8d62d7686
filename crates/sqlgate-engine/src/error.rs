//! Resolution error types.

use thiserror::Error;

use crate::engine::Engine;
use crate::isolation::{IsolationLevel, IsolationProfile};

/// Errors from resolving an isolation profile against an engine.
///
/// Both variants are deterministic given static configuration: retrying
/// without changing the engine, its settings, or the requested profile will
/// fail the same way.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IsolationError {
    /// The engine has no isolation level that honors the profile.
    #[error("engine {engine} does not support the {profile} profile")]
    ProfileUnsupported {
        /// Engine the profile was resolved against.
        engine: Engine,
        /// The profile that could not be honored.
        profile: IsolationProfile,
    },

    /// The engine has a level for the profile, but a deployment-side switch
    /// it depends on is not enabled.
    #[error("isolation level {level} on {engine} requires {prerequisite}")]
    PrerequisiteMissing {
        /// Engine the profile was resolved against.
        engine: Engine,
        /// The level that would have been used.
        level: IsolationLevel,
        /// What must be enabled on the engine side.
        prerequisite: &'static str,
    },
}
