//! Context configuration.

use std::time::Duration;

use sqlgate_engine::{ConcurrencyMode, Engine, EngineCapabilities};

use crate::error::Error;

/// Configuration for an [`AccessContext`](crate::AccessContext).
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Engine the target runs on.
    pub engine: Engine,

    /// Capability record for the target deployment. Starts from the engine's
    /// defaults; override the deployment-specific flags before building.
    pub capabilities: EngineCapabilities,

    /// Raw connection string identifying the target.
    pub connection_string: String,

    /// Concurrency discipline the caller wants. What the context enforces is
    /// resolved from this plus the engine and target.
    pub requested_mode: ConcurrencyMode,

    /// Reader-pool permit bound.
    pub max_readers: usize,

    /// Writer-pool permit bound.
    pub max_writers: usize,

    /// Default wait bound for acquires that do not pass their own.
    pub acquire_timeout: Duration,

    /// Recent samples kept per duration series when this config builds its
    /// own metrics registry.
    pub metrics_window: usize,
}

impl ContextConfig {
    /// Create a configuration for a target with default sizing.
    #[must_use]
    pub fn new(engine: Engine, connection_string: impl Into<String>) -> Self {
        Self {
            engine,
            capabilities: engine.capabilities(),
            connection_string: connection_string.into(),
            requested_mode: ConcurrencyMode::Standard,
            max_readers: 10,
            max_writers: 4,
            acquire_timeout: Duration::from_secs(30),
            metrics_window: 128,
        }
    }

    /// Override the capability record.
    #[must_use]
    pub fn capabilities(mut self, capabilities: EngineCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the requested concurrency mode.
    #[must_use]
    pub fn requested_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.requested_mode = mode;
        self
    }

    /// Set the reader-pool permit bound.
    #[must_use]
    pub fn max_readers(mut self, max: usize) -> Self {
        self.max_readers = max;
        self
    }

    /// Set the writer-pool permit bound.
    #[must_use]
    pub fn max_writers(mut self, max: usize) -> Self {
        self.max_writers = max;
        self
    }

    /// Set the default acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the metrics recent-sample window.
    #[must_use]
    pub fn metrics_window(mut self, window: usize) -> Self {
        self.metrics_window = window;
        self
    }

    /// Validate the configuration.
    ///
    /// Pool bounds must be positive: switching pooling off is a mode
    /// decision, not a sizing decision.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_readers == 0 {
            return Err(Error::Config("max_readers must be positive".to_string()));
        }
        if self.max_writers == 0 {
            return Err(Error::Config("max_writers must be positive".to_string()));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::Config(
                "acquire_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ContextConfig::new(Engine::Postgres, "Server=localhost");
        assert!(config.validate().is_ok());
        assert_eq!(config.requested_mode, ConcurrencyMode::Standard);
        assert_eq!(config.max_readers, 10);
        assert_eq!(config.max_writers, 4);
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let config = ContextConfig::new(Engine::Postgres, "Server=localhost").max_readers(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ContextConfig::new(Engine::Postgres, "Server=localhost").max_writers(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ContextConfig::new(Engine::Postgres, "Server=localhost")
            .acquire_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_fluent_overrides() {
        let config = ContextConfig::new(Engine::Sqlite, "Data Source=:memory:")
            .requested_mode(ConcurrencyMode::KeepAlive)
            .max_readers(2)
            .max_writers(1)
            .acquire_timeout(Duration::from_millis(250));
        assert_eq!(config.requested_mode, ConcurrencyMode::KeepAlive);
        assert_eq!(config.max_readers, 2);
        assert_eq!(config.acquire_timeout, Duration::from_millis(250));
    }
}
