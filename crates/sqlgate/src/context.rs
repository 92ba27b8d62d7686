//! The access context: composition root for one connection target.

use std::sync::Arc;
use std::time::Duration;

use sqlgate_connstr::{CacheConfig, CacheStats, NormalizationCache};
use sqlgate_engine::{
    ConnectionTarget, EffectiveMode, Engine, EngineCapabilities, IsolationLevel,
    IsolationProfile, resolve_isolation, resolve_mode,
};
use sqlgate_governor::{
    ContentionLock, ContentionSnapshot, LockGuard, Permit, PoolGovernor, PoolLabel, PoolSnapshot,
};
use sqlgate_metrics::{MetricsConfig, MetricsRegistry, MetricsSnapshot};

use crate::config::ContextConfig;
use crate::error::{Error, Result};

/// Governs all access to one connection target.
///
/// Construction resolves the effective concurrency mode exactly once and
/// wires the admission primitives accordingly; the mode never changes for
/// the life of the context. All state is in-memory and dies with the
/// context — nothing is persisted.
///
/// The context never touches the engine itself: opening, validating and
/// closing physical connections belongs to the driver layer that holds the
/// permits this context hands out.
pub struct AccessContext {
    engine: Engine,
    capabilities: EngineCapabilities,
    target: ConnectionTarget,
    effective_mode: EffectiveMode,
    acquire_timeout: Duration,
    reader_pool: PoolGovernor,
    writer_pool: PoolGovernor,
    lock: ContentionLock,
    cache: Arc<NormalizationCache>,
    metrics: Arc<MetricsRegistry>,
}

impl AccessContext {
    /// Create a context with an injected normalization cache and metrics
    /// registry, both typically shared across contexts.
    ///
    /// The connection string is normalized through the cache; the target
    /// descriptor and effective mode are derived from the result.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for invalid sizing, [`Error::ConnectionString`] for
    /// an unparseable connection string.
    pub fn new(
        config: ContextConfig,
        cache: Arc<NormalizationCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        config.validate()?;

        let normalized = cache.get_or_parse(&config.connection_string)?;
        let target = ConnectionTarget::new(normalized.memory_backed(), normalized.key_hash());
        let effective_mode = resolve_mode(config.requested_mode, &config.capabilities, &target);

        // Pool sizing per mode: a disabled governor (bound 0) admits
        // uncounted, so call sites never branch on the mode themselves.
        let (reader_bound, writer_bound) = match effective_mode {
            EffectiveMode::Standard | EffectiveMode::KeepAlive => {
                (config.max_readers, config.max_writers)
            }
            EffectiveMode::SingleWriter => (config.max_readers, 0),
            EffectiveMode::SingleConnection => (0, 0),
        };

        tracing::info!(
            engine = %config.engine,
            requested = %config.requested_mode,
            effective = %effective_mode,
            memory_backed = target.memory_backed,
            key_hash = format_args!("{:#018x}", target.key_hash),
            max_readers = reader_bound,
            max_writers = writer_bound,
            "access context created"
        );

        Ok(Self {
            engine: config.engine,
            capabilities: config.capabilities,
            target,
            effective_mode,
            acquire_timeout: config.acquire_timeout,
            reader_pool: PoolGovernor::new(
                PoolLabel::Reader,
                reader_bound,
                target.key_hash,
                Arc::clone(&metrics),
            ),
            writer_pool: PoolGovernor::new(
                PoolLabel::Writer,
                writer_bound,
                target.key_hash,
                Arc::clone(&metrics),
            ),
            lock: ContentionLock::new(effective_mode, Arc::clone(&metrics)),
            cache,
            metrics,
        })
    }

    /// Create a self-contained context with its own cache and registry.
    ///
    /// Useful in tests and single-target programs; multi-target programs
    /// should share both through [`AccessContext::new`].
    pub fn standalone(config: ContextConfig) -> Result<Self> {
        let cache = Arc::new(NormalizationCache::new(CacheConfig::default()));
        let metrics = Arc::new(MetricsRegistry::new(
            MetricsConfig::new().window(config.metrics_window),
        ));
        Self::new(config, cache, metrics)
    }

    /// Acquire read access using the configured default timeout.
    pub async fn acquire_read(&self) -> Result<AccessPermit> {
        self.acquire_read_with(self.acquire_timeout).await
    }

    /// Acquire read access, waiting up to `timeout`.
    ///
    /// Routed per the effective mode: through the reader pool normally,
    /// through the contention lock under single-connection access.
    pub async fn acquire_read_with(&self, timeout: Duration) -> Result<AccessPermit> {
        match self.effective_mode {
            EffectiveMode::SingleConnection => {
                let guard = self.lock.lock(timeout).await?;
                Ok(AccessPermit::exclusive(guard))
            }
            _ => {
                let permit = self.reader_pool.acquire(timeout).await?;
                Ok(AccessPermit::pooled(permit))
            }
        }
    }

    /// Acquire write access using the configured default timeout.
    pub async fn acquire_write(&self) -> Result<AccessPermit> {
        self.acquire_write_with(self.acquire_timeout).await
    }

    /// Acquire write access, waiting up to `timeout`.
    ///
    /// Routed per the effective mode: through the writer pool normally,
    /// through the contention lock when writes are serialized.
    pub async fn acquire_write_with(&self, timeout: Duration) -> Result<AccessPermit> {
        if self.effective_mode.serializes_writes() {
            let guard = self.lock.lock(timeout).await?;
            Ok(AccessPermit::exclusive(guard))
        } else {
            let permit = self.writer_pool.acquire(timeout).await?;
            Ok(AccessPermit::pooled(permit))
        }
    }

    /// Resolve an isolation profile against this context's engine.
    pub fn resolve_isolation(&self, profile: IsolationProfile) -> Result<IsolationLevel> {
        Ok(resolve_isolation(self.engine, &self.capabilities, profile)?)
    }

    /// The concurrency discipline this context enforces.
    #[must_use]
    pub const fn effective_mode(&self) -> EffectiveMode {
        self.effective_mode
    }

    /// The engine this context targets.
    #[must_use]
    pub const fn engine(&self) -> Engine {
        self.engine
    }

    /// The governed connection target.
    #[must_use]
    pub const fn target(&self) -> ConnectionTarget {
        self.target
    }

    /// Handle to the metrics registry, for the driver layer to record
    /// command outcomes into.
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Immutable copy of every metrics aggregate.
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Immutable copy of one pool governor's counters.
    #[must_use]
    pub fn pool_snapshot(&self, label: PoolLabel) -> PoolSnapshot {
        match label {
            PoolLabel::Reader => self.reader_pool.snapshot(),
            PoolLabel::Writer => self.writer_pool.snapshot(),
        }
    }

    /// Immutable copy of the contention lock's counters.
    #[must_use]
    pub fn contention_snapshot(&self) -> ContentionSnapshot {
        self.lock.snapshot()
    }

    /// Counters for the normalization cache this context parses through.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Close the context.
    ///
    /// Both governors and the lock close; in-flight and future acquires fail
    /// deterministically with the closed-variant errors. Permits and guards
    /// already handed out remain valid until dropped. Idempotent.
    pub fn close(&self) {
        if self.reader_pool.is_closed() {
            return;
        }
        self.reader_pool.close();
        self.writer_pool.close();
        self.lock.close();
        tracing::info!(
            effective = %self.effective_mode,
            key_hash = format_args!("{:#018x}", self.target.key_hash),
            "access context closed"
        );
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.reader_pool.is_closed()
    }
}

impl Drop for AccessContext {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessContext")
            .field("engine", &self.engine)
            .field("effective_mode", &self.effective_mode)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Access granted by an [`AccessContext`]: either a pooled permit or
/// exclusive ownership of the contention lock, released on drop either way.
pub struct AccessPermit {
    inner: PermitInner,
}

enum PermitInner {
    Pooled(Permit),
    Exclusive(LockGuard),
}

impl AccessPermit {
    fn pooled(permit: Permit) -> Self {
        Self {
            inner: PermitInner::Pooled(permit),
        }
    }

    fn exclusive(guard: LockGuard) -> Self {
        Self {
            inner: PermitInner::Exclusive(guard),
        }
    }

    /// Whether this permit holds the contention lock rather than a pool slot.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        matches!(self.inner, PermitInner::Exclusive(_))
    }
}

impl std::fmt::Debug for AccessPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessPermit")
            .field("exclusive", &self.is_exclusive())
            .finish()
    }
}
