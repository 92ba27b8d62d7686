//! End-to-end governance behavior through the public context API.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use sqlgate::{
    AccessContext, CacheConfig, ConcurrencyMode, ContextConfig, EffectiveMode, Engine, Error,
    GovernorError, IsolationLevel, IsolationProfile, MetricsConfig, MetricsRegistry,
    NormalizationCache, PoolLabel,
};

fn standard_postgres(max_readers: usize) -> AccessContext {
    AccessContext::standalone(
        ContextConfig::new(Engine::Postgres, "Server=localhost;Database=orders")
            .max_readers(max_readers)
            .acquire_timeout(Duration::from_millis(200)),
    )
    .unwrap()
}

#[tokio::test]
async fn standard_mode_routes_reads_and_writes_to_pools() {
    let context = standard_postgres(10);
    assert_eq!(context.effective_mode(), EffectiveMode::Standard);

    let read = context.acquire_read().await.unwrap();
    let write = context.acquire_write().await.unwrap();
    assert!(!read.is_exclusive());
    assert!(!write.is_exclusive());

    assert_eq!(context.pool_snapshot(PoolLabel::Reader).in_use, 1);
    assert_eq!(context.pool_snapshot(PoolLabel::Writer).in_use, 1);

    drop(read);
    drop(write);
    assert_eq!(context.pool_snapshot(PoolLabel::Reader).in_use, 0);
    assert_eq!(context.pool_snapshot(PoolLabel::Writer).in_use, 0);
}

#[tokio::test]
async fn sqlite_standard_request_serializes_writes() {
    let context = AccessContext::standalone(ContextConfig::new(
        Engine::Sqlite,
        "Data Source=orders.db",
    ))
    .unwrap();
    assert_eq!(context.effective_mode(), EffectiveMode::SingleWriter);

    // Reads still pool; writes go through the contention lock.
    let read = context.acquire_read().await.unwrap();
    assert!(!read.is_exclusive());
    let write = context.acquire_write().await.unwrap();
    assert!(write.is_exclusive());

    assert_eq!(context.contention_snapshot().total_acquires, 1);
    assert!(context.pool_snapshot(PoolLabel::Writer).disabled);
}

#[tokio::test]
async fn memory_backed_sqlite_forces_single_connection_for_any_request() {
    for requested in [
        ConcurrencyMode::Standard,
        ConcurrencyMode::SingleWriter,
        ConcurrencyMode::SingleConnection,
        ConcurrencyMode::KeepAlive,
    ] {
        let context = AccessContext::standalone(
            ContextConfig::new(Engine::Sqlite, "Data Source=:memory:")
                .requested_mode(requested),
        )
        .unwrap();
        assert_eq!(
            context.effective_mode(),
            EffectiveMode::SingleConnection,
            "requested {requested:?}"
        );

        // Even reads are exclusive; both pools are disabled.
        let read = context.acquire_read().await.unwrap();
        assert!(read.is_exclusive());
        assert!(context.pool_snapshot(PoolLabel::Reader).disabled);
        assert!(context.pool_snapshot(PoolLabel::Writer).disabled);
    }
}

#[tokio::test(start_paused = true)]
async fn reader_pool_scenario_release_unblocks_before_timeout() {
    // Reader pool bound 1, timeout 200ms: the first acquire holds the only
    // slot, the second queues and completes once the first releases at 25ms.
    let context = Arc::new(standard_postgres(1));

    let first = context.acquire_read().await.unwrap();
    assert_eq!(context.pool_snapshot(PoolLabel::Reader).in_use, 1);

    let waiter_context = Arc::clone(&context);
    let second = tokio::spawn(async move { waiter_context.acquire_read().await });
    tokio::task::yield_now().await;
    assert_eq!(context.pool_snapshot(PoolLabel::Reader).queued, 1);

    tokio::time::sleep(Duration::from_millis(25)).await;
    drop(first);

    let permit = second.await.unwrap().unwrap();
    drop(permit);

    let snap = context.pool_snapshot(PoolLabel::Reader);
    assert_eq!(snap.total_acquired, 2);
    assert_eq!(snap.total_timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn saturated_reader_pool_times_out_with_typed_error() {
    let context = standard_postgres(1);
    let _held = context.acquire_read().await.unwrap();

    let err = context
        .acquire_read_with(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        Error::Governor(GovernorError::PoolSaturated {
            label, snapshot, ..
        }) => {
            assert_eq!(label, PoolLabel::Reader);
            assert_eq!(snapshot.total_timeouts, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(context.metrics_snapshot().pool_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn contention_lock_scenario_holder_never_releases() {
    // Single-connection context, 25ms timeout, holder never releases: the
    // second lock attempt fails with the mode in the error.
    let context = AccessContext::standalone(ContextConfig::new(
        Engine::Sqlite,
        "Data Source=:memory:",
    ))
    .unwrap();

    let _held = context.acquire_write().await.unwrap();
    let err = context
        .acquire_write_with(Duration::from_millis(25))
        .await
        .unwrap_err();
    match err {
        Error::Governor(GovernorError::ModeContention { mode, snapshot }) => {
            assert_eq!(mode, EffectiveMode::SingleConnection);
            assert_eq!(snapshot.total_timeouts, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(context.contention_snapshot().total_timeouts, 1);
    assert_eq!(context.metrics_snapshot().lock_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn contended_waits_feed_the_metrics_registry() {
    let context = Arc::new(standard_postgres(1));

    let first = context.acquire_read().await.unwrap();
    let waiter_context = Arc::clone(&context);
    let second = tokio::spawn(async move { waiter_context.acquire_read().await });
    tokio::task::yield_now().await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(first);
    drop(second.await.unwrap().unwrap());

    let snap = context.metrics_snapshot();
    assert_eq!(snap.pool_wait.count, 1);
    assert!(snap.pool_wait.total >= Duration::from_millis(10));
}

#[tokio::test]
async fn close_fails_later_acquires_deterministically() {
    let context = standard_postgres(2);
    let held = context.acquire_read().await.unwrap();

    context.close();
    assert!(context.is_closed());

    let err = context.acquire_read().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Governor(GovernorError::PoolClosed { .. })
    ));
    assert!(!err.is_retryable());

    let err = context.acquire_write().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Governor(GovernorError::PoolClosed { .. })
    ));

    // Close is idempotent, and outstanding permits still release cleanly.
    context.close();
    drop(held);
    assert_eq!(context.pool_snapshot(PoolLabel::Reader).in_use, 0);
}

#[tokio::test]
async fn isolation_resolution_through_the_context() {
    let context = AccessContext::standalone(ContextConfig::new(
        Engine::Unknown,
        "Server=somewhere;Database=legacy",
    ))
    .unwrap();

    let level = context
        .resolve_isolation(IsolationProfile::StrictConsistency)
        .unwrap();
    assert_eq!(level, IsolationLevel::Serializable);

    let err = context
        .resolve_isolation(IsolationProfile::FastWithRisks)
        .unwrap_err();
    assert!(matches!(err, Error::Isolation(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn shared_cache_is_hit_across_contexts() {
    let cache = Arc::new(NormalizationCache::new(CacheConfig::default()));
    let metrics = Arc::new(MetricsRegistry::new(MetricsConfig::default()));

    let config = ContextConfig::new(Engine::Postgres, "Server=localhost;Database=orders");
    let first =
        AccessContext::new(config.clone(), Arc::clone(&cache), Arc::clone(&metrics)).unwrap();
    let second = AccessContext::new(config, Arc::clone(&cache), Arc::clone(&metrics)).unwrap();

    let stats = first.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    // Same normalized target, same key hash in both contexts.
    assert_eq!(first.target().key_hash, second.target().key_hash);
}

#[tokio::test]
async fn snapshots_serialize_for_diagnostics() {
    let context = standard_postgres(2);
    let _permit = context.acquire_read().await.unwrap();

    let json = serde_json::to_string(&context.pool_snapshot(PoolLabel::Reader)).unwrap();
    assert!(json.contains("\"in_use\":1"));

    let json = serde_json::to_string(&context.contention_snapshot()).unwrap();
    assert!(json.contains("\"total_acquires\""));
}

#[tokio::test]
async fn malformed_connection_string_is_a_config_class_error() {
    let err = AccessContext::standalone(ContextConfig::new(
        Engine::Postgres,
        "Server=localhost;garbage",
    ))
    .unwrap_err();
    assert!(matches!(err, Error::ConnectionString(_)));
    assert!(!err.is_retryable());
}
