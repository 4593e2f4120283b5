//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use corral::telemetry;
use corral::{
    AuthorizationGate, CacheKey, CacheService, FetchError, IdentitySource, LoadConfig,
    MemoryStore, Principal, SessionState,
};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name, optionally
/// restricted to one label value.
fn counter_total(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            Some((k, v)) => key
                .key()
                .labels()
                .any(|l| l.key() == k && l.value() == v),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` keeps the sync `with_local_recorder` closure on the
/// current thread while `block_on` drives the inner async work.
fn recorded<F: Future>(fut: F) -> (F::Output, Snapshotter) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter)
}

struct Anonymous;

#[async_trait]
impl IdentitySource for Anonymous {
    async fn who_am_i(&self) -> Result<Principal, FetchError> {
        Err(FetchError::server(401, "Unauthenticated."))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_records_fetches_hits_and_dedup() {
    let ((), snapshotter) = recorded(async {
        let cache = CacheService::new();
        let key = CacheKey::new("animals").id(1);
        cache.acquire_handle::<u32>(&key).unwrap();

        cache
            .load(&key, || async { Ok::<_, FetchError>(1u32) }, &LoadConfig::new())
            .await
            .unwrap();
        cache
            .load(&key, || async { Ok::<_, FetchError>(2u32) }, &LoadConfig::new())
            .await
            .unwrap();
        cache.invalidate_pattern("animals:*");
        cache
            .load(
                &key,
                || async { Err::<u32, _>(FetchError::server(500, "boom")) },
                &LoadConfig::new(),
            )
            .await
            .unwrap();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::FETCHES_TOTAL, Some(("status", "ok"))),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::FETCHES_TOTAL, Some(("status", "error"))),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL, None), 1);
    assert_eq!(counter_total(&snapshot, telemetry::INVALIDATIONS_TOTAL, None), 1);
    assert!(has_histogram(&snapshot, telemetry::FETCH_DURATION_SECONDS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn gate_and_session_record_outcomes() {
    let (decision, snapshotter) = recorded(async {
        let session = Arc::new(SessionState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Anonymous),
        ));
        AuthorizationGate::new(session)
            .authorize("/home", &["read"])
            .await
    });
    assert!(!decision.allowed());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::GATE_DECISIONS_TOTAL,
            Some(("outcome", "unauthenticated"))
        ),
        1
    );
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::SESSION_RESOLUTIONS_TOTAL,
            Some(("source", "none"))
        ),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let cache = CacheService::new();
    let key = CacheKey::new("profile");
    cache.acquire_handle::<String>(&key).unwrap();
    cache
        .load(
            &key,
            || async { Ok::<_, FetchError>("Robby".to_string()) },
            &LoadConfig::new(),
        )
        .await
        .unwrap();
}
