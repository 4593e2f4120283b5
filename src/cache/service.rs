//! Fetch coordination: dedup, TTL and stale-while-revalidate over the store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{CacheEntry, CacheStats, EntryUpdate};
use super::handle::CacheHandle;
use super::key::CacheKey;
use super::pattern::KeyPattern;
use super::store::{CacheStore, Slot};
use crate::api::RetryConfig;
use crate::telemetry;
use crate::{FetchError, Result};

/// Default time-to-live: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-call load options.
///
/// ```rust
/// # use corral::LoadConfig;
/// # use std::time::Duration;
/// let config = LoadConfig::new()
///     .ttl(Duration::from_secs(30))
///     .stale_while_revalidate(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    /// Freshness window. `None` uses the service default.
    pub ttl: Option<Duration>,
    /// Keep showing stale data without raising `loading` while refreshing.
    pub stale_while_revalidate: bool,
    /// Attempts a caller intends to make. Never applied by the service;
    /// see [`retry_config()`](Self::retry_config).
    pub retry_attempts: Option<u32>,
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Retry policy for wrapping a producer with
    /// [`with_retry`](crate::api::with_retry). A single attempt when
    /// `retry_attempts` is unset.
    pub fn retry_config(&self) -> RetryConfig {
        match self.retry_attempts {
            Some(n) => RetryConfig::new().max_attempts(n.max(1)),
            None => RetryConfig::disabled(),
        }
    }
}

/// What a call to [`CacheService::load`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Entry was fresh; the producer was not invoked.
    Fresh,
    /// Another fetch for this key is running; the producer was not invoked.
    InFlight,
    /// The producer ran and its value was stored.
    Fetched,
    /// The producer failed; the message was stored, data left untouched.
    Failed(String),
}

/// Decision taken synchronously before any producer runs.
enum Begin {
    Skip(LoadOutcome),
    Start(FetchTicket),
}

/// Exclusive right to complete one fetch for one key.
///
/// Dropping an uncompleted ticket (e.g. the load future was cancelled)
/// releases the in-flight marker and lowers `loading` if it was raised.
struct FetchTicket {
    slot: Arc<Slot>,
    scope: String,
    show_loading: bool,
    started: Instant,
    done: bool,
}

impl FetchTicket {
    fn complete<T: Send + Sync + 'static>(
        mut self,
        result: std::result::Result<T, FetchError>,
    ) -> LoadOutcome {
        self.done = true;
        let elapsed = self.started.elapsed();
        metrics::histogram!(telemetry::FETCH_DURATION_SECONDS, "scope" => self.scope.clone())
            .record(elapsed.as_secs_f64());

        match result {
            Ok(data) => {
                let data: Arc<super::entry::AnyData> = Arc::new(data);
                let update = EntryUpdate::new()
                    .data(data)
                    .error(None)
                    .last_updated(Some(Instant::now()))
                    .loading(false);
                self.release(update);
                metrics::counter!(telemetry::FETCHES_TOTAL,
                    "scope" => self.scope.clone(),
                    "status" => "ok",
                )
                .increment(1);
                debug!(scope = %self.scope, elapsed_ms = elapsed.as_millis() as u64, "fetch succeeded");
                LoadOutcome::Fetched
            }
            Err(err) => {
                let message = err.user_message();
                let update = EntryUpdate::new()
                    .loading(false)
                    .error(Some(message.clone()));
                self.release(update);
                metrics::counter!(telemetry::FETCHES_TOTAL,
                    "scope" => self.scope.clone(),
                    "status" => "error",
                )
                .increment(1);
                warn!(scope = %self.scope, error = %err, "fetch failed");
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Apply the final update and clear the in-flight marker together.
    fn release(&self, update: EntryUpdate) {
        self.slot.modify(|state| {
            state.in_flight = false;
            ((), update.apply(&mut state.entry))
        });
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        debug!(scope = %self.scope, "fetch abandoned before completion");
        let show_loading = self.show_loading;
        self.slot.modify(|state| {
            state.in_flight = false;
            if show_loading && state.entry.loading {
                state.entry.loading = false;
                ((), true)
            } else {
                ((), false)
            }
        });
    }
}

/// Client-side request cache with loading-state coordination.
///
/// Every entry must be bound with [`acquire_handle`](Self::acquire_handle)
/// before it is loaded. For a given key at most one producer runs at a
/// time; late callers observe the in-flight state through their handle
/// instead of starting a duplicate fetch.
///
/// ```rust,no_run
/// # use corral::{CacheKey, CacheService, FetchError, LoadConfig};
/// # async fn demo() -> corral::Result<()> {
/// let cache = CacheService::new();
/// let key = CacheKey::new("profile");
/// let profile = cache.acquire_handle::<String>(&key)?;
///
/// cache
///     .load(&key, || async { Ok::<_, FetchError>("Robby".to_string()) }, &LoadConfig::new())
///     .await?;
/// assert_eq!(profile.data().as_deref().map(String::as_str), Some("Robby"));
/// # Ok(())
/// # }
/// ```
pub struct CacheService {
    store: CacheStore,
    default_ttl: Duration,
}

impl CacheService {
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            store: CacheStore::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Bind a typed handle to `key`, creating an empty entry on first use.
    ///
    /// Fails with [`TypeMismatch`](crate::CorralError::TypeMismatch) if the
    /// key was already acquired for another type.
    pub fn acquire_handle<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Result<CacheHandle<T>> {
        let canonical = key.canonical();
        let slot = self.store.acquire::<T>(&canonical)?;
        Ok(CacheHandle::new(canonical, slot.subscribe()))
    }

    /// Load `key` through `producer` unless it is fresh or already in flight.
    ///
    /// Producer failures are stored in the entry, not returned; the `Err`
    /// case is reserved for misuse (unacquired key, wrong type).
    pub async fn load<T, F, Fut>(
        &self,
        key: &CacheKey,
        producer: F,
        config: &LoadConfig,
    ) -> Result<LoadOutcome>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        match self.begin::<T>(key, config)? {
            Begin::Skip(outcome) => Ok(outcome),
            Begin::Start(ticket) => {
                let result = producer().await;
                Ok(ticket.complete(result))
            }
        }
    }

    /// Like [`load`](Self::load), but runs the producer on a spawned task.
    ///
    /// The fresh / in-flight decision and the `loading` flag are applied
    /// before this returns. Returns the task handle when a fetch started.
    pub fn spawn_load<T, F, Fut>(
        &self,
        key: &CacheKey,
        producer: F,
        config: &LoadConfig,
    ) -> Result<Option<JoinHandle<LoadOutcome>>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>> + Send + 'static,
    {
        match self.begin::<T>(key, config)? {
            Begin::Skip(_) => Ok(None),
            Begin::Start(ticket) => {
                let fut = producer();
                Ok(Some(tokio::spawn(async move {
                    let result = fut.await;
                    ticket.complete(result)
                })))
            }
        }
    }

    /// Mark `key` stale, then [`load`](Self::load) it.
    pub async fn refresh<T, F, Fut>(
        &self,
        key: &CacheKey,
        producer: F,
        config: &LoadConfig,
    ) -> Result<LoadOutcome>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        let canonical = key.canonical();
        self.store.acquired::<T>(&canonical)?;
        self.store
            .write(&canonical, EntryUpdate::new().last_updated(None));
        self.load(key, producer, config).await
    }

    /// Apply the load policy and, if a fetch should run, claim it.
    fn begin<T: Send + Sync + 'static>(&self, key: &CacheKey, config: &LoadConfig) -> Result<Begin> {
        let canonical = key.canonical();
        let slot = self.store.acquired::<T>(&canonical)?;
        let ttl = config.ttl.unwrap_or(self.default_ttl);
        let now = Instant::now();
        let swr = config.stale_while_revalidate;

        let decision = slot.modify(|state| {
            if state.entry.is_fresh(now, ttl) {
                return (Err(LoadOutcome::Fresh), false);
            }
            if state.in_flight || state.entry.loading {
                return (Err(LoadOutcome::InFlight), false);
            }
            state.in_flight = true;
            let show_loading = !(swr && state.entry.data.is_some());
            let notify = if show_loading {
                EntryUpdate::new()
                    .loading(true)
                    .error(None)
                    .apply(&mut state.entry)
            } else {
                false
            };
            (Ok(show_loading), notify)
        });

        let scope = key.scope().to_string();
        match decision {
            Err(LoadOutcome::Fresh) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "scope" => scope).increment(1);
                debug!(key = %canonical, "serving fresh entry");
                Ok(Begin::Skip(LoadOutcome::Fresh))
            }
            Err(outcome) => {
                metrics::counter!(telemetry::CACHE_DEDUPLICATED_TOTAL, "scope" => scope)
                    .increment(1);
                debug!(key = %canonical, "fetch already in flight");
                Ok(Begin::Skip(outcome))
            }
            Ok(show_loading) => {
                debug!(key = %canonical, show_loading, "starting fetch");
                Ok(Begin::Start(FetchTicket {
                    slot,
                    scope,
                    show_loading,
                    started: now,
                    done: false,
                }))
            }
        }
    }

    /// True if `key` was never updated or is older than `ttl`
    /// (the default TTL when `None`). Unknown keys are stale.
    pub fn is_stale(&self, key: &CacheKey, ttl: Option<Duration>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        match self.store.slot(&key.canonical()) {
            Some(slot) => slot.snapshot().entry.is_stale(Instant::now(), ttl),
            None => true,
        }
    }

    /// Synchronous snapshot of an entry.
    pub fn read<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.store.read::<T>(&key.canonical())
    }

    pub fn get_cached_data<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.read::<T>(key)?.data
    }

    /// Mark one entry stale without dropping its data.
    pub fn invalidate(&self, key: &CacheKey) -> usize {
        let count = self.store.invalidate(&key.canonical());
        metrics::counter!(telemetry::INVALIDATIONS_TOTAL).increment(count as u64);
        count
    }

    /// Mark every entry whose canonical key matches `pattern` stale.
    ///
    /// See [`KeyPattern`] for the glob syntax.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let count = self.store.invalidate_matching(&KeyPattern::new(pattern));
        metrics::counter!(telemetry::INVALIDATIONS_TOTAL).increment(count as u64);
        debug!(pattern, count, "invalidated entries");
        count
    }

    /// Drop every entry. Existing handles stop receiving updates and
    /// fetches still running complete into detached entries.
    pub fn clear_all(&self) {
        debug!(entries = self.store.len(), "clearing cache");
        self.store.clear_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats(Instant::now(), self.default_ttl)
    }

    /// Canonical keys currently held.
    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults() {
        let config = LoadConfig::default();
        assert!(config.ttl.is_none());
        assert!(!config.stale_while_revalidate);
        assert_eq!(config.retry_config().max_attempts, 1);
    }

    #[test]
    fn retry_attempts_feed_retry_config() {
        let config = LoadConfig::new().retry_attempts(4);
        assert_eq!(config.retry_config().max_attempts, 4);
        assert_eq!(LoadConfig::new().retry_attempts(0).retry_config().max_attempts, 1);
    }

    #[tokio::test]
    async fn load_without_handle_is_rejected() {
        let cache = CacheService::new();
        let result = cache
            .load(
                &CacheKey::new("profile"),
                || async { Ok::<_, FetchError>(1u32) },
                &LoadConfig::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(crate::CorralError::HandleNotAcquired(_))
        ));
    }

    #[tokio::test]
    async fn dropped_load_releases_loading_flag() {
        let cache = CacheService::new();
        let key = CacheKey::new("herds");
        let handle = cache.acquire_handle::<u32>(&key).unwrap();
        let config = LoadConfig::new();

        {
            let fut = cache.load(
                &key,
                || std::future::pending::<std::result::Result<u32, FetchError>>(),
                &config,
            );
            let mut task = tokio_test::task::spawn(fut);
            assert!(task.poll().is_pending());
            assert!(handle.loading());
        }

        assert!(!handle.loading());
        // The marker is released, so a new fetch may start.
        let outcome = cache
            .load(&key, || async { Ok::<_, FetchError>(3u32) }, &config)
            .await
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Fetched);
    }

    #[tokio::test]
    async fn refresh_with_other_type_keeps_entry_fresh() {
        let cache = CacheService::new();
        let key = CacheKey::new("herds").id(1);
        cache.acquire_handle::<String>(&key).unwrap();
        let config = LoadConfig::new();
        cache
            .load(&key, || async { Ok::<_, FetchError>("north".to_string()) }, &config)
            .await
            .unwrap();

        let result = cache
            .refresh(&key, || async { Ok::<_, FetchError>(5u64) }, &config)
            .await;
        assert!(matches!(
            result,
            Err(crate::CorralError::TypeMismatch { .. })
        ));
        assert!(!cache.is_stale(&key, None));
        let entry = cache.read::<String>(&key).unwrap();
        assert!(entry.last_updated.is_some());
        assert_eq!(entry.data.as_deref().map(String::as_str), Some("north"));
    }
}
