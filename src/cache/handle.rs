//! Reactive, typed view over one cache entry.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

use super::entry::CacheEntry;
use super::store::SlotState;

/// Handle returned by [`CacheService::acquire_handle`](crate::CacheService::acquire_handle).
///
/// Accessors always read the latest published state. [`changed()`](Self::changed)
/// and [`stream()`](Self::stream) let views react to updates.
pub struct CacheHandle<T> {
    key: String,
    rx: watch::Receiver<SlotState>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> CacheHandle<T> {
    pub(crate) fn new(key: String, rx: watch::Receiver<SlotState>) -> Self {
        Self {
            key,
            rx,
            _type: PhantomData,
        }
    }

    /// Canonical key this handle observes.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn snapshot(&self) -> CacheEntry<T> {
        project(&self.rx.borrow())
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.snapshot().data
    }

    pub fn loading(&self) -> bool {
        self.rx.borrow().entry.loading
    }

    pub fn error(&self) -> Option<String> {
        self.rx.borrow().entry.error.clone()
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.rx.borrow().entry.last_updated
    }

    /// Wait for the next published change.
    ///
    /// Returns `false` once the entry is gone (after
    /// [`clear_all`](crate::CacheService::clear_all)) and no further
    /// updates can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Stream of entry snapshots, starting with the current one.
    pub fn stream(&self) -> impl Stream<Item = CacheEntry<T>> + Send + 'static {
        WatchStream::new(self.rx.clone()).map(|state| project(&state))
    }
}

fn project<T: Send + Sync + 'static>(state: &SlotState) -> CacheEntry<T> {
    // The store type-checks every acquire, so the payload is always a `T`.
    state.entry.downcast::<T>().unwrap_or_default()
}

impl<T> Clone for CacheHandle<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            rx: self.rx.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for CacheHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle").field("key", &self.key).finish()
    }
}
