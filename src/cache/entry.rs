//! Cache entry records and partial updates.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// Type-erased payload as held by the store.
pub(crate) type AnyData = dyn Any + Send + Sync;

/// Loading / data / error / freshness record for one key.
///
/// An error never clears `data`: after a failed refresh the previous value
/// stays readable next to the error message.
pub struct CacheEntry<T: ?Sized> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<String>,
    /// Set only by a successful fetch; cleared by invalidation.
    pub last_updated: Option<Instant>,
}

impl<T: ?Sized> CacheEntry<T> {
    /// Data present and younger than `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.data.is_some()
            && self
                .last_updated
                .is_some_and(|t| now.saturating_duration_since(t) < ttl)
    }

    /// Never updated, or older than `ttl`.
    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        match self.last_updated {
            None => true,
            Some(t) => now.saturating_duration_since(t) > ttl,
        }
    }
}

impl<T: ?Sized> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
            last_updated: self.last_updated,
        }
    }
}

impl<T: ?Sized> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            last_updated: None,
        }
    }
}

impl<T: ?Sized> fmt::Debug for CacheEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("has_data", &self.data.is_some())
            .field("loading", &self.loading)
            .field("error", &self.error)
            .field("last_updated", &self.last_updated)
            .finish()
    }
}

impl CacheEntry<AnyData> {
    /// Typed view of an erased entry. `None` if the payload is another type.
    pub(crate) fn downcast<T: Send + Sync + 'static>(&self) -> Option<CacheEntry<T>> {
        let data = match &self.data {
            Some(any) => Some(Arc::clone(any).downcast::<T>().ok()?),
            None => None,
        };
        Some(CacheEntry {
            data,
            loading: self.loading,
            error: self.error.clone(),
            last_updated: self.last_updated,
        })
    }
}

/// Partial update merged into an entry: unset fields keep their value.
#[derive(Default)]
pub(crate) struct EntryUpdate {
    pub data: Option<Arc<AnyData>>,
    pub loading: Option<bool>,
    pub error: Option<Option<String>>,
    pub last_updated: Option<Option<Instant>>,
}

impl EntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: Arc<AnyData>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn last_updated(mut self, at: Option<Instant>) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// Apply to `entry`; returns whether anything observable changed.
    pub fn apply(self, entry: &mut CacheEntry<AnyData>) -> bool {
        let mut changed = false;
        if let Some(data) = self.data {
            entry.data = Some(data);
            changed = true;
        }
        if let Some(loading) = self.loading {
            changed |= entry.loading != loading;
            entry.loading = loading;
        }
        if let Some(error) = self.error {
            changed |= entry.error != error;
            entry.error = error;
        }
        if let Some(at) = self.last_updated {
            changed |= entry.last_updated != at;
            entry.last_updated = at;
        }
        changed
    }
}

/// Freshness summary returned by [`CacheService::stats`](crate::CacheService::stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}
