//! Keyed storage of cache entries.
//!
//! Each canonical key owns a [`Slot`]: a `watch` channel carrying the
//! entry plus the in-flight marker. Handles subscribe to the channel;
//! every mutation goes through `send_if_modified`, so a merge and its
//! publication happen in one critical section.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::entry::{AnyData, CacheEntry, CacheStats, EntryUpdate};
use super::pattern::KeyPattern;
use crate::{CorralError, Result};

/// Published state of one key.
#[derive(Clone, Default)]
pub(crate) struct SlotState {
    pub entry: CacheEntry<AnyData>,
    /// A producer is running for this key. Not part of the public entry:
    /// stale-while-revalidate fetches are in flight without `loading`.
    pub in_flight: bool,
}

pub(crate) struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    state: watch::Sender<SlotState>,
}

impl Slot {
    fn new<T: 'static>() -> Self {
        let (state, _) = watch::channel(SlotState::default());
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            state,
        }
    }

    fn check_type<T: 'static>(&self, key: &str) -> Result<()> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(CorralError::TypeMismatch {
                key: key.to_string(),
                stored: self.type_name,
                requested: type_name::<T>(),
            })
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SlotState {
        self.state.borrow().clone()
    }

    /// Merge `update` into the entry and notify handles if it changed.
    pub fn apply(&self, update: EntryUpdate) -> bool {
        self.state.send_if_modified(|state| update.apply(&mut state.entry))
    }

    /// Run `f` on the whole slot state atomically. `f` returns
    /// `(result, notify)`.
    pub fn modify<R>(&self, f: impl FnOnce(&mut SlotState) -> (R, bool)) -> R {
        let mut out = None;
        self.state.send_if_modified(|state| {
            let (result, notify) = f(state);
            out = Some(result);
            notify
        });
        // send_if_modified always invokes the closure exactly once.
        out.unwrap_or_else(|| unreachable!("send_if_modified skipped its closure"))
    }
}

/// Canonical-key-indexed entry storage.
///
/// Owned by [`CacheService`](crate::CacheService), which mediates every
/// write.
#[derive(Default)]
pub(crate) struct CacheStore {
    slots: RwLock<HashMap<String, Arc<Slot>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_slots(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Slot>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Slot>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Existing slot for `key`, or a new empty one typed for `T`.
    pub fn acquire<T: 'static>(&self, key: &str) -> Result<Arc<Slot>> {
        if let Some(slot) = self.read_slots().get(key) {
            slot.check_type::<T>(key)?;
            return Ok(Arc::clone(slot));
        }
        let mut slots = self.write_slots();
        let slot = slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Slot::new::<T>()));
        slot.check_type::<T>(key)?;
        Ok(Arc::clone(slot))
    }

    /// Slot for `key`, which must already have been acquired as `T`.
    pub fn acquired<T: 'static>(&self, key: &str) -> Result<Arc<Slot>> {
        let slot = self
            .read_slots()
            .get(key)
            .cloned()
            .ok_or_else(|| CorralError::HandleNotAcquired(key.to_string()))?;
        slot.check_type::<T>(key)?;
        Ok(slot)
    }

    pub fn slot(&self, key: &str) -> Option<Arc<Slot>> {
        self.read_slots().get(key).cloned()
    }

    /// Typed snapshot; `None` for unknown keys or another value type.
    pub fn read<T: Send + Sync + 'static>(&self, key: &str) -> Option<CacheEntry<T>> {
        let slot = self.slot(key)?;
        slot.check_type::<T>(key).ok()?;
        slot.snapshot().entry.downcast::<T>()
    }

    /// Merge a partial update. Unknown keys are ignored.
    pub fn write(&self, key: &str, update: EntryUpdate) -> bool {
        match self.slot(key) {
            Some(slot) => slot.apply(update),
            None => false,
        }
    }

    /// Clear `last_updated` for an exact key. Returns 1 if the key exists.
    pub fn invalidate(&self, key: &str) -> usize {
        match self.slot(key) {
            Some(slot) => {
                slot.apply(EntryUpdate::new().last_updated(None));
                1
            }
            None => 0,
        }
    }

    /// Clear `last_updated` for every key matching `pattern`.
    pub fn invalidate_matching(&self, pattern: &KeyPattern) -> usize {
        let matching: Vec<Arc<Slot>> = self
            .read_slots()
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        for slot in &matching {
            slot.apply(EntryUpdate::new().last_updated(None));
        }
        matching.len()
    }

    pub fn clear_all(&self) {
        self.write_slots().clear();
    }

    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.read_slots().keys().cloned().collect()
    }

    /// Fresh means updated less than `ttl` ago; everything else is stale.
    pub fn stats(&self, now: Instant, ttl: Duration) -> CacheStats {
        let slots = self.read_slots();
        let fresh_entries = slots
            .values()
            .filter(|slot| {
                slot.snapshot()
                    .entry
                    .last_updated
                    .is_some_and(|t| now.saturating_duration_since(t) < ttl)
            })
            .count();
        CacheStats {
            total_entries: slots.len(),
            fresh_entries,
            stale_entries: slots.len() - fresh_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_is_idempotent() {
        let store = CacheStore::new();
        let a = store.acquire::<u32>("users:1").unwrap();
        let b = store.acquire::<u32>("users:1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn acquire_with_other_type_fails() {
        let store = CacheStore::new();
        store.acquire::<u32>("users:1").unwrap();
        let err = store.acquire::<String>("users:1").err().unwrap();
        assert!(matches!(err, CorralError::TypeMismatch { .. }));
    }

    #[test]
    fn read_with_other_type_is_none() {
        let store = CacheStore::new();
        store.acquire::<String>("users:1").unwrap();
        assert!(store.read::<u64>("users:1").is_none());
        assert!(store.read::<String>("users:1").is_some());
    }

    #[test]
    fn acquired_requires_prior_acquire() {
        let store = CacheStore::new();
        assert!(matches!(
            store.acquired::<u32>("profile"),
            Err(CorralError::HandleNotAcquired(_))
        ));
    }

    #[test]
    fn write_to_unknown_key_is_ignored() {
        let store = CacheStore::new();
        assert!(!store.write("ghost", EntryUpdate::new().loading(true)));
        assert!(store.read::<u32>("ghost").is_none());
    }

    #[test]
    fn invalidate_keeps_data() {
        let store = CacheStore::new();
        store.acquire::<u32>("users:1").unwrap();
        let data: Arc<AnyData> = Arc::new(9u32);
        store.write(
            "users:1",
            EntryUpdate::new()
                .data(data)
                .last_updated(Some(Instant::now())),
        );

        assert_eq!(store.invalidate("users:1"), 1);
        let entry = store.read::<u32>("users:1").unwrap();
        assert!(entry.last_updated.is_none());
        assert_eq!(*entry.data.unwrap(), 9);
        assert_eq!(store.invalidate("users:2"), 0);
    }

    #[test]
    fn clear_all_drops_everything() {
        let store = CacheStore::new();
        store.acquire::<u32>("a").unwrap();
        store.acquire::<u32>("b").unwrap();
        store.clear_all();
        assert_eq!(store.len(), 0);
        assert!(store.read::<u32>("a").is_none());
    }
}
