//! Per-key async mutual exclusion.
//!
//! [`KeyedLocks`] hands out one guard per key at a time. Holders of different
//! keys never wait on each other. Entries are created on first use and pruned
//! when the last guard or waiter for a key goes away, so the map only ever
//! holds keys that are currently contended.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

/// A set of async locks indexed by key.
pub struct KeyedLocks<K> {
    inner: Arc<LockMap<K>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// The lock is released when the returned guard is dropped, on every exit
    /// path of the holder, including `?` returns and panics.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let entry = {
            let mut map = lock_map(&self.inner);
            Arc::clone(map.entry(key.clone()).or_default())
        };
        let guard = entry.lock_owned().await;
        KeyedGuard {
            key,
            guard: Some(guard),
            locks: Arc::clone(&self.inner),
        }
    }

    /// Number of keys currently held or waited on.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_map(&self.inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_map<K>(map: &LockMap<K>) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
    // The map is only touched in short non-panicking sections.
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one key of a [`KeyedLocks`].
pub struct KeyedGuard<K>
where
    K: Eq + Hash,
{
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap<K>>,
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = lock_map(&self.locks);
        // Only the map still references the entry: nobody holds or awaits it.
        if map
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            map.remove(&self.key);
        }
    }
}
