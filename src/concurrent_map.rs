//! ConcurrentMap: a hashbrown map behind the raw lock of a `LockMode`.
//!
//! Every operation acquires the lock once, in shared mode for observations
//! and exclusive mode for mutations, and releases it before returning. No
//! user code runs under the lock except the closures of the explicitly
//! "locked" operations.

use crate::mode::{LockMode, Safe, Unsync};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use lock_api::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::hash_map::RandomState;
use tracing::trace;

/// A hash map guarded by the reader-writer lock of mode `M`.
///
/// `M = Safe` gives a `Sync` map for concurrent use; `M = Unsync` (the
/// default) skips synchronization entirely and is confined to one thread at
/// a time by the compiler.
pub struct ConcurrentMap<K, V, M: LockMode = Unsync, S = RandomState> {
    inner: RwLock<M::Raw, HashMap<K, V, S>>,
}

/// A map with real reader-writer locking.
pub type SafeMap<K, V, S = RandomState> = ConcurrentMap<K, V, Safe, S>;

/// A map without synchronization.
pub type UnsyncMap<K, V, S = RandomState> = ConcurrentMap<K, V, Unsync, S>;

pub(crate) type ReadGuard<'a, K, V, M, S> =
    RwLockReadGuard<'a, <M as LockMode>::Raw, HashMap<K, V, S>>;
pub(crate) type WriteGuard<'a, K, V, M, S> =
    RwLockWriteGuard<'a, <M as LockMode>::Raw, HashMap<K, V, S>>;

impl<K, V, M: LockMode> ConcurrentMap<K, V, M> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, M: LockMode, S> ConcurrentMap<K, V, M, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(HashMap::with_hasher(hasher))
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::from_map(HashMap::with_capacity_and_hasher(capacity, hasher))
    }

    /// Adopt `map` as the backing store. Ownership moves in; nothing is
    /// copied.
    pub fn from_map(map: HashMap<K, V, S>) -> Self {
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Whether this map synchronizes (`true` for `Safe`).
    #[inline]
    pub fn is_safe(&self) -> bool {
        M::SAFE
    }

    pub fn into_inner(self) -> HashMap<K, V, S> {
        self.inner.into_inner()
    }

    /// Direct access to the backing map. No locking is needed because the
    /// caller holds the container exclusively.
    pub fn get_mut(&mut self) -> &mut HashMap<K, V, S> {
        self.inner.get_mut()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn read(&self) -> ReadGuard<'_, K, V, M, S> {
        self.inner.read()
    }

    #[inline]
    pub(crate) fn write(&self) -> WriteGuard<'_, K, V, M, S> {
        self.inner.write()
    }
}

impl<K, V, M, S> ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher,
{
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.read().contains_key(key)
    }

    /// Value for `key`, or `V::default()` when absent. Use `search` to tell
    /// a stored default apart from a missing key.
    pub fn get<Q>(&self, key: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Default + Clone,
    {
        self.search(key).unwrap_or_default()
    }

    pub fn search<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.read().get(key).cloned()
    }

    /// Run `f` on the value for `key` under the read lock. Works for values
    /// that are not `Clone`.
    pub fn get_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        self.read().get(key).map(f)
    }

    /// Unordered snapshot of the keys.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.read().keys().cloned().collect()
    }

    /// Unordered snapshot of the values.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.read().values().cloned().collect()
    }

    pub fn set(&self, key: K, value: V) {
        self.write().insert(key, value);
    }

    /// Upsert every entry of `entries` as one atomic batch. The input is
    /// collected before the lock is taken.
    pub fn set_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let count = entries.len();
        self.write().extend(entries);
        trace!(count, "set entries");
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.write().remove(key)
    }

    /// Copy of every entry. Later mutations of the map are not visible
    /// through the returned map.
    pub fn snapshot(&self) -> HashMap<K, V, S>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        self.read().clone()
    }

    /// Swap in a fresh empty map. The old storage is released after the
    /// lock is dropped.
    pub fn clear(&self)
    where
        S: Clone,
    {
        let mut guard = self.write();
        let fresh = HashMap::with_hasher(guard.hasher().clone());
        let old = core::mem::replace(&mut *guard, fresh);
        drop(guard);
        trace!(count = old.len(), "cleared map");
    }
}

impl<K, V, M: LockMode, S: Default> Default for ConcurrentMap<K, V, M, S> {
    fn default() -> Self {
        Self::from_map(HashMap::default())
    }
}

impl<K, V, M, S> Clone for ConcurrentMap<K, V, M, S>
where
    K: Clone,
    V: Clone,
    M: LockMode,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self::from_map(self.read().clone())
    }
}

impl<K, V, M: LockMode, S> From<HashMap<K, V, S>> for ConcurrentMap<K, V, M, S> {
    fn from(map: HashMap<K, V, S>) -> Self {
        Self::from_map(map)
    }
}

impl<K, V, M, S> FromIterator<(K, V)> for ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K, V, M, S> Extend<(K, V)> for ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.get_mut().extend(iter);
    }
}

impl<K, V, M, S> fmt::Debug for ConcurrentMap<K, V, M, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    M: LockMode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ConcurrentMap");
        d.field("safe", &M::SAFE);
        match self.inner.try_read() {
            Some(guard) => d.field("data", &*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish()
    }
}
