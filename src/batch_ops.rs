//! Batch and whole-map operations: pop, filter, flip, merge, locked access.
//!
//! Each operation takes the lock once and completes its whole batch under
//! it. None of them can observe a half-applied batch of another.

use crate::concurrent_map::ConcurrentMap;
use crate::convert::{Convert, IsEmpty};
use crate::mode::LockMode;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use tracing::{debug, trace};

impl<K, V, M, S> ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher,
{
    /// Remove and return one arbitrary entry, `None` if the map is empty.
    pub fn pop(&self) -> Option<(K, V)> {
        let mut guard = self.write();
        let mut taken = false;
        let entry = guard
            .extract_if(|_, _| !core::mem::replace(&mut taken, true))
            .next();
        entry
    }

    /// Remove and return up to `count` arbitrary entries in one batch.
    /// `count == 0` or an empty map yield an empty result.
    pub fn pop_n(&self, count: usize) -> HashMap<K, V, S>
    where
        S: Clone,
    {
        let mut guard = self.write();
        let hasher = guard.hasher().clone();
        if count == 0 {
            return HashMap::with_hasher(hasher);
        }
        if count >= guard.len() {
            let taken = core::mem::replace(&mut *guard, HashMap::with_hasher(hasher));
            drop(guard);
            trace!(count = taken.len(), "popped entries");
            return taken;
        }
        let mut remaining = count;
        let mut taken = HashMap::with_capacity_and_hasher(count, hasher);
        taken.extend(guard.extract_if(|_, _| {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            true
        }));
        drop(guard);
        trace!(count = taken.len(), "popped entries");
        taken
    }

    /// Remove and return every entry.
    pub fn pop_all(&self) -> HashMap<K, V, S>
    where
        S: Clone,
    {
        self.pop_n(usize::MAX)
    }

    /// Remove every key yielded by `keys` under one write lock. Returns how
    /// many entries were removed.
    pub fn remove_many<'a, Q, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a Q>,
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'a,
    {
        let keys: Vec<&Q> = keys.into_iter().collect();
        let mut guard = self.write();
        let removed = keys
            .into_iter()
            .filter(|k| guard.remove(*k).is_some())
            .count();
        drop(guard);
        trace!(removed, "removed entries");
        removed
    }

    /// Remove every entry whose value is empty. Returns the number removed.
    pub fn filter_empty(&self) -> usize
    where
        V: IsEmpty,
    {
        self.filter_empty_by(|v| v.is_empty_value())
    }

    /// Remove every entry for which `is_empty` holds, in one write-locked
    /// pass. Returns the number removed.
    pub fn filter_empty_by<F>(&self, mut is_empty: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let mut guard = self.write();
        let before = guard.len();
        guard.retain(|_, v| !is_empty(&*v));
        let removed = before - guard.len();
        drop(guard);
        if removed > 0 {
            debug!(removed, "filtered empty values");
        }
        removed
    }

    /// Swap keys and values using the `Convert` impls of both types.
    pub fn flip(&self)
    where
        V: Convert<K>,
        K: Convert<V>,
        S: Clone,
    {
        self.flip_with(<V as Convert<K>>::convert, <K as Convert<V>>::convert)
    }

    /// Rebuild the map with `key_of(value)` as key and `value_of(key)` as
    /// value, under one write lock.
    ///
    /// Values that convert to the same key collapse into one entry; which
    /// one survives is unspecified (last write wins in iteration order).
    pub fn flip_with<FK, FV>(&self, mut key_of: FK, mut value_of: FV)
    where
        FK: FnMut(&V) -> K,
        FV: FnMut(&K) -> V,
        S: Clone,
    {
        let mut guard = self.write();
        let before = guard.len();
        let mut flipped = HashMap::with_capacity_and_hasher(before, guard.hasher().clone());
        for (k, v) in guard.iter() {
            flipped.insert(key_of(v), value_of(k));
        }
        let old = core::mem::replace(&mut *guard, flipped);
        let collapsed = before - guard.len();
        drop(guard);
        drop(old);
        if collapsed > 0 {
            debug!(collapsed, "flip collapsed colliding keys");
        }
    }

    /// Copy every entry of `other` into `self`; `other` wins on collision.
    ///
    /// Merging a map into itself is a no-op. For distinct maps the two
    /// locks are taken in address order, so concurrent `a.merge(&b)` and
    /// `b.merge(&a)` cannot deadlock.
    pub fn merge(&self, other: &Self)
    where
        K: Clone,
        V: Clone,
    {
        if core::ptr::eq(self, other) {
            return;
        }
        let (mut dst, src) = if (self as *const Self) < (other as *const Self) {
            let dst = self.write();
            (dst, other.read())
        } else {
            let src = other.read();
            (self.write(), src)
        };
        dst.extend(src.iter().map(|(k, v)| (k.clone(), v.clone())));
        trace!(merged = src.len(), "merged map");
    }
}

impl<K, V, M: LockMode, S> ConcurrentMap<K, V, M, S> {
    /// Run `f` with the backing map under the write lock.
    ///
    /// `f` must not call back into this map: that deadlocks for `Safe`
    /// maps and panics for `Unsync` maps.
    pub fn locked_access<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<K, V, S>) -> R,
    {
        f(&mut *self.write())
    }

    /// Run `f` with the backing map under the read lock. Same re-entrancy
    /// rules as `locked_access` for writes.
    pub fn read_locked_access<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&HashMap<K, V, S>) -> R,
    {
        f(&*self.read())
    }

    /// Visit entries under the read lock until `f` returns false.
    ///
    /// `f` must not write to this map: that deadlocks for `Safe` maps and
    /// panics for `Unsync` maps.
    pub fn for_each_while<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (k, v) in self.read().iter() {
            if !f(k, v) {
                break;
            }
        }
    }
}
