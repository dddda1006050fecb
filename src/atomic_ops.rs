//! Compound check-then-write operations.
//!
//! Every operation uses double-checked locking: an optimistic check under
//! the read lock, then the write lock and a re-check (the hashbrown entry
//! lookup) before writing. Two racing callers can never both believe they
//! inserted the key.
//!
//! Factory timing
//! - `*_with`: the factory runs with no lock held. It may run in several
//!   racing callers; only one result is stored, the others are dropped.
//! - `*_with_locked`: the factory runs under the write lock, so it runs at
//!   most once per absent key. All other access waits while it runs.
//!   Calling back into the same map from a locked factory deadlocks for
//!   `Safe` maps and panics for `Unsync` maps.

use crate::concurrent_map::ConcurrentMap;
use crate::mode::LockMode;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::Entry;

impl<K, V, M, S> ConcurrentMap<K, V, M, S>
where
    K: Eq + Hash,
    M: LockMode,
    S: BuildHasher,
{
    /// Return the value for `key`, storing `value` first if the key is
    /// absent.
    pub fn get_or_set(&self, key: K, value: V) -> V
    where
        V: Clone,
    {
        if let Some(v) = self.search(&key) {
            return v;
        }
        self.write().entry(key).or_insert(value).clone()
    }

    /// Like `get_or_set`, producing the value with `factory` outside the
    /// lock. If another caller stores the key first, the produced value is
    /// dropped and the stored one returned.
    pub fn get_or_set_with<F>(&self, key: K, factory: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(v) = self.search(&key) {
            return v;
        }
        let value = factory();
        self.write().entry(key).or_insert(value).clone()
    }

    /// Like `get_or_set_with`, running `factory` under the write lock so it
    /// runs at most once per absent key. `factory` must not touch this map.
    pub fn get_or_set_with_locked<F>(&self, key: K, factory: F) -> V
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        if let Some(v) = self.search(&key) {
            return v;
        }
        self.write().entry(key).or_insert_with(factory).clone()
    }

    /// Store `value` iff `key` is absent. Returns whether this call wrote.
    pub fn set_if_absent(&self, key: K, value: V) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.insert_absent(key, || value)
    }

    /// Like `set_if_absent`, producing the value with `factory` outside the
    /// lock.
    pub fn set_if_absent_with<F>(&self, key: K, factory: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        let value = factory();
        self.insert_absent(key, || value)
    }

    /// Like `set_if_absent_with`, running `factory` under the write lock.
    /// `factory` must not touch this map.
    pub fn set_if_absent_with_locked<F>(&self, key: K, factory: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.contains(&key) {
            return false;
        }
        self.insert_absent(key, factory)
    }

    // Re-check under the write lock; `make` only runs for a vacant key.
    fn insert_absent<F>(&self, key: K, make: F) -> bool
    where
        F: FnOnce() -> V,
    {
        match self.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(make());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{SafeMap, UnsyncMap};
    use std::cell::Cell;

    #[test]
    fn get_or_set_keeps_first_value() {
        let m: UnsyncMap<String, i32> = UnsyncMap::new();
        assert_eq!(m.get_or_set("k".into(), 1), 1);
        assert_eq!(m.get_or_set("k".into(), 2), 1);
        assert_eq!(m.get("k"), 1);
    }

    /// Invariant: the factory does not run when the key is present.
    #[test]
    fn factories_are_lazy_on_hit() {
        let m: SafeMap<&str, i32> = SafeMap::new();
        m.set("k", 5);
        let calls = Cell::new(0);
        let bump = || {
            calls.set(calls.get() + 1);
            9
        };
        assert_eq!(m.get_or_set_with("k", bump), 5);
        assert_eq!(m.get_or_set_with_locked("k", bump), 5);
        assert!(!m.set_if_absent_with("k", bump));
        assert!(!m.set_if_absent_with_locked("k", bump));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn factories_run_once_on_miss() {
        let m: UnsyncMap<u32, String> = UnsyncMap::new();
        let calls = Cell::new(0);
        let v = m.get_or_set_with_locked(1, || {
            calls.set(calls.get() + 1);
            "one".to_string()
        });
        assert_eq!(v, "one");
        assert_eq!(calls.get(), 1);
        assert!(m.set_if_absent_with(2, || "two".to_string()));
        assert_eq!(m.get(&2), "two");
    }

    /// Invariant: when the key is stored while an unlocked factory runs,
    /// the factory's value is dropped and the stored one wins.
    #[test]
    fn unlocked_factory_loses_to_concurrent_store() {
        let m: UnsyncMap<&str, i32> = UnsyncMap::new();
        let v = m.get_or_set_with("k", || {
            m.set("k", 7);
            1
        });
        assert_eq!(v, 7);
        assert_eq!(m.get("k"), 7);

        let wrote = m.set_if_absent_with("j", || {
            m.set("j", 3);
            4
        });
        assert!(!wrote);
        assert_eq!(m.get("j"), 3);
        assert_eq!(m.len(), 2);
    }

    /// Invariant: `set_if_absent` reports whether it wrote and never
    /// overwrites.
    #[test]
    fn set_if_absent_reports_write() {
        let m: SafeMap<u8, u8> = SafeMap::new();
        assert!(m.set_if_absent(1, 10));
        assert!(!m.set_if_absent(1, 20));
        assert!(m.set_if_absent_with_locked(2, || 30));
        assert_eq!(m.get(&1), 10);
        assert_eq!(m.get(&2), 30);
    }

    /// Invariant: an unlocked factory may use the map itself.
    #[test]
    fn unlocked_factory_may_reenter() {
        let m: UnsyncMap<&str, usize> = UnsyncMap::new();
        m.set("a", 1);
        let v = m.get_or_set_with("len", || m.len() + 100);
        assert_eq!(v, 101);
    }

    /// Invariant: a locked factory touching an unsync map panics rather
    /// than aliasing the borrowed storage.
    #[test]
    fn locked_factory_reentry_panics_for_unsync() {
        let m: UnsyncMap<&str, usize> = UnsyncMap::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            m.get_or_set_with_locked("len", || m.len());
        }));
        assert!(res.is_err(), "expected re-entry to panic");
        // The guard was released during unwinding.
        assert!(m.is_empty());
    }
}
