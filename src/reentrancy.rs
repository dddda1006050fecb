//! Borrow-tracking raw lock for unsynchronized maps.
//!
//! `RawUnsync` implements `lock_api::RawRwLock` without atomics. It is
//! `!Sync`, so a map built on it can only be reached from one thread at a
//! time and never pays for synchronization. It still counts borrows: a
//! conflicting acquisition (a callback re-entering the map while the map is
//! exclusively borrowed) panics instead of handing out aliasing references.

use core::cell::Cell;
use lock_api::{GuardNoSend, RawRwLock};

const UNUSED: isize = 0;
const WRITING: isize = -1;

/// Raw lock of `Unsync` maps. Embed it through `lock_api::RwLock`.
#[derive(Debug)]
pub struct RawUnsync {
    // > 0: shared holders, -1: exclusive holder, 0: free.
    state: Cell<isize>,
}

impl RawUnsync {
    /// Create a free lock. Const so it can back `RawRwLock::INIT`.
    pub const fn new() -> Self {
        Self {
            state: Cell::new(UNUSED),
        }
    }
}

impl Default for RawUnsync {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl RawRwLock for RawUnsync {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawUnsync::new();

    type GuardMarker = GuardNoSend;

    #[inline]
    fn lock_shared(&self) {
        assert!(
            self.try_lock_shared(),
            "reentrancy detected: map read while exclusively borrowed"
        );
    }

    #[inline]
    fn try_lock_shared(&self) -> bool {
        let s = self.state.get();
        if s < UNUSED || s == isize::MAX {
            return false;
        }
        self.state.set(s + 1);
        true
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        let s = self.state.get();
        debug_assert!(s > UNUSED);
        self.state.set(s - 1);
    }

    #[inline]
    fn lock_exclusive(&self) {
        assert!(
            self.try_lock_exclusive(),
            "reentrancy detected: map written while already borrowed"
        );
    }

    #[inline]
    fn try_lock_exclusive(&self) -> bool {
        if self.state.get() != UNUSED {
            return false;
        }
        self.state.set(WRITING);
        true
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        debug_assert_eq!(self.state.get(), WRITING);
        self.state.set(UNUSED);
    }
}
