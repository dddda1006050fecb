//! Lock modes: the strategy that decides whether a map synchronizes.
//!
//! A mode is fixed by the map's type, so it is chosen once at construction
//! and can never be switched. Every map operation goes through
//! `lock_api::RwLock<M::Raw, _>`; no operation branches on the mode.

use crate::reentrancy::RawUnsync;
use lock_api::RawRwLock;

/// Selects the raw lock behind a `ConcurrentMap`.
///
/// Custom modes may plug in any `lock_api::RawRwLock`.
pub trait LockMode {
    type Raw: RawRwLock;

    /// Whether maps of this mode may be shared across threads.
    const SAFE: bool;
}

/// Real reader-writer locking (`parking_lot`). Maps are `Sync`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Safe;

/// No synchronization. Maps are `Send` but not `Sync`; re-entrant writes
/// panic instead of aliasing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Unsync;

impl LockMode for Safe {
    type Raw = parking_lot::RawRwLock;
    const SAFE: bool = true;
}

impl LockMode for Unsync {
    type Raw = RawUnsync;
    const SAFE: bool = false;
}
