//! rw-hashmap: a hash map behind an optional reader-writer lock, with
//! atomic compound operations (get-or-set, set-if-absent, batch pop).
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one container type that is safe to share across threads when
//!   asked to be, and pays nothing for locking when it is not.
//! - Layers:
//!   - `LockMode`: strategy selecting a `lock_api` raw lock. `Safe` uses
//!     `parking_lot::RawRwLock`; `Unsync` uses `RawUnsync`, a non-atomic
//!     borrow counter.
//!   - `ConcurrentMap<K, V, M, S>`: a `hashbrown::HashMap` inside
//!     `lock_api::RwLock<M::Raw, _>`. Every operation is one lock
//!     acquisition.
//!   - Codec: serde impls plus a `Codec` contract (`JsonCodec` default).
//!
//! Constraints
//! - The mode is part of the type: chosen at construction, never switched,
//!   queryable with `is_safe()`.
//! - `Unsync` maps are `Send` but `!Sync`: the caller's obligation to
//!   synchronize is checked by the compiler instead of documented.
//! - Check-then-write operations hold one write lock across the check and
//!   the write (double-checked locking after an optimistic read).
//! - No ordering guarantees: keys, values, pops and encodings follow hash
//!   order.
//!
//! Reentrancy policy
//! - Closures passed to `*_with_locked`, `locked_access` and
//!   `read_locked_access` run under the lock and must not call back into
//!   the same map for writing. For `Safe` maps that is a deadlock; `Unsync`
//!   maps detect it and panic. It is a programmer error, never a returned
//!   error.
//! - Closures passed to `*_with` run with no lock held.
//!
//! Notes and non-goals
//! - Persistence is a single encode/decode round trip.
//! - `merge` is the only cross-container operation; it takes both locks in
//!   address order and is not transactional beyond that.
//! - No sharding: one lock per container.

mod atomic_ops;
mod batch_ops;
pub mod codec;
mod concurrent_map;
mod concurrent_map_proptest;
pub mod convert;
mod error;
pub mod mode;
mod reentrancy;

// Public surface
pub use codec::{Codec, JsonCodec};
pub use concurrent_map::{ConcurrentMap, SafeMap, UnsyncMap};
pub use convert::{Convert, IsEmpty};
pub use error::{Error, Result};
pub use hashbrown::HashMap;
pub use mode::{LockMode, Safe, Unsync};
pub use reentrancy::RawUnsync;
