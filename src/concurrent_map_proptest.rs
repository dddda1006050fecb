#![cfg(test)]

// Model-based property tests for ConcurrentMap kept inside the crate so
// they can drive both lock modes through one generic harness.

use crate::concurrent_map::ConcurrentMap;
use crate::mode::{LockMode, Safe, Unsync};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hasher;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Remove(usize),
    Search(usize),
    GetOrSet(usize, i32),
    SetIfAbsent(usize, i32),
    SetMany(Vec<(usize, i32)>),
    RemoveMany(Vec<usize>),
    Pop,
    PopN(usize),
    Merge(Vec<(usize, i32)>),
    FilterZero,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=8).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let val = -3i32..=3;
        let op = prop_oneof![
            (idx.clone(), val.clone()).prop_map(|(i, v)| Op::Set(i, v)),
            idx.clone().prop_map(Op::Remove),
            idx.clone().prop_map(Op::Search),
            (idx.clone(), val.clone()).prop_map(|(i, v)| Op::GetOrSet(i, v)),
            (idx.clone(), val.clone()).prop_map(|(i, v)| Op::SetIfAbsent(i, v)),
            proptest::collection::vec((idx.clone(), val.clone()), 0..4).prop_map(Op::SetMany),
            proptest::collection::vec(idx.clone(), 0..4).prop_map(Op::RemoveMany),
            Just(Op::Pop),
            (0usize..4).prop_map(Op::PopN),
            proptest::collection::vec((idx.clone(), val.clone()), 0..4).prop_map(Op::Merge),
            Just(Op::FilterZero),
            Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - single-key ops return what the model returns and mutate identically;
// - compound ops write iff the model key is absent;
// - pop removes one present entry, or none from an empty map;
// - pop_n removes exactly min(n, len) entries, all of which were present;
// - merge overwrites conflicting keys with the merged-in values;
// - keys/len/is_empty parity after every op.
fn run_model<M, S>(
    sut: ConcurrentMap<String, i32, M, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    M: LockMode,
    S: BuildHasher + Clone,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    let key = |i: usize| pool[i].clone();

    for op in ops {
        match op {
            Op::Set(i, v) => {
                sut.set(key(i), v);
                model.insert(key(i), v);
            }
            Op::Remove(i) => {
                prop_assert_eq!(sut.remove(&key(i)), model.remove(&key(i)));
            }
            Op::Search(i) => {
                prop_assert_eq!(sut.search(&key(i)), model.get(&key(i)).copied());
                prop_assert_eq!(sut.get(&key(i)), model.get(&key(i)).copied().unwrap_or(0));
            }
            Op::GetOrSet(i, v) => {
                let expected = *model.entry(key(i)).or_insert(v);
                prop_assert_eq!(sut.get_or_set(key(i), v), expected);
            }
            Op::SetIfAbsent(i, v) => {
                let absent = !model.contains_key(&key(i));
                if absent {
                    model.insert(key(i), v);
                }
                prop_assert_eq!(sut.set_if_absent(key(i), v), absent);
            }
            Op::SetMany(entries) => {
                let entries: Vec<(String, i32)> =
                    entries.into_iter().map(|(i, v)| (key(i), v)).collect();
                model.extend(entries.iter().cloned());
                sut.set_many(entries);
            }
            Op::RemoveMany(idxs) => {
                let keys: BTreeSet<String> = idxs.into_iter().map(key).collect();
                let expected = keys.iter().filter(|k| model.remove(*k).is_some()).count();
                prop_assert_eq!(sut.remove_many(keys.iter()), expected);
            }
            Op::Pop => match sut.pop() {
                Some((k, v)) => {
                    prop_assert_eq!(model.remove(&k), Some(v));
                }
                None => {
                    prop_assert!(model.is_empty());
                }
            },
            Op::PopN(n) => {
                let before = model.len();
                let popped = sut.pop_n(n);
                prop_assert_eq!(popped.len(), n.min(before));
                for (k, v) in popped {
                    prop_assert_eq!(model.remove(&k), Some(v));
                }
            }
            Op::Merge(entries) => {
                let entries: Vec<(String, i32)> =
                    entries.into_iter().map(|(i, v)| (key(i), v)).collect();
                let hasher = sut.read_locked_access(|data| data.hasher().clone());
                let other: ConcurrentMap<String, i32, M, S> = ConcurrentMap::with_hasher(hasher);
                other.set_many(entries.iter().cloned());
                sut.merge(&other);
                model.extend(entries);
            }
            Op::FilterZero => {
                let before = model.len();
                model.retain(|_, v| *v != 0);
                prop_assert_eq!(sut.filter_empty(), before - model.len());
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        let s_keys: BTreeSet<String> = sut.keys().into_iter().collect();
        let m_keys: BTreeSet<String> = model.keys().cloned().collect();
        prop_assert_eq!(s_keys, m_keys);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }

    let s_all: BTreeMap<String, i32> = sut.snapshot().into_iter().collect();
    let m_all: BTreeMap<String, i32> = model.into_iter().collect();
    prop_assert_eq!(s_all, m_all);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_safe((pool, ops) in arb_scenario()) {
        run_model(ConcurrentMap::<String, i32, Safe>::new(), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_unsync((pool, ops) in arb_scenario()) {
        run_model(ConcurrentMap::<String, i32, Unsync>::new(), &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same state-machine invariants under worst-case collisions.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: ConcurrentMap<String, i32, Safe, ConstBuildHasher> =
            ConcurrentMap::with_hasher(ConstBuildHasher);
        run_model(sut, &pool, ops)?;
    }
}
