#![cfg(test)]

// Multi-threaded behavior of Safe maps.
//
// Each test documents the race it provokes and the invariant asserted:
// - No lost or duplicated entries under interleaved set/remove.
// - get_or_set: every racing caller observes the single stored value.
// - get_or_set_with_locked: the factory runs exactly once per absent key.
// - set_if_absent: exactly one racing caller reports a write.
// - merge: opposite-direction merges between two maps do not deadlock.
use rw_hashmap::SafeMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 8;

// Test: interleaved set/remove from many threads.
// Assumes: thread t owns keys congruent to t and removes every third one.
// Verifies: final len equals the keys whose last op was a set.
#[test]
fn interleaved_set_remove_loses_nothing() {
    let m: SafeMap<usize, usize> = SafeMap::new();
    let per_thread = 500;
    thread::scope(|s| {
        for t in 0..THREADS {
            let m = &m;
            s.spawn(move || {
                for i in 0..per_thread {
                    let k = i * THREADS + t;
                    m.set(k, t);
                    if k % 3 == 0 {
                        assert_eq!(m.remove(&k), Some(t));
                    }
                }
            });
        }
    });
    let expected = (0..per_thread * THREADS).filter(|k| k % 3 != 0).count();
    assert_eq!(m.len(), expected);
    for k in m.keys() {
        assert_eq!(m.get(&k), k % THREADS);
    }
}

// Test: contended upserts of a small shared key space.
// Verifies: len equals the number of distinct keys; nothing is duplicated.
#[test]
fn contended_upserts_converge_on_distinct_keys() {
    let m: SafeMap<u32, usize> = SafeMap::new();
    thread::scope(|s| {
        for t in 0..THREADS {
            let m = &m;
            s.spawn(move || {
                for i in 0..1_000u32 {
                    m.set(i % 64, t);
                }
            });
        }
    });
    assert_eq!(m.len(), 64);
    let distinct: HashSet<u32> = m.keys().into_iter().collect();
    assert_eq!(distinct.len(), 64);
}

// Test: two threads race get_or_set on the same absent key.
// Verifies: both observe the same value and it is the stored one.
#[test]
fn racing_get_or_set_agree() {
    for round in 0..200 {
        let m: SafeMap<&str, usize> = SafeMap::new();
        let barrier = Barrier::new(2);
        let (a, b) = thread::scope(|s| {
            let ha = s.spawn(|| {
                barrier.wait();
                m.get_or_set("k", 1)
            });
            let hb = s.spawn(|| {
                barrier.wait();
                m.get_or_set("k", 2)
            });
            (ha.join().unwrap(), hb.join().unwrap())
        });
        assert_eq!(a, b, "round {round}: callers disagree");
        assert_eq!(m.get(&"k"), a);
        assert!(a == 1 || a == 2);
    }
}

// Test: N threads race get_or_set_with_locked on one absent key.
// Verifies: the factory runs exactly once; every caller sees its result.
#[test]
fn locked_factory_runs_exactly_once() {
    let m: SafeMap<String, usize> = SafeMap::new();
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);
    let results: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let (m, calls, barrier) = (&m, &calls, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    m.get_or_set_with_locked("shared".to_string(), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::yield_now();
                        t
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|&r| r == results[0]));
    assert_eq!(m.get("shared"), results[0]);
}

// Test: N threads race set_if_absent_with_locked on one key.
// Verifies: exactly one caller reports a write.
#[test]
fn set_if_absent_has_single_winner() {
    let m: SafeMap<u8, usize> = SafeMap::new();
    let barrier = Barrier::new(THREADS);
    let wins: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let (m, barrier) = (&m, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    if t % 2 == 0 {
                        m.set_if_absent(0, t)
                    } else {
                        m.set_if_absent_with_locked(0, || t)
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum()
    });
    assert_eq!(wins, 1);
    assert_eq!(m.len(), 1);
}

// Test: opposite-direction merges running concurrently.
// Assumes: locks are ordered by address inside merge.
// Verifies: every merge completes and both maps end up with all keys.
#[test]
fn bidirectional_merges_do_not_deadlock() {
    let a: SafeMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
    let b: SafeMap<u32, u32> = (50..100).map(|i| (i, i)).collect();
    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..500 {
                a.merge(&b);
            }
        });
        s.spawn(|| {
            for _ in 0..500 {
                b.merge(&a);
            }
        });
    });
    a.merge(&b);
    b.merge(&a);
    assert_eq!(a.len(), 100);
    assert_eq!(b.len(), 100);
}

// Test: concurrent pop_n batches against a pre-filled map.
// Verifies: every entry is popped by exactly one thread.
#[test]
fn concurrent_pops_partition_entries() {
    let m: SafeMap<u32, u32> = (0..4_000).map(|i| (i, i)).collect();
    let popped: Vec<u32> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let m = &m;
                s.spawn(move || {
                    let mut mine = Vec::new();
                    loop {
                        let batch = m.pop_n(7);
                        if batch.is_empty() {
                            break mine;
                        }
                        mine.extend(batch.into_keys());
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });
    assert!(m.is_empty());
    let distinct: HashSet<u32> = popped.iter().copied().collect();
    assert_eq!(popped.len(), 4_000);
    assert_eq!(distinct.len(), 4_000);
}
