use super::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
    Get(u16),
    /// Park a cursor on the key, if present.
    Park(u16),
    /// Move every parked cursor one step forward.
    Advance,
    Purge,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A small key range so removals and duplicates are common.
    let key = 0u16..256;
    let op = prop_oneof![
        40 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        15 => key.clone().prop_map(Op::Get),
        8 => key.clone().prop_map(Op::Park),
        5 => Just(Op::Advance),
        2 => Just(Op::Purge),
    ];
    prop::collection::vec(op, 0..=1000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: AvlMap<u16, u32> = AvlMap::new();
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();
        let mut parked: Vec<Cursor> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    prop_assert_eq!(t.insert(k, v), m.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(t.remove(&k), m.remove(&k));
                }
                Op::Get(k) => {
                    prop_assert_eq!(t.get(&k), m.get(&k));
                }
                Op::Park(k) => {
                    let c = t.find(&k);
                    prop_assert_eq!(c.is_end(), !m.contains_key(&k));
                    if !c.is_end() {
                        parked.push(c);
                    }
                }
                Op::Advance => {
                    for c in parked.iter_mut() {
                        // A cursor on a live element lands on its successor.
                        let expect = match t.get_at(c) {
                            Ok((k, _)) => m.range(k + 1..).next().map(|(k, _)| *k),
                            Err(_) => None,
                        };
                        if t.advance(c).is_ok() {
                            if let Some(e) = expect {
                                prop_assert_eq!(t.get_at(c).map(|(k, _)| *k), Ok(e));
                            }
                            if let Ok((k, v)) = t.get_at(c) {
                                prop_assert_eq!(m.get(k), Some(v));
                            }
                        }
                    }
                    parked.retain(|c| !c.is_end());
                }
                Op::Purge => {
                    t.purge();
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        t.check();
        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);

        drop(parked);
        t.purge();
        prop_assert_eq!(t.tombstones(), 0);
        t.check();
    }

    #[test]
    fn prop_cursor_survives_other_removals(
        keys in prop::collection::btree_set(0u32..10_000, 1..300),
        pick in any::<prop::sample::Index>(),
        drop_mask in prop::collection::vec(any::<bool>(), 300),
    ) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let target = keys[pick.index(keys.len())];
        let mut t: AvlMap<u32, u32> = keys.iter().map(|&k| (k, k ^ 0x5555)).collect();
        let c = t.find(&target);

        for (i, k) in keys.iter().enumerate() {
            if *k != target && drop_mask[i] {
                prop_assert_eq!(t.remove(k), Some(k ^ 0x5555));
                prop_assert_eq!(t.get_at(&c), Ok((&target, &(target ^ 0x5555))));
            }
        }
        t.check();
    }

    #[test]
    fn prop_removed_cursor_moves_to_neighbours(
        keys in prop::collection::btree_set(0u32..1_000, 2..200),
        pick in any::<prop::sample::Index>(),
        also in prop::collection::vec(any::<bool>(), 200),
    ) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let at = pick.index(keys.len());
        let mut t: AvlMap<u32, ()> = keys.iter().map(|&k| (k, ())).collect();
        let mut fwd = t.find(&keys[at]);
        let mut back = fwd.clone();

        t.remove(&keys[at]);
        // Remove a run of neighbours on each side, after the tombstone has recorded them.
        let mut gone = vec![false; keys.len()];
        gone[at] = true;
        for i in (at + 1..keys.len()).take_while(|&i| also[i]) {
            t.remove(&keys[i]);
            gone[i] = true;
        }
        for i in (0..at).rev().take_while(|&i| also[i]) {
            t.remove(&keys[i]);
            gone[i] = true;
        }
        t.check();

        let next = (at + 1..keys.len()).find(|&i| !gone[i]).map(|i| keys[i]);
        let prev = (0..at).rev().find(|&i| !gone[i]).map(|i| keys[i]);

        t.advance(&mut fwd).unwrap();
        match next {
            Some(k) => prop_assert_eq!(t.get_at(&fwd).map(|(k, _)| *k), Ok(k)),
            None => prop_assert!(fwd.is_end()),
        }
        t.retreat(&mut back).unwrap();
        match prev {
            Some(k) => prop_assert_eq!(t.get_at(&back).map(|(k, _)| *k), Ok(k)),
            None => prop_assert!(back == t.rend()),
        }
    }
}

#[test]
fn exhaustive_remove_order_small_set() {
    fn permutations(items: &[u8]) -> Vec<Vec<u8>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let first = rest.remove(i);
            for mut p in permutations(&rest) {
                p.insert(0, first);
                out.push(p);
            }
        }
        out
    }

    let keys: Vec<u8> = (1..=6).collect();
    let base: AvlMap<u8, u8> = keys.iter().map(|&k| (k, k)).collect();

    for perm in permutations(&keys) {
        let mut t = base.clone();
        // Park a cursor on every key so each removal leaves a tombstone.
        let cursors: Vec<Cursor> = keys.iter().map(|k| t.find(k)).collect();
        for k in &perm {
            assert_eq!(t.remove(k), Some(*k));
            t.check();
        }
        assert!(t.is_empty());
        assert_eq!(t.tombstones(), keys.len());
        for c in &cursors {
            assert_eq!(t.get_at(c), Err(CursorError::Erased));
        }
        drop(cursors);
        t.purge();
        assert_eq!(t.tombstones(), 0);
        t.check();
    }
}
