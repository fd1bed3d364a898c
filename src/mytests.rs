use crate::*;
use std::{cell::Cell, ptr::NonNull};

fn keys_of<C: Compare<i32>>(m: &map::AvlMap<i32, i32, C>) -> Vec<i32> {
    m.keys().copied().collect()
}

/// Allocator that refuses to hand out more than `budget` slots in total.
struct Budget {
    left: Cell<usize>,
}

impl Budget {
    fn new(slots: usize) -> Self {
        Self {
            left: Cell::new(slots),
        }
    }
}

unsafe impl NodeAlloc for Budget {
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n > self.left.get() {
            return Err(AllocError::Exhausted(
                std::alloc::Layout::array::<T>(n).unwrap(),
            ));
        }
        self.left.set(self.left.get() - n);
        Global.allocate(n)
    }

    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        self.left.set(self.left.get() + n);
        Global.deallocate(ptr, n)
    }
}

#[test]
fn balanced_scenario_test() {
    let mut m = AvlMap::new();
    for k in [5, 3, 8, 1, 4, 7, 9] {
        m.insert(k, k * 10);
    }
    m.check();
    assert_eq!(keys_of(&m), vec![1, 3, 4, 5, 7, 8, 9]);
    // ceil(log2(8)) + 1
    assert!(m.height() <= 4);
}

#[test]
fn ascending_insert_test() {
    let mut m = AvlMap::new();
    for k in 1..=5 {
        m.insert(k, k);
        m.check();
    }
    assert!(m.height() <= 3);
    assert_eq!(keys_of(&m), vec![1, 2, 3, 4, 5]);

    let mut m = AvlMap::new();
    let n = 10000;
    for k in 0..n {
        m.insert(k, k);
    }
    m.check();
    // AVL height bound is about 1.44 log2(n).
    assert!(m.height() <= 20);
}

#[test]
fn descending_insert_test() {
    let mut m = AvlMap::new();
    for k in (0..1000).rev() {
        m.insert(k, k);
    }
    m.check();
    assert_eq!(m.len(), 1000);
    assert_eq!(m.first_key_value(), Some((&0, &0)));
    assert_eq!(m.last_key_value(), Some((&999, &999)));
}

#[test]
fn erase_root_test() {
    let mut m = AvlMap::new();
    m.insert(2, "b");
    m.insert(1, "a");
    m.insert(3, "c");
    assert_eq!(m.remove(&2), Some("b"));
    m.check();
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert!(m.find(&2) == m.end());
    assert!(m.get(&2).is_none());
}

#[test]
fn find_round_trip_test() {
    let mut m = AvlMap::new();
    for k in 0..100 {
        m.insert(k, k * 2);
    }
    for k in 0..100 {
        let c = m.find(&k);
        assert_eq!(m.get_at(&c), Ok((&k, &(k * 2))));
    }
    assert!(m.find(&100).is_end());
}

#[test]
fn erase_missing_test() {
    let mut m = AvlMap::<i32, i32>::new();
    assert_eq!(m.remove(&1), None);
    m.insert(1, 1);
    assert_eq!(m.remove(&2), None);
    assert_eq!(m.len(), 1);
    m.check();
}

#[test]
fn duplicate_policy_test() {
    let mut m = AvlMap::new();
    assert_eq!(m.insert(1, "a"), None);
    assert_eq!(m.insert(1, "b"), Some("a"));
    assert_eq!(m[&1], "b");
    assert_eq!(m.len(), 1);

    let mut m = AvlMap::new().with_policy(DuplicatePolicy::Reject);
    assert_eq!(m.policy(), DuplicatePolicy::Reject);
    assert_eq!(m.insert(1, "a"), None);
    assert_eq!(m.insert(1, "b"), Some("b"));
    assert_eq!(m[&1], "a");

    let (c, displaced) = m.insert_cursor(1, "c");
    assert_eq!(displaced, Some("c"));
    assert_eq!(m.get_at(&c), Ok((&1, &"a")));
}

#[test]
fn begin_end_test() {
    let mut m = AvlMap::<i32, i32>::new();
    assert!(m.begin() == m.end());
    assert!(m.rbegin() == m.rend());
    let mut c = m.end();
    assert_eq!(m.retreat(&mut c), Err(CursorError::End));
    assert_eq!(m.advance(&mut c), Err(CursorError::End));

    for k in [4, 2, 6] {
        m.insert(k, k);
    }
    assert!(m.begin() != m.end());
    let mut c = m.end();
    m.retreat(&mut c).unwrap();
    assert_eq!(m.get_at(&c), Ok((&6, &6)));
    assert!(c == m.rbegin());

    let mut c = m.begin();
    m.retreat(&mut c).unwrap();
    assert!(c == m.rend());
}

#[test]
fn cursor_walk_test() {
    let mut m = AvlMap::new();
    for k in (0..50).rev() {
        m.insert(k, -k);
    }
    let mut c = m.begin();
    let mut seen = Vec::new();
    while c != m.end() {
        seen.push(*m.get_at(&c).unwrap().0);
        m.advance(&mut c).unwrap();
    }
    assert_eq!(seen, (0..50).collect::<Vec<_>>());

    let mut c = m.rbegin();
    let mut seen = Vec::new();
    while c != m.rend() {
        seen.push(*m.get_at(&c).unwrap().0);
        m.retreat(&mut c).unwrap();
    }
    assert_eq!(seen, (0..50).rev().collect::<Vec<_>>());
}

#[test]
fn cursor_stable_over_other_removal_test() {
    let mut m = AvlMap::new();
    for k in 0..64 {
        m.insert(k, k * 3);
    }
    let c = m.find(&40);
    for k in (0..64).filter(|k| *k != 40) {
        m.remove(&k);
        assert_eq!(m.get_at(&c), Ok((&40, &120)));
    }
    m.check();
    assert_eq!(m.len(), 1);
}

#[test]
fn cursor_on_removed_test() {
    let mut m = AvlMap::new();
    for k in 1..=7 {
        m.insert(k, k);
    }
    let mut fwd = m.find(&4);
    let mut back = fwd.clone();
    assert_eq!(m.remove(&4), Some(4));
    assert_eq!(m.get_at(&fwd), Err(CursorError::Erased));
    assert_eq!(m.tombstones(), 1);
    m.check();

    m.advance(&mut fwd).unwrap();
    assert_eq!(m.get_at(&fwd), Ok((&5, &5)));
    m.retreat(&mut back).unwrap();
    assert_eq!(m.get_at(&back), Ok((&3, &3)));

    // Both cursors have moved on, so the tombstone goes at the next sweep.
    m.purge();
    assert_eq!(m.tombstones(), 0);
    m.check();
}

#[test]
fn tombstone_chain_test() {
    let mut m = AvlMap::new();
    for k in 1..=9 {
        m.insert(k, k);
    }
    let mut c = m.find(&3);
    m.remove(&3);
    // Remove the successor recorded in the tombstone, and its successor too.
    m.remove(&4);
    m.remove(&5);
    m.check();
    // 3 is pinned by the cursor and 5 by 3's tombstone. Removing 5 moved that anchor
    // off 4, which has been released.
    assert_eq!(m.tombstones(), 2);
    m.advance(&mut c).unwrap();
    assert_eq!(m.get_at(&c), Ok((&6, &6)));
    m.purge();
    assert_eq!(m.tombstones(), 0);
    m.check();

    let mut c = m.find(&9);
    m.remove(&9);
    m.advance(&mut c).unwrap();
    assert!(c.is_end());
    m.purge();

    let mut c = m.find(&1);
    m.remove(&1);
    m.retreat(&mut c).unwrap();
    assert!(c == m.rend());
    drop(c);
    m.purge();
    m.check();
}

#[test]
fn parked_cursor_retention_test() {
    let n = 5000;
    let mut m: AvlMap<i32, i32> = (0..n).map(|k| (k, k)).collect();
    let mut c = m.begin();
    let mut popped = 0;
    while let Some((k, _)) = m.pop_first() {
        assert_eq!(k, popped);
        popped += 1;
        // The cursor's tombstone plus the latest one it anchors.
        assert!(m.tombstones() <= 2);
    }
    assert_eq!(popped, n);
    m.check();
    m.advance(&mut c).unwrap();
    assert!(c.is_end());
    m.purge();
    assert_eq!(m.tombstones(), 0);
    assert_eq!(m.arena.in_use(), 0);

    let mut m: AvlMap<i32, i32> = (0..n).map(|k| (k, k)).collect();
    let mut back = m.rbegin();
    let mut fwd = m.find(&(n / 2));
    for k in (n / 2..n).rev() {
        assert_eq!(m.pop_last(), Some((k, k)));
        assert!(m.tombstones() <= 4);
    }
    m.check();
    m.retreat(&mut back).unwrap();
    assert_eq!(m.get_at(&back), Ok((&(n / 2 - 1), &(n / 2 - 1))));
    m.advance(&mut fwd).unwrap();
    assert!(fwd.is_end());
}

#[test]
fn remove_while_iterating_test() {
    let mut m = AvlMap::new();
    let n = 1000;
    for k in 0..n {
        m.insert(k, k);
    }
    let mut c = m.begin();
    while let Ok((k, _)) = m.get_at(&c) {
        if k % 3 != 0 {
            m.remove_at(&c).unwrap();
            assert_eq!(m.remove_at(&c), Err(CursorError::Erased));
        }
        m.advance(&mut c).unwrap();
    }
    assert!(c.is_end());
    m.purge();
    m.check();
    assert_eq!(m.tombstones(), 0);
    assert!(m.keys().all(|k| k % 3 == 0));
    assert_eq!(m.len(), (0..n).filter(|k| k % 3 == 0).count());
}

#[test]
fn stale_and_foreign_cursor_test() {
    let mut a = AvlMap::new();
    let mut b = AvlMap::new();
    a.insert(1, 1);
    b.insert(1, 1);
    let ca = a.find(&1);
    assert_eq!(b.get_at(&ca), Err(CursorError::ForeignMap));
    assert!(ca != b.find(&1));

    a.clear();
    assert_eq!(a.get_at(&ca), Err(CursorError::Stale));
    a.insert(2, 2);
    assert_eq!(a.get_at(&ca), Err(CursorError::Stale));
    let mut ca = ca;
    assert_eq!(a.advance(&mut ca), Err(CursorError::Stale));
}

#[test]
fn cursor_mut_test() {
    let mut m = AvlMap::new();
    for k in 0..10 {
        m.insert(k, 0);
    }
    let mut c = m.begin();
    while !c.is_end() {
        let (k, v) = m.get_at_mut(&c).unwrap();
        *v = *k * *k;
        m.advance(&mut c).unwrap();
    }
    assert_eq!(m[&7], 49);
}

#[test]
fn try_insert_out_of_memory_test() {
    let budget = Budget::new(8);
    let mut m = AvlMap::new_in(&budget);
    for k in 0..8 {
        assert_eq!(m.try_insert(k, k), Ok(None));
    }
    // Growing past 8 slots needs another 16.
    assert!(matches!(
        m.try_insert(100, 100),
        Err(AllocError::Exhausted(_))
    ));
    assert_eq!(m.len(), 8);
    assert!(m.get(&100).is_none());
    m.check();

    // An existing key needs no new node.
    assert_eq!(m.try_insert(3, 33), Ok(Some(3)));

    // Freed slots are reused without asking the allocator.
    m.remove(&0);
    assert_eq!(m.try_insert(100, 100), Ok(None));
    m.check();
}

#[test]
fn custom_compare_test() {
    let mut m = map::AvlMap::with_compare(|a: &i32, b: &i32| b < a);
    for k in 0..20 {
        m.insert(k, ());
    }
    m.check();
    assert_eq!(
        m.keys().copied().collect::<Vec<_>>(),
        (0..20).rev().collect::<Vec<_>>()
    );
    assert!(m.contains_key(&5));
    assert_eq!(m.remove(&5), Some(()));
    m.check();
}

#[test]
fn borrowed_key_test() {
    let mut m = AvlMap::new();
    m.insert("b".to_string(), 2);
    m.insert("a".to_string(), 1);
    assert_eq!(m.get("a"), Some(&1));
    assert_eq!(m.get_key_value("b"), Some((&"b".to_string(), &2)));
    *m.get_mut("b").unwrap() += 1;
    assert_eq!(m["b"], 3);
}

#[test]
fn iter_test() {
    let mut m: AvlMap<i32, i32> = (0..100).map(|k| (k, k)).collect();
    assert_eq!(m.iter().len(), 100);
    assert!(m.iter().rev().map(|(k, _)| *k).eq((0..100).rev()));

    let mut it = m.iter();
    assert_eq!(it.next(), Some((&0, &0)));
    assert_eq!(it.next_back(), Some((&99, &99)));
    assert_eq!(it.len(), 98);
    assert_eq!(it.count(), 98);

    for (k, v) in &mut m {
        *v += *k;
    }
    for v in m.values_mut().rev() {
        *v += 1;
    }
    assert!(m.values().copied().eq((0..100).map(|k| 2 * k + 1)));

    let mut it = m.iter_mut();
    let a = it.next().unwrap();
    let b = it.next_back().unwrap();
    *a.1 = 0;
    *b.1 = 0;
    assert_eq!(m[&0], 0);
    assert_eq!(m[&99], 0);

    let v: Vec<(i32, i32)> = m.clone().into_iter().rev().take(2).collect();
    assert_eq!(v, vec![(99, 0), (98, 197)]);
    let mut it = m.into_iter();
    assert_eq!(it.next(), Some((0, 0)));
    assert_eq!(it.len(), 99);
}

#[test]
fn retain_and_pop_test() {
    let mut m = AvlMap::from([(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd'), (5, 'e')]);
    m.retain(|k, _| k % 2 == 1);
    m.check();
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    assert_eq!(m.pop_first(), Some((1, 'a')));
    assert_eq!(m.pop_last(), Some((5, 'e')));
    assert_eq!(m.pop_last(), Some((3, 'c')));
    assert_eq!(m.pop_first(), None);
    assert!(m.is_empty());
    m.check();
}

#[test]
fn eq_clone_debug_test() {
    let mut a = AvlMap::new();
    a.extend([(2, "two"), (1, "one")]);
    let b = a.clone();
    assert_eq!(a, b);
    assert_eq!(format!("{:?}", a), r#"{1: "one", 2: "two"}"#);
    a.insert(3, "three");
    assert_ne!(a, b);
}

#[test]
fn drop_with_cursors_test() {
    let c;
    {
        let mut m = AvlMap::new();
        for k in 0..10 {
            m.insert(k.to_string(), vec![k; 3]);
        }
        c = m.find("5");
        m.remove("5");
        m.remove("6");
    }
    // The map is gone, the cursor still drops cleanly.
    assert!(!c.is_end());
}

#[test]
fn various_tests() {
    for _rep in 0..100 {
        let mut t = AvlMap::<usize, usize>::default();
        t.check();
        let n = 1000;
        for i in 0..n {
            t.insert(i, i);
        }
        for i in 0..n {
            assert_eq!(t.get(&i).unwrap(), &i);
        }
        for i in 0..n {
            if i % 2 == 0 {
                assert_eq!(t.remove(&i).unwrap(), i);
            }
        }
        t.check();
        t.retain(|k, _v| k % 5 == 0);
        t.check();
        for (k, v) in t {
            assert!(k == v && k % 10 == 5);
        }
    }
}
