/// Ordered map backed by an AVL tree whose nodes live in an arena.
///
/// General guide to implementation:
///
/// Nodes are stored in an arena of slots and refer to each other by index. Every node has a
/// parent link, so in-order successor and predecessor can be found without a stack.
///
/// Removal is lazy. The node is unlinked from the tree straight away (so lookups never see it),
/// but if a [`Cursor`] is parked on it, the node stays in the arena as a tombstone that remembers
/// its neighbours. Tombstones are swept when they are no longer pinned, at the start of each
/// mutating operation or on [`AvlMap::purge`].
///
/// Key-value pairs never move between nodes. Removing a node with two children relinks its
/// successor node into its place rather than copying the successor's pair.
pub struct AvlMap<K, V, C = OrdLess, A: NodeAlloc = Global> {
    pub(crate) arena: Arena<K, V, A>,
    root: Option<Ix>,
    len: usize,
    cmp: C,
    policy: DuplicatePolicy,
    /// Tombstones still pinned by a cursor (or by another tombstone).
    graveyard: Vec<Ix>,
}

/// What [`AvlMap::insert`] does when the key is already present.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the value, returning the old one.
    #[default]
    Overwrite,
    /// Keep the existing value, returning the new one.
    Reject,
}

impl<K, V, C: Default, A: NodeAlloc + Default> Default for AvlMap<K, V, C, A> {
    fn default() -> Self {
        Self::with_compare_in(C::default(), A::default())
    }
}

impl<K, V> AvlMap<K, V> {
    /// Returns a new, empty map ordered by [`Ord`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_compare_in(OrdLess, Global)
    }
}

impl<K, V, A: NodeAlloc> AvlMap<K, V, OrdLess, A> {
    /// Returns a new, empty map ordered by [`Ord`] that gets node storage from `alloc`.
    #[must_use]
    pub fn new_in(alloc: A) -> Self {
        Self::with_compare_in(OrdLess, alloc)
    }
}

impl<K, V, C> AvlMap<K, V, C> {
    /// Returns a new, empty map ordered by `cmp`.
    #[must_use]
    pub fn with_compare(cmp: C) -> Self {
        Self::with_compare_in(cmp, Global)
    }
}

impl<K, V, C, A: NodeAlloc> AvlMap<K, V, C, A> {
    /// Returns a new, empty map ordered by `cmp` that gets node storage from `alloc`.
    #[must_use]
    pub fn with_compare_in(cmp: C, alloc: A) -> Self {
        Self {
            arena: Arena::new(alloc),
            root: None,
            len: 0,
            cmp,
            policy: DuplicatePolicy::default(),
            graveyard: Vec::new(),
        }
    }

    /// Set what [`insert`](Self::insert) does with a key that is already present.
    #[must_use]
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the duplicate key policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Get the allocator.
    pub fn allocator(&self) -> &A {
        self.arena.allocator()
    }

    /// Get number of key-value pairs in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree, 0 when empty.
    #[must_use]
    pub fn height(&self) -> usize {
        self.arena.height(self.root) as usize
    }

    /// Number of removed nodes still held because a cursor refers to them.
    #[must_use]
    pub fn tombstones(&self) -> usize {
        self.graveyard.len()
    }

    /// Release tombstones that are no longer pinned.
    pub fn purge(&mut self) {
        self.sweep();
    }

    /// Clear the map. Outstanding cursors become stale.
    pub fn clear(&mut self) {
        log::debug!(
            "clearing map of {} entries and {} tombstones",
            self.len,
            self.graveyard.len()
        );
        self.arena.release_all();
        self.graveyard.clear();
        self.root = None;
        self.len = 0;
    }

    /// Insert key-value pair into map.
    ///
    /// If the key is already present, with [`DuplicatePolicy::Overwrite`] the value is replaced
    /// and the old value returned, with [`DuplicatePolicy::Reject`] the map is unchanged and
    /// `value` is returned.
    ///
    /// Aborts (via [`std::alloc::handle_alloc_error`]) if node storage cannot be allocated.
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        C: Compare<K>,
    {
        match self.insert_ix(key, value) {
            Ok((_, displaced)) => displaced,
            Err(e) => e.fail(),
        }
    }

    /// Like [`insert`](Self::insert) but returns an error if node storage cannot be allocated,
    /// in which case the map is unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, AllocError>
    where
        C: Compare<K>,
    {
        self.insert_ix(key, value).map(|(_, displaced)| displaced)
    }

    /// Like [`insert`](Self::insert), also returning a cursor to the element for the key.
    pub fn insert_cursor(&mut self, key: K, value: V) -> (Cursor, Option<V>)
    where
        C: Compare<K>,
    {
        match self.insert_ix(key, value) {
            Ok((ix, displaced)) => (self.cursor_at(Some(ix)), displaced),
            Err(e) => e.fail(),
        }
    }

    fn insert_ix(&mut self, key: K, value: V) -> Result<(Ix, Option<V>), AllocError>
    where
        C: Compare<K>,
    {
        self.sweep();
        let parent = match self.search(&key) {
            Search::Found(ix) => {
                let displaced = match self.policy {
                    DuplicatePolicy::Overwrite => {
                        mem::replace(self.arena.node_mut(ix).value_mut(), value)
                    }
                    DuplicatePolicy::Reject => value,
                };
                return Ok((ix, Some(displaced)));
            }
            Search::Vacant(parent) => parent,
        };
        // The only failure point, before anything is linked.
        let ix = self.arena.alloc_node(Node::new(key, value))?;
        match parent {
            None => self.root = Some(ix),
            Some((p, Side::Left)) => self.arena.set_left(p, Some(ix)),
            Some((p, Side::Right)) => self.arena.set_right(p, Some(ix)),
        }
        self.len += 1;
        self.rebalance(parent.map(|(p, _)| p));
        Ok((ix, None))
    }

    /// Does the map have an entry for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        matches!(self.search(key), Search::Found(_))
    }

    /// Get reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.get_key_value(key).map(|(_k, v)| v)
    }

    /// Get a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Search::Found(ix) => Some(self.arena.node_mut(ix).value_mut()),
            Search::Vacant(_) => None,
        }
    }

    /// Get references to the corresponding key and value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Search::Found(ix) => self.arena.node(ix).pair(),
            Search::Vacant(_) => None,
        }
    }

    /// Get a cursor to the element for the key, or [`end`](Self::end) if there is none.
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Search::Found(ix) => self.cursor_at(Some(ix)),
            Search::Vacant(_) => self.end(),
        }
    }

    /// Remove key-value pair from map, returning just the value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.remove_entry(key).map(|(_k, v)| v)
    }

    /// Remove key-value pair from map.
    ///
    /// Cursors positioned on the removed element stay valid, they can be moved on but not read.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.sweep();
        match self.search(key) {
            Search::Found(ix) => Some(self.erase_ix(ix)),
            Search::Vacant(_) => None,
        }
    }

    /// Remove first key-value pair from map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.sweep();
        let ix = self.first_ix()?;
        Some(self.erase_ix(ix))
    }

    /// Remove last key-value pair from map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.sweep();
        let ix = self.last_ix()?;
        Some(self.erase_ix(ix))
    }

    /// Remove all key-value pairs, visited in ascending order, for which f returns false.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.sweep();
        let mut at = self.first_ix();
        while let Some(ix) = at {
            at = self.arena.successor(ix);
            let keep = match self.arena.node_mut(ix).pair_mut() {
                Some((k, v)) => f(k, v),
                None => true,
            };
            if !keep {
                self.erase_ix(ix);
            }
        }
    }

    /// Get references to first key and value.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.arena.node(self.first_ix()?).pair()
    }

    /// Gets references to last key and value.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.arena.node(self.last_ix()?).pair()
    }

    /// Get iterator of references to key-value pairs.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            arena: &self.arena,
            front: self.first_ix(),
            back: self.last_ix(),
            len: self.len,
        }
    }

    /// Get iterator of mutable references to key-value pairs.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let (front, back) = (self.first_ix(), self.last_ix());
        IterMut {
            raw: self.arena.raw(),
            front,
            back,
            len: self.len,
            _marker: PhantomData,
        }
    }

    /// Get iterator of references to keys.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, A> {
        Keys(self.iter())
    }

    /// Get iterator of references to values.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, A> {
        Values(self.iter())
    }

    /// Get iterator of mutable references to values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }

    pub(crate) fn first_ix(&self) -> Option<Ix> {
        self.root.map(|r| self.arena.leftmost(r))
    }

    pub(crate) fn last_ix(&self) -> Option<Ix> {
        self.root.map(|r| self.arena.rightmost(r))
    }

    fn search<Q>(&self, key: &Q) -> Search
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut parent = None;
        let mut at = self.root;
        while let Some(ix) = at {
            let node = self.arena.node(ix);
            let nk: &Q = node.key().borrow();
            if self.cmp.less(key, nk) {
                parent = Some((ix, Side::Left));
                at = node.links.left;
            } else if self.cmp.less(nk, key) {
                parent = Some((ix, Side::Right));
                at = node.links.right;
            } else {
                return Search::Found(ix);
            }
        }
        Search::Vacant(parent)
    }

    /// Release unpinned tombstones.
    ///
    /// First every anchor is moved past tombstones onto the node a walk along the chain would
    /// reach, so afterwards tombstones are only pinned by cursors and one pass releases the rest.
    pub(crate) fn sweep(&mut self) {
        if self.graveyard.is_empty() {
            return;
        }
        let before = self.graveyard.len();
        for i in 0..before {
            let ix = self.graveyard[i];
            self.shorten(ix, true);
            self.shorten(ix, false);
        }
        let arena = &mut self.arena;
        self.graveyard.retain(|&ix| {
            if arena.node(ix).ref_count() == 0 {
                arena.release(ix);
                false
            } else {
                true
            }
        });
        let freed = before - self.graveyard.len();
        if freed != 0 {
            log::trace!(
                "released {} tombstones, {} still pinned",
                freed,
                self.graveyard.len()
            );
        }
    }

    /// Point the anchor of tombstone `ix` at the first node along its chain still in the tree
    /// (or at nothing), dropping the pins on the tombstones skipped.
    fn shorten(&mut self, ix: Ix, forward: bool) {
        while let Some(to) = self.arena.node(ix).anchor(forward) {
            let target = self.arena.node(to);
            if !target.is_deleted() {
                return;
            }
            let beyond = target
                .anchor(forward)
                .map(|b| (b, self.arena.node(b).pin()));
            self.arena.node_mut(ix).set_anchor(forward, beyond);
        }
    }

    /// Unlink a node from the tree, turning it into a tombstone if anything still refers to it.
    pub(crate) fn erase_ix(&mut self, ix: Ix) -> (K, V) {
        let next = self.arena.successor(ix);
        let prev = self.arena.predecessor(ix);
        let start = self.unlink(ix);
        self.rebalance(start);
        self.len -= 1;

        let node = self.arena.node_mut(ix);
        let pair = node.mark_deleted();
        if node.ref_count() == 0 {
            self.arena.release(ix);
        } else {
            let next = next.map(|n| (n, self.arena.node(n).pin()));
            let prev = prev.map(|p| (p, self.arena.node(p).pin()));
            self.arena.node_mut(ix).set_chain(next, prev);
            self.graveyard.push(ix);
        }
        pair
    }

    /// Detach node `z` from the tree, returning the lowest node whose height may have changed.
    fn unlink(&mut self, z: Ix) -> Option<Ix> {
        let links = self.arena.node(z).links;
        let start = match (links.left, links.right) {
            (None, child) | (child, None) => {
                self.replace_child(links.parent, z, child);
                links.parent
            }
            (Some(l), Some(r)) => {
                // y is the successor of z, the minimum of its right subtree.
                let (mut yp, mut y) = (z, r);
                while let Some(next) = self.arena.node(y).links.left {
                    yp = y;
                    y = next;
                }
                let start = if yp == z {
                    y
                } else {
                    let yr = self.arena.node(y).links.right;
                    self.arena.set_left(yp, yr);
                    self.arena.set_right(y, Some(r));
                    yp
                };
                self.arena.set_left(y, Some(l));
                self.replace_child(links.parent, z, Some(y));
                Some(start)
            }
        };
        self.arena.node_mut(z).links = Links::default();
        start
    }

    /// Point whatever referred to `old` (a parent, or the root) at `new`.
    fn replace_child(&mut self, parent: Option<Ix>, old: Ix, new: Option<Ix>) {
        match parent {
            None => {
                self.root = new;
                if let Some(n) = new {
                    self.arena.node_mut(n).links.parent = None;
                }
            }
            Some(p) => {
                if self.arena.node(p).links.left == Some(old) {
                    self.arena.set_left(p, new);
                } else {
                    self.arena.set_right(p, new);
                }
            }
        }
    }

    /// Restore heights and balance from `at` up to the root.
    fn rebalance(&mut self, mut at: Option<Ix>) {
        while let Some(ix) = at {
            at = self.arena.node(ix).links.parent;
            self.arena.update_height(ix);
            let links = self.arena.node(ix).links;
            match (self.arena.balance(ix), links.left, links.right) {
                (b, Some(l), _) if b > 1 => {
                    // A balanced child takes the single rotation.
                    if self.arena.balance(l) < 0 {
                        self.rotate_left(l);
                    }
                    self.rotate_right(ix);
                }
                (b, _, Some(r)) if b < -1 => {
                    if self.arena.balance(r) > 0 {
                        self.rotate_right(r);
                    }
                    self.rotate_left(ix);
                }
                _ => {}
            }
        }
    }

    fn rotate_right(&mut self, x: Ix) {
        let links = self.arena.node(x).links;
        let Some(y) = links.left else { return };
        let inner = self.arena.node(y).links.right;
        self.arena.set_left(x, inner);
        self.arena.set_right(y, Some(x));
        self.replace_child(links.parent, x, Some(y));
    }

    fn rotate_left(&mut self, x: Ix) {
        let links = self.arena.node(x).links;
        let Some(y) = links.right else { return };
        let inner = self.arena.node(y).links.left;
        self.arena.set_right(x, inner);
        self.arena.set_left(y, Some(x));
        self.replace_child(links.parent, x, Some(y));
    }

    #[cfg(test)]
    pub(crate) fn check(&self)
    where
        C: Compare<K>,
    {
        use arrayvec::ArrayVec;

        let mut stack: ArrayVec<(Ix, Option<Ix>), 64> = ArrayVec::new();
        if let Some(r) = self.root {
            stack.push((r, None));
        }
        let mut count = 0;
        while let Some((ix, parent)) = stack.pop() {
            count += 1;
            let node = self.arena.node(ix);
            assert!(!node.is_deleted(), "tombstone reachable from root");
            assert_eq!(node.links.parent, parent, "bad parent link");
            let (l, r) = (node.links.left, node.links.right);
            assert_eq!(
                node.height(),
                1 + self.arena.height(l).max(self.arena.height(r)),
                "stale height"
            );
            assert!(self.arena.balance(ix).abs() <= 1, "unbalanced node");
            if let Some(l) = l {
                assert!(self.cmp.less(self.arena.node(l).key(), node.key()));
                stack.push((l, Some(ix)));
            }
            if let Some(r) = r {
                assert!(self.cmp.less(node.key(), self.arena.node(r).key()));
                stack.push((r, Some(ix)));
            }
        }
        assert_eq!(count, self.len);
        let keys: Vec<&K> = self.keys().collect();
        for w in keys.windows(2) {
            assert!(self.cmp.less(w[0], w[1]), "keys out of order");
        }
        for &ix in &self.graveyard {
            assert!(self.arena.node(ix).is_deleted());
        }
        assert_eq!(self.arena.in_use(), self.len + self.graveyard.len());
    }
} // End impl AvlMap

impl<K: PartialEq, V: PartialEq, C, A: NodeAlloc> PartialEq for AvlMap<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}
impl<K: Eq, V: Eq, C, A: NodeAlloc> Eq for AvlMap<K, V, C, A> {}

impl<K, V, C, A: NodeAlloc> IntoIterator for AvlMap<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    /// Convert `AvlMap` to [`IntoIter`].
    fn into_iter(self) -> IntoIter<K, V, A> {
        let (front, back) = (self.first_ix(), self.last_ix());
        IntoIter {
            len: self.len,
            arena: self.arena,
            front,
            back,
        }
    }
}
impl<'a, K, V, C, A: NodeAlloc> IntoIterator for &'a AvlMap<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, A>;
    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}
impl<'a, K, V, C, A: NodeAlloc> IntoIterator for &'a mut AvlMap<K, V, C, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
impl<K, V, C, A> Clone for AvlMap<K, V, C, A>
where
    K: Clone,
    V: Clone,
    C: Compare<K> + Clone,
    A: NodeAlloc + Clone,
{
    fn clone(&self) -> Self {
        let mut map = Self::with_compare_in(self.cmp.clone(), self.allocator().clone())
            .with_policy(self.policy);
        for (k, v) in self {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}
impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> AvlMap<K, V> {
        let mut map = AvlMap::new();
        map.extend(iter);
        map
    }
}
impl<K: Ord, V, const N: usize> From<[(K, V); N]> for AvlMap<K, V> {
    fn from(arr: [(K, V); N]) -> AvlMap<K, V> {
        AvlMap::from_iter(arr)
    }
}
impl<K, V, C, A> Extend<(K, V)> for AvlMap<K, V, C, A>
where
    C: Compare<K>,
    A: NodeAlloc,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<K, Q, V, C, A> std::ops::Index<&Q> for AvlMap<K, V, C, A>
where
    K: Borrow<Q>,
    C: Compare<Q>,
    Q: ?Sized,
    A: NodeAlloc,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// Panics if the key is not present in the `AvlMap`.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
impl<K: Debug, V: Debug, C, A: NodeAlloc> Debug for AvlMap<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

use crate::{
    alloc::{AllocError, Global, NodeAlloc},
    arena::{Arena, RawSlots},
    compare::{Compare, OrdLess},
    cursor::Cursor,
    node::{Ix, Links, Node, Walk},
};
use std::{
    borrow::Borrow,
    fmt,
    fmt::Debug,
    iter::FusedIterator,
    marker::PhantomData,
    mem,
};

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

enum Search {
    Found(Ix),
    /// Where the key would be linked, `None` for an empty tree.
    Vacant(Option<(Ix, Side)>),
}

// Iteration.

/// Iterator returned by [`AvlMap::iter`].
pub struct Iter<'a, K, V, A: NodeAlloc = Global> {
    arena: &'a Arena<K, V, A>,
    front: Option<Ix>,
    back: Option<Ix>,
    len: usize,
}
impl<'a, K, V, A: NodeAlloc> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let arena = self.arena;
        let ix = self.front?;
        self.len -= 1;
        self.front = arena.successor(ix);
        arena.node(ix).pair()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V, A: NodeAlloc> DoubleEndedIterator for Iter<'a, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let arena = self.arena;
        let ix = self.back?;
        self.len -= 1;
        self.back = arena.predecessor(ix);
        arena.node(ix).pair()
    }
}
impl<'a, K, V, A: NodeAlloc> ExactSizeIterator for Iter<'a, K, V, A> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V, A: NodeAlloc> FusedIterator for Iter<'a, K, V, A> {}
impl<'a, K, V, A: NodeAlloc> Clone for Iter<'a, K, V, A> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}

/// Iterator returned by [`AvlMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    raw: RawSlots<K, V>,
    front: Option<Ix>,
    back: Option<Ix>,
    len: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}
impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ix = self.front?;
        self.len -= 1;
        self.front = self.raw.successor(ix);
        // Each node is yielded once, front and back never cross while len > 0.
        unsafe { self.raw.pair_mut(ix) }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ix = self.back?;
        self.len -= 1;
        self.back = self.raw.predecessor(ix);
        unsafe { self.raw.pair_mut(ix) }
    }
}
impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}

/// Consuming iterator returned by [`AvlMap::into_iter`].
pub struct IntoIter<K, V, A: NodeAlloc = Global> {
    arena: Arena<K, V, A>,
    front: Option<Ix>,
    back: Option<Ix>,
    len: usize,
}
impl<K, V, A: NodeAlloc> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ix = self.front?;
        self.len -= 1;
        // Taking the pair leaves the links in place, so the walk can continue.
        self.front = self.arena.successor(ix);
        self.arena.node_mut(ix).take_pair()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<K, V, A: NodeAlloc> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ix = self.back?;
        self.len -= 1;
        self.back = self.arena.predecessor(ix);
        self.arena.node_mut(ix).take_pair()
    }
}
impl<K, V, A: NodeAlloc> ExactSizeIterator for IntoIter<K, V, A> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<K, V, A: NodeAlloc> FusedIterator for IntoIter<K, V, A> {}

/// Iterator returned by [`AvlMap::keys`].
pub struct Keys<'a, K, V, A: NodeAlloc = Global>(Iter<'a, K, V, A>);
impl<'a, K, V, A: NodeAlloc> Iterator for Keys<'a, K, V, A> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V, A: NodeAlloc> DoubleEndedIterator for Keys<'a, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}
impl<'a, K, V, A: NodeAlloc> ExactSizeIterator for Keys<'a, K, V, A> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V, A: NodeAlloc> FusedIterator for Keys<'a, K, V, A> {}

/// Iterator returned by [`AvlMap::values`].
pub struct Values<'a, K, V, A: NodeAlloc = Global>(Iter<'a, K, V, A>);
impl<'a, K, V, A: NodeAlloc> Iterator for Values<'a, K, V, A> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V, A: NodeAlloc> DoubleEndedIterator for Values<'a, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
impl<'a, K, V, A: NodeAlloc> ExactSizeIterator for Values<'a, K, V, A> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V, A: NodeAlloc> FusedIterator for Values<'a, K, V, A> {}

/// Iterator returned by [`AvlMap::values_mut`].
pub struct ValuesMut<'a, K, V>(IterMut<'a, K, V>);
impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V> DoubleEndedIterator for ValuesMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
impl<'a, K, V> ExactSizeIterator for ValuesMut<'a, K, V> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V> FusedIterator for ValuesMut<'a, K, V> {}
