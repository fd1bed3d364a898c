use std::{
    cell::{Cell, OnceCell},
    fmt,
    rc::Rc,
};

/// Index of a slot in the arena.
pub(crate) type Ix = u32;

/// Tree links of a node. Only `left` and `right` own, `parent` is a back-reference.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Links {
    pub parent: Option<Ix>,
    pub left: Option<Ix>,
    pub right: Option<Ix>,
}

/// Guard holding one unit of a node's reference count.
///
/// The count is shared through an `Rc`, so the guard can be released without access to the map.
pub(crate) struct Pin(Rc<Cell<usize>>);

impl Pin {
    fn new(count: &Rc<Cell<usize>>) -> Self {
        let n = count.get();
        if n == usize::MAX {
            std::process::abort();
        }
        count.set(n + 1);
        Self(count.clone())
    }

    /// Give up the hold on the node.
    pub fn unpin(self) {}
}

impl Clone for Pin {
    fn clone(&self) -> Self {
        Pin::new(&self.0)
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        let n = self.0.get();
        debug_assert!(n > 0);
        self.0.set(n - 1);
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({})", self.0.get())
    }
}

/// Pinned link from a tombstone to a neighbour.
#[derive(Debug)]
pub(crate) struct Anchor {
    pub ix: Ix,
    _pin: Pin,
}

/// Tree vertex.
pub(crate) struct Node<K, V> {
    /// Key and value, `None` once the node has been deleted.
    pair: Option<(K, V)>,
    pub links: Links,
    height: u8,
    pins: OnceCell<Rc<Cell<usize>>>,
    /// Successor at the time of deletion.
    pub next: Option<Anchor>,
    /// Predecessor at the time of deletion.
    pub prev: Option<Anchor>,
}

impl<K, V> Node<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            pair: Some((key, value)),
            links: Links::default(),
            height: 1,
            pins: OnceCell::new(),
            next: None,
            prev: None,
        }
    }

    /// Node for an unused slot.
    pub fn vacant() -> Self {
        Self {
            pair: None,
            links: Links::default(),
            height: 0,
            pins: OnceCell::new(),
            next: None,
            prev: None,
        }
    }

    #[inline]
    pub fn height(&self) -> u8 {
        self.height
    }

    #[inline]
    pub fn set_height(&mut self, height: u8) {
        self.height = height;
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.pair.is_none()
    }

    /// Turn the node into a tombstone, handing back its key and value.
    pub fn mark_deleted(&mut self) -> (K, V) {
        match self.pair.take() {
            Some(pair) => pair,
            None => panic!("node deleted twice"),
        }
    }

    #[inline]
    pub fn pair(&self) -> Option<(&K, &V)> {
        self.pair.as_ref().map(|(k, v)| (k, v))
    }

    #[inline]
    pub fn pair_mut(&mut self) -> Option<(&K, &mut V)> {
        self.pair.as_mut().map(|(k, v)| (&*k, v))
    }

    /// Value of a node that is linked into the tree.
    #[inline]
    pub fn value_mut(&mut self) -> &mut V {
        match &mut self.pair {
            Some((_, v)) => v,
            None => unreachable!("tombstone linked into tree"),
        }
    }

    pub fn take_pair(&mut self) -> Option<(K, V)> {
        self.pair.take()
    }

    /// Key of a node that is linked into the tree.
    #[inline]
    pub fn key(&self) -> &K {
        match &self.pair {
            Some((k, _)) => k,
            None => unreachable!("tombstone linked into tree"),
        }
    }

    /// Increment the reference count.
    pub fn pin(&self) -> Pin {
        Pin::new(self.pins.get_or_init(|| Rc::new(Cell::new(0))))
    }

    pub fn ref_count(&self) -> usize {
        self.pins.get().map_or(0, |c| c.get())
    }

    /// Record the neighbours of a node that has just been deleted.
    pub fn set_chain(&mut self, next: Option<(Ix, Pin)>, prev: Option<(Ix, Pin)>) {
        self.next = next.map(|(ix, pin)| Anchor { ix, _pin: pin });
        self.prev = prev.map(|(ix, pin)| Anchor { ix, _pin: pin });
    }

    /// Neighbour recorded in a tombstone, `next` if `forward` else `prev`.
    #[inline]
    pub fn anchor(&self, forward: bool) -> Option<Ix> {
        let anchor = if forward { &self.next } else { &self.prev };
        anchor.as_ref().map(|a| a.ix)
    }

    /// Replace one recorded neighbour, releasing the pin on the old one.
    pub fn set_anchor(&mut self, forward: bool, to: Option<(Ix, Pin)>) {
        let anchor = to.map(|(ix, pin)| Anchor { ix, _pin: pin });
        if forward {
            self.next = anchor;
        } else {
            self.prev = anchor;
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("pair", &self.pair)
            .field("links", &self.links)
            .field("height", &self.height)
            .field("ref_count", &self.ref_count())
            .field("next", &self.next.as_ref().map(|a| a.ix))
            .field("prev", &self.prev.as_ref().map(|a| a.ix))
            .finish()
    }
}

/// In-order navigation over anything that can report node links.
pub(crate) trait Walk {
    fn links(&self, ix: Ix) -> Links;

    /// Minimum of the subtree rooted at `ix`.
    fn leftmost(&self, mut ix: Ix) -> Ix {
        while let Some(l) = self.links(ix).left {
            ix = l;
        }
        ix
    }

    /// Maximum of the subtree rooted at `ix`.
    fn rightmost(&self, mut ix: Ix) -> Ix {
        while let Some(r) = self.links(ix).right {
            ix = r;
        }
        ix
    }

    fn successor(&self, ix: Ix) -> Option<Ix> {
        let links = self.links(ix);
        if let Some(r) = links.right {
            return Some(self.leftmost(r));
        }
        let (mut child, mut up) = (ix, links.parent);
        while let Some(p) = up {
            let pl = self.links(p);
            if pl.left == Some(child) {
                return Some(p);
            }
            child = p;
            up = pl.parent;
        }
        None
    }

    fn predecessor(&self, ix: Ix) -> Option<Ix> {
        let links = self.links(ix);
        if let Some(l) = links.left {
            return Some(self.rightmost(l));
        }
        let (mut child, mut up) = (ix, links.parent);
        while let Some(p) = up {
            let pl = self.links(p);
            if pl.right == Some(child) {
                return Some(p);
            }
            child = p;
            up = pl.parent;
        }
        None
    }
}
