use crate::{
    alloc::{AllocError, NodeAlloc},
    node::{Ix, Links, Node, Walk},
};
use std::{
    ptr,
    ptr::NonNull,
    sync::atomic::{AtomicU64, Ordering},
};

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(any(debug_assertions, not(feature = "unsafe-optim")))]
macro_rules! safe_assert {
    ( $cond: expr ) => {
        assert!($cond)
    };
}

/// In debug mode or feature unsafe-optim not enabled, same as assert! otherwise does nothing.
#[cfg(all(not(debug_assertions), feature = "unsafe-optim"))]
macro_rules! safe_assert {
    ( $cond: expr ) => {};
}

/// Largest number of slots an arena can hold.
const MAX_SLOTS: usize = u32::MAX as usize;

/// First capacity allocated.
const MIN_CAP: usize = 8;

/// Identity of an arena (and so of the map that owns it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArenaId(u64);

impl ArenaId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Slot index plus the generation it was allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handle {
    pub ix: Ix,
    pub gen: u32,
}

pub(crate) struct Slot<K, V> {
    gen: u32,
    vacant: bool,
    next_free: Option<Ix>,
    node: Node<K, V>,
}

/// Slab of node slots. Slots never move once allocated (as indices), released slots are
/// chained on a free list and reused, their generation bumped so old handles can be detected.
pub(crate) struct Arena<K, V, A: NodeAlloc> {
    base: NonNull<Slot<K, V>>,
    cap: usize,
    /// Number of initialised slots.
    len: usize,
    free: Option<Ix>,
    in_use: usize,
    id: ArenaId,
    alloc: A,
}

impl<K, V, A: NodeAlloc> Arena<K, V, A> {
    pub fn new(alloc: A) -> Self {
        Self {
            base: NonNull::dangling(),
            cap: 0,
            len: 0,
            free: None,
            in_use: 0,
            id: ArenaId::fresh(),
            alloc,
        }
    }

    #[inline]
    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Number of occupied slots (live nodes and tombstones).
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Make sure the next `alloc_node` cannot fail.
    pub fn reserve_one(&mut self) -> Result<(), AllocError> {
        if self.free.is_some() || self.len < self.cap {
            return Ok(());
        }
        if self.cap >= MAX_SLOTS {
            return Err(AllocError::CapacityOverflow);
        }
        let new_cap = if self.cap == 0 {
            MIN_CAP
        } else {
            (self.cap * 2).min(MAX_SLOTS)
        };
        let p = self.alloc.allocate::<Slot<K, V>>(new_cap)?;
        unsafe {
            ptr::copy_nonoverlapping(self.base.as_ptr(), p.as_ptr(), self.len);
            if self.cap != 0 {
                self.alloc.deallocate(self.base, self.cap);
            }
        }
        log::trace!("node arena grown from {} to {} slots", self.cap, new_cap);
        self.base = p;
        self.cap = new_cap;
        Ok(())
    }

    /// Store a new node, returning its index.
    pub fn alloc_node(&mut self, node: Node<K, V>) -> Result<Ix, AllocError> {
        self.reserve_one()?;
        self.in_use += 1;
        if let Some(ix) = self.free {
            let slot = self.slot_mut(ix);
            slot.vacant = false;
            let next = slot.next_free.take();
            slot.node = node;
            self.free = next;
            Ok(ix)
        } else {
            let ix = self.len;
            unsafe {
                ptr::write(
                    self.base.as_ptr().add(ix),
                    Slot {
                        gen: 0,
                        vacant: false,
                        next_free: None,
                        node,
                    },
                );
            }
            self.len += 1;
            Ok(ix as Ix)
        }
    }

    /// Return a slot to the free list, dropping its node.
    pub fn release(&mut self, ix: Ix) {
        let free = self.free;
        let slot = self.slot_mut(ix);
        safe_assert!(!slot.vacant);
        slot.vacant = true;
        slot.gen = slot.gen.wrapping_add(1);
        slot.next_free = free;
        // Dropping the old node may drop anchors, which only touch shared counters.
        let old = std::mem::replace(&mut slot.node, Node::vacant());
        self.free = Some(ix);
        self.in_use -= 1;
        drop(old);
    }

    /// Release every occupied slot.
    pub fn release_all(&mut self) {
        for ix in 0..self.len as Ix {
            if !self.slot(ix).vacant {
                self.release(ix);
            }
        }
    }

    #[inline]
    pub fn handle(&self, ix: Ix) -> Handle {
        Handle {
            ix,
            gen: self.slot(ix).gen,
        }
    }

    /// Does the handle still refer to the node it was taken from?
    pub fn is_current(&self, h: Handle) -> bool {
        (h.ix as usize) < self.len && {
            let slot = self.slot(h.ix);
            !slot.vacant && slot.gen == h.gen
        }
    }

    #[inline]
    fn slot(&self, ix: Ix) -> &Slot<K, V> {
        safe_assert!((ix as usize) < self.len);
        unsafe { &*self.base.as_ptr().add(ix as usize) }
    }

    #[inline]
    fn slot_mut(&mut self, ix: Ix) -> &mut Slot<K, V> {
        safe_assert!((ix as usize) < self.len);
        unsafe { &mut *self.base.as_ptr().add(ix as usize) }
    }

    #[inline]
    pub fn node(&self, ix: Ix) -> &Node<K, V> {
        &self.slot(ix).node
    }

    #[inline]
    pub fn node_mut(&mut self, ix: Ix) -> &mut Node<K, V> {
        &mut self.slot_mut(ix).node
    }

    /// Height of an optional subtree, 0 when absent.
    #[inline]
    pub fn height(&self, at: Option<Ix>) -> u8 {
        at.map_or(0, |ix| self.node(ix).height())
    }

    /// `height(left) - height(right)`.
    pub fn balance(&self, ix: Ix) -> i32 {
        let links = self.node(ix).links;
        self.height(links.left) as i32 - self.height(links.right) as i32
    }

    pub fn update_height(&mut self, ix: Ix) {
        let links = self.node(ix).links;
        let h = 1 + self.height(links.left).max(self.height(links.right));
        self.node_mut(ix).set_height(h);
    }

    pub fn set_left(&mut self, ix: Ix, child: Option<Ix>) {
        self.node_mut(ix).links.left = child;
        if let Some(c) = child {
            self.node_mut(c).links.parent = Some(ix);
        }
        self.update_height(ix);
    }

    pub fn set_right(&mut self, ix: Ix, child: Option<Ix>) {
        self.node_mut(ix).links.right = child;
        if let Some(c) = child {
            self.node_mut(c).links.parent = Some(ix);
        }
        self.update_height(ix);
    }

    /// Raw view used by mutable iteration.
    pub fn raw(&mut self) -> RawSlots<K, V> {
        RawSlots {
            base: self.base,
            len: self.len,
        }
    }
}

impl<K, V, A: NodeAlloc> Walk for Arena<K, V, A> {
    #[inline]
    fn links(&self, ix: Ix) -> Links {
        self.node(ix).links
    }
}

impl<K, V, A: NodeAlloc> Drop for Arena<K, V, A> {
    fn drop(&mut self) {
        unsafe {
            let slots = ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.len);
            self.len = 0;
            ptr::drop_in_place(slots);
            if self.cap != 0 {
                self.alloc.deallocate(self.base, self.cap);
            }
        }
    }
}

/// Pointer to the arena storage that reads links without creating references to whole
/// nodes, so values already handed out as `&mut V` are not aliased.
pub(crate) struct RawSlots<K, V> {
    base: NonNull<Slot<K, V>>,
    len: usize,
}

impl<K, V> Clone for RawSlots<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V> Copy for RawSlots<K, V> {}

impl<K, V> RawSlots<K, V> {
    /// Mutable access to the pair of an occupied node.
    /// # Safety
    ///
    /// The arena must outlive `'a`, and each pair must be handed out at most once.
    pub unsafe fn pair_mut<'a>(self, ix: Ix) -> Option<(&'a K, &'a mut V)> {
        safe_assert!((ix as usize) < self.len);
        let slot = self.base.as_ptr().add(ix as usize);
        (*ptr::addr_of_mut!((*slot).node)).pair_mut()
    }
}

impl<K, V> Walk for RawSlots<K, V> {
    #[inline]
    fn links(&self, ix: Ix) -> Links {
        safe_assert!((ix as usize) < self.len);
        unsafe {
            let slot = self.base.as_ptr().add(ix as usize);
            ptr::addr_of!((*slot).node.links).read()
        }
    }
}
