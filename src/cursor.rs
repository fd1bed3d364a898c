//! Cursors: positions in a map that survive mutation of the map.
//!
//! A [`Cursor`] does not borrow its map. It holds a generation-checked handle to a node plus a
//! pin on that node, so the node is kept (as a tombstone) even if its element is removed. All
//! reads and moves go through the map, which checks that the cursor is still usable.

use crate::{
    alloc::NodeAlloc,
    arena::{ArenaId, Handle},
    map::AvlMap,
    node::{Ix, Pin, Walk},
};
use thiserror::Error;

/// Error returned when a [`Cursor`] cannot be used for the requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The cursor is at the end position, there is no element to read or move past.
    #[error("cursor is at the end of the map")]
    End,
    /// The element the cursor refers to has been removed. The cursor can still be moved.
    #[error("cursor refers to an element that has been removed")]
    Erased,
    /// The node the cursor refers to no longer exists, for example after the map was cleared.
    #[error("cursor refers to a node that no longer exists")]
    Stale,
    /// The cursor was obtained from a different map.
    #[error("cursor belongs to a different map")]
    ForeignMap,
}

#[derive(Debug, Clone)]
struct Held {
    handle: Handle,
    pin: Pin,
}

/// Position in an [`AvlMap`]: either an element or the end.
///
/// Returned by [`AvlMap::begin`], [`AvlMap::end`], [`AvlMap::rbegin`], [`AvlMap::find`] and
/// [`AvlMap::insert_cursor`]. Two cursors are equal if they are at the same position of the same
/// map. Cloning a cursor pins the node again, dropping it releases the pin.
#[derive(Debug, Clone)]
pub struct Cursor {
    map: ArenaId,
    at: Option<Held>,
}

impl Cursor {
    /// Is the cursor at the end position?
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.at.is_none()
    }

    fn handle(&self) -> Option<Handle> {
        self.at.as_ref().map(|h| h.handle)
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map && self.handle() == other.handle()
    }
}
impl Eq for Cursor {}

impl<K, V, C, A: NodeAlloc> AvlMap<K, V, C, A> {
    pub(crate) fn cursor_at(&self, at: Option<Ix>) -> Cursor {
        Cursor {
            map: self.arena.id(),
            at: at.map(|ix| Held {
                handle: self.arena.handle(ix),
                pin: self.arena.node(ix).pin(),
            }),
        }
    }

    /// Cursor at the first element, equal to [`end`](Self::end) if the map is empty.
    #[must_use]
    pub fn begin(&self) -> Cursor {
        self.cursor_at(self.first_ix())
    }

    /// Cursor at the end position, one past the last element.
    #[must_use]
    pub fn end(&self) -> Cursor {
        self.cursor_at(None)
    }

    /// Cursor at the last element, for traversal in reverse with [`retreat`](Self::retreat).
    #[must_use]
    pub fn rbegin(&self) -> Cursor {
        self.cursor_at(self.last_ix())
    }

    /// End position for reverse traversal, the same as [`end`](Self::end).
    #[must_use]
    pub fn rend(&self) -> Cursor {
        self.end()
    }

    /// Get the node the cursor refers to, `None` for the end position.
    fn resolve(&self, cursor: &Cursor) -> Result<Option<Ix>, CursorError> {
        if cursor.map != self.arena.id() {
            return Err(CursorError::ForeignMap);
        }
        match cursor.handle() {
            None => Ok(None),
            Some(h) if self.arena.is_current(h) => Ok(Some(h.ix)),
            Some(_) => Err(CursorError::Stale),
        }
    }

    /// Get references to the key and value at the cursor.
    pub fn get_at(&self, cursor: &Cursor) -> Result<(&K, &V), CursorError> {
        let ix = self.resolve(cursor)?.ok_or(CursorError::End)?;
        self.arena.node(ix).pair().ok_or(CursorError::Erased)
    }

    /// Get reference to the key and mutable reference to the value at the cursor.
    pub fn get_at_mut(&mut self, cursor: &Cursor) -> Result<(&K, &mut V), CursorError> {
        let ix = self.resolve(cursor)?.ok_or(CursorError::End)?;
        self.arena.node_mut(ix).pair_mut().ok_or(CursorError::Erased)
    }

    /// Move the cursor to the next element, or to the end position after the last element.
    ///
    /// A cursor on a removed element moves to the element that followed it when it was removed
    /// (or the first one after that still present).
    pub fn advance(&self, cursor: &mut Cursor) -> Result<(), CursorError> {
        let ix = self.resolve(cursor)?.ok_or(CursorError::End)?;
        let to = self.step(ix, true);
        self.repoint(cursor, to);
        Ok(())
    }

    /// Move the cursor to the previous element. From the end position this is the last element,
    /// from the first element it is the end position.
    pub fn retreat(&self, cursor: &mut Cursor) -> Result<(), CursorError> {
        let to = match self.resolve(cursor)? {
            Some(ix) => self.step(ix, false),
            None => Some(self.last_ix().ok_or(CursorError::End)?),
        };
        self.repoint(cursor, to);
        Ok(())
    }

    /// Remove the element at the cursor, returning its key and value.
    ///
    /// The cursor stays on the removed node, so it can still be moved to its neighbours.
    pub fn remove_at(&mut self, cursor: &Cursor) -> Result<(K, V), CursorError> {
        self.sweep();
        let ix = self.resolve(cursor)?.ok_or(CursorError::End)?;
        if self.arena.node(ix).is_deleted() {
            return Err(CursorError::Erased);
        }
        Ok(self.erase_ix(ix))
    }

    fn repoint(&self, cursor: &mut Cursor, to: Option<Ix>) {
        if let Some(held) = cursor.at.take() {
            held.pin.unpin();
        }
        cursor.at = to.map(|ix| Held {
            handle: self.arena.handle(ix),
            pin: self.arena.node(ix).pin(),
        });
    }

    /// Neighbour of node `ix` in key order.
    fn step(&self, ix: Ix, forward: bool) -> Option<Ix> {
        let node = self.arena.node(ix);
        if !node.is_deleted() {
            return if forward {
                self.arena.successor(ix)
            } else {
                self.arena.predecessor(ix)
            };
        }
        // Follow the tombstone chain to the first node still in the tree.
        let mut link = node.anchor(forward);
        while let Some(at) = link {
            let n = self.arena.node(at);
            if !n.is_deleted() {
                return Some(at);
            }
            link = n.anchor(forward);
        }
        None
    }
}
