#![deny(missing_docs)]

//! This crate implements [AvlMap], an ordered map backed by an AVL tree, similar in use to
//! [std::collections::BTreeMap].
//!
//! The difference is in removal and cursors. A [Cursor] does not borrow the map, so the map can
//! be changed while cursors are outstanding. Removal is lazy: a removed node that a cursor still
//! refers to is kept as a tombstone which remembers its neighbours, so the cursor can carry on.
//!
//! Most of the implementation is in the [map] module, see [map::AvlMap].
//!
//! # Example
//!
//! ```
//!     use avl_lazy::AvlMap;
//!     let mut mymap = AvlMap::new();
//!     mymap.insert("England", "London");
//!     mymap.insert("France", "Paris");
//!     mymap.insert("Spain", "Madrid");
//!     println!("The capital of France is {}", mymap["France"]);
//!
//!     let mut c = mymap.find("France");
//!     mymap.remove("France");
//!     mymap.advance(&mut c).unwrap();
//!     assert_eq!(mymap.get_at(&c).unwrap(), (&"Spain", &"Madrid"));
//! ```
//!
//!# Features
//!
//! This crate supports the following cargo features:
//! - `unsafe-optim` : skips internal index checks in release builds.

/// Node storage allocation.
pub mod alloc;

/// Key ordering.
pub mod compare;

/// Cursors that survive removal.
pub mod cursor;

/// Module with the map, see [map::AvlMap].
pub mod map;

mod arena;
mod node;

pub use alloc::{AllocError, Global, NodeAlloc};
pub use compare::{Compare, OrdLess};
pub use cursor::{Cursor, CursorError};
pub use map::{AvlMap, DuplicatePolicy};

/// Iterator returned by [AvlMap::iter].
pub type Iter<'a, K, V> = map::Iter<'a, K, V, Global>;

/// Iterator returned by [AvlMap::iter_mut].
pub type IterMut<'a, K, V> = map::IterMut<'a, K, V>;

/// Consuming iterator returned by [AvlMap::into_iter].
pub type IntoIter<K, V> = map::IntoIter<K, V, Global>;

/// Iterator returned by [AvlMap::keys].
pub type Keys<'a, K, V> = map::Keys<'a, K, V, Global>;

/// Iterator returned by [AvlMap::values].
pub type Values<'a, K, V> = map::Values<'a, K, V, Global>;

/// Iterator returned by [AvlMap::values_mut].
pub type ValuesMut<'a, K, V> = map::ValuesMut<'a, K, V>;

// Tests.

/* mimalloc cannot be used with miri */
#[cfg(all(test, not(miri)))]
use mimalloc::MiMalloc;

#[cfg(all(test, not(miri)))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[cfg(test)]
mod mytests;

#[cfg(test)]
mod proptests;
