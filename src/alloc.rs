//! Raw storage provider for node slots.
//!
//! A [`NodeAlloc`] hands out uninitialised memory for `n` slots and takes it back again.
//! It never constructs or drops values, that is the job of the arena that owns the slots.

use std::{alloc, alloc::Layout, mem, ptr::NonNull};
use thiserror::Error;

/// Error returned when node storage cannot be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The requested number of slots does not fit in the address space.
    #[error("node storage capacity overflow")]
    CapacityOverflow,
    /// The underlying allocator could not satisfy the request.
    #[error("allocator could not provide {} bytes of node storage", .0.size())]
    Exhausted(Layout),
}

impl AllocError {
    /// Treat the error as fatal, the way the standard collections do.
    pub(crate) fn fail(self) -> ! {
        match self {
            AllocError::CapacityOverflow => panic!("capacity overflow"),
            AllocError::Exhausted(layout) => alloc::handle_alloc_error(layout),
        }
    }
}

/// Provider of raw memory for arrays of node slots.
///
/// # Safety
///
/// `allocate` must return memory that is valid for `n` values of `T` (suitably aligned)
/// until it is passed back to `deallocate` with the same `n`.
pub unsafe trait NodeAlloc {
    /// Get uninitialised storage for `n` values of `T`.
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError>;

    /// Release storage.
    /// # Safety
    ///
    /// `ptr` must have come from `allocate::<T>(n)` on this allocator and not been released yet.
    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize);
}

/// [`NodeAlloc`] backed by the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Global;

unsafe impl NodeAlloc for Global {
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n == 0 || mem::size_of::<T>() == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::CapacityOverflow)?;
        let p = unsafe { alloc::alloc(layout) };
        NonNull::new(p.cast::<T>()).ok_or(AllocError::Exhausted(layout))
    }

    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        if n == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        if let Ok(layout) = Layout::array::<T>(n) {
            alloc::dealloc(ptr.as_ptr().cast::<u8>(), layout);
        }
    }
}

unsafe impl<A: NodeAlloc> NodeAlloc for &A {
    fn allocate<T>(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        (**self).allocate(n)
    }

    unsafe fn deallocate<T>(&self, ptr: NonNull<T>, n: usize) {
        (**self).deallocate(ptr, n)
    }
}
