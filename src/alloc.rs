use core::ptr::NonNull;
use std::alloc::{alloc, dealloc, Layout};

use crate::Error;

/// The allocation strategy consumed by a [`CompactBuf`].
///
/// A buffer talks to its allocator exclusively through this trait, so arenas
/// and pools can be substituted for the process-wide allocator. The
/// `PartialEq` bound is the interchangeability predicate: two allocator
/// instances that compare equal must be able to free each other's blocks.
///
/// [`CompactBuf`]: crate::CompactBuf
pub trait Alloc: PartialEq {
    /// Allocates a block of `size` bytes, aligned for `u8`.
    ///
    /// `size` is always non-zero; the buffer never requests an empty block.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, Error>;

    /// Frees a block previously returned by [`allocate`] on an allocator
    /// that compares equal to `self`.
    ///
    /// # Safety
    /// * `ptr` must denote a live block of exactly `size` bytes obtained
    ///   from this allocator (or one equal to it), and must not be used
    ///   after this call.
    ///
    /// [`allocate`]: Alloc::allocate
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize);

    /// The largest single block this allocator can provide, in bytes.
    fn max_allocation_size(&self) -> usize;
}

/// The process-wide allocator, and the default strategy for [`CompactBuf`].
///
/// All instances are interchangeable, so `Global == Global` always holds.
///
/// [`CompactBuf`]: crate::CompactBuf
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Global;

impl Alloc for Global {
    #[inline]
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, Error> {
        debug_assert!(size > 0);

        // SAFETY: `size` is non-zero, and callers bound it by
        // `max_allocation_size` (isize::MAX) before requesting a block.
        let ptr = unsafe {
            let layout = Layout::from_size_align_unchecked(size, 1);
            alloc(layout)
        };

        NonNull::new(ptr).ok_or(Error::AllocFailed { size })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: `size` was accepted by `allocate`, so the layout is valid.
        let layout = Layout::from_size_align_unchecked(size, 1);
        dealloc(ptr.as_ptr(), layout);
    }

    #[inline]
    fn max_allocation_size(&self) -> usize {
        isize::MAX as usize
    }
}
