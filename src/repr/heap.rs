use core::{fmt, ptr, slice};

use crate::alloc::Alloc;
use crate::Error;

/// A heap-backed buffer: pointer, logical length, and content capacity.
///
/// The underlying block is always `cap + 1` bytes so the NUL terminator has
/// a slot at `ptr[len]`. `cap` counts content slots only.
///
/// `HeapBuf` does not know its allocator, so it cannot implement `Drop`;
/// the owning [`CompactBuf`] frees it through [`HeapBuf::dealloc`] with the
/// co-located allocator.
///
/// [`CompactBuf`]: crate::CompactBuf
#[repr(C)]
pub struct HeapBuf {
    ptr: ptr::NonNull<u8>,
    len: usize,
    cap: usize,
}

unsafe impl Send for HeapBuf {}
unsafe impl Sync for HeapBuf {}

impl HeapBuf {
    /// Allocates an empty heap buffer able to hold `capacity` content bytes.
    #[inline]
    pub fn with_capacity<A: Alloc>(capacity: usize, alloc: &A) -> Result<Self, Error> {
        debug_assert!(capacity > 0);

        // one extra slot for the terminator
        let ptr = alloc.allocate(capacity + 1)?;
        // SAFETY: the block is at least one byte long
        unsafe { ptr.as_ptr().write(0) };

        Ok(HeapBuf {
            ptr,
            len: 0,
            cap: capacity,
        })
    }

    /// Allocates a heap buffer of `capacity` content slots holding `bytes`.
    #[inline]
    pub fn from_slice<A: Alloc>(bytes: &[u8], capacity: usize, alloc: &A) -> Result<Self, Error> {
        debug_assert!(bytes.len() <= capacity);

        let mut new = HeapBuf::with_capacity(capacity, alloc)?;
        // SAFETY: the destination was just allocated with room for
        // `capacity >= bytes.len()` content bytes, and cannot overlap `bytes`
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), new.ptr.as_ptr(), bytes.len());
            new.set_len(bytes.len());
        }
        Ok(new)
    }

    /// Assembles a heap buffer from a block the caller already owns.
    ///
    /// # Safety
    /// * `ptr` must denote a live block of `cap + 1` bytes freeable by the
    ///   owning buffer's allocator
    /// * the bytes at `..len` must be initialized and `len <= cap`
    #[inline]
    pub unsafe fn from_raw_parts(ptr: ptr::NonNull<u8>, len: usize, cap: usize) -> Self {
        let mut new = HeapBuf { ptr, len, cap };
        new.set_len(len);
        new
    }

    /// Releases the block. The buffer must not be used afterwards.
    ///
    /// # Safety
    /// * `alloc` must compare equal to the allocator the block came from
    #[inline]
    pub unsafe fn dealloc<A: Alloc>(&mut self, alloc: &A) {
        alloc.deallocate(self.ptr, self.cap + 1);
    }

    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `..len` is initialized while the block is live
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The content plus the trailing NUL.
    #[inline]
    pub fn as_slice_with_nul(&self) -> &[u8] {
        // SAFETY: the terminator slot at `len` is initialized by `set_len`
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len + 1) }
    }

    /// Sets the logical length and rewrites the terminator.
    ///
    /// # Safety
    /// * `len` must be at most `capacity()`
    /// * the bytes at `..len` must be initialized
    #[inline]
    pub unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.cap);

        self.len = len;
        self.ptr.as_ptr().add(len).write(0);
    }
}

impl fmt::Debug for HeapBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}
