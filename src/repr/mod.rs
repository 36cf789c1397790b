use core::mem;
use core::ops::Range;
use core::ptr;

use crate::alloc::Alloc;
use crate::Error;

pub(crate) mod heap;
mod inline;

pub use inline::INLINE_CAP;

use heap::HeapBuf;
use inline::InlineBuf;

/// The structural maximum length for a buffer using `alloc`.
///
/// Half the allocator's largest block, minus one, which leaves headroom for
/// signed difference arithmetic on positions and for the terminator slot.
/// Saturates to zero for allocators whose largest block is below two bytes,
/// so such an allocator rejects every edit instead of wrapping the bound.
#[inline]
pub(crate) fn max_size<A: Alloc>(alloc: &A) -> usize {
    (alloc.max_allocation_size() / 2).saturating_sub(1)
}

/// Where the bytes of a region edit come from.
///
/// A [`Src::Borrowed`] slice can never alias the buffer's own storage (the
/// borrow checker forbids holding it together with `&mut` access), so the
/// funnel takes the simple disjoint path. [`Src::Within`] names a sub-range
/// of the buffer's current content and routes through the overlap-aware
/// path, with all addresses resolved against the pre-edit storage.
#[derive(Debug)]
pub(crate) enum Src<'a> {
    Borrowed(&'a [u8]),
    Within(Range<usize>),
}

impl Src<'_> {
    #[inline]
    fn len(&self) -> usize {
        match self {
            Src::Borrowed(slice) => slice.len(),
            Src::Within(range) => range.end - range.start,
        }
    }
}

/// The storage of a buffer: either the fixed inline region or a heap block.
///
/// All length-changing edits funnel through [`Repr::replace_region`]. The
/// allocator is not stored here; every operation that may (de)allocate
/// receives it from the owning `CompactBuf`.
#[derive(Debug)]
pub(crate) enum Repr {
    Inline(InlineBuf),
    Heap(HeapBuf),
}

impl Repr {
    #[inline]
    pub const fn empty() -> Self {
        Repr::Inline(InlineBuf::empty())
    }

    pub fn from_slice<A: Alloc>(
        bytes: &[u8],
        op: &'static str,
        alloc: &A,
    ) -> Result<Self, Error> {
        if bytes.len() <= INLINE_CAP {
            Ok(Repr::Inline(InlineBuf::new(bytes)))
        } else {
            let max_size = max_size(alloc);
            if bytes.len() > max_size {
                return Err(Error::LengthExceeded {
                    op,
                    required: bytes.len(),
                    max_size,
                });
            }
            Ok(Repr::Heap(HeapBuf::from_slice(bytes, bytes.len(), alloc)?))
        }
    }

    pub fn with_capacity<A: Alloc>(
        capacity: usize,
        op: &'static str,
        alloc: &A,
    ) -> Result<Self, Error> {
        if capacity <= INLINE_CAP {
            Ok(Repr::empty())
        } else {
            let max_size = max_size(alloc);
            if capacity > max_size {
                return Err(Error::LengthExceeded {
                    op,
                    required: capacity,
                    max_size,
                });
            }
            Ok(Repr::Heap(HeapBuf::with_capacity(capacity, alloc)?))
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            Repr::Inline(inline) => inline.len(),
            Repr::Heap(heap) => heap.len(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        match self {
            Repr::Inline(inline) => inline.capacity(),
            Repr::Heap(heap) => heap.capacity(),
        }
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self, Repr::Inline(_))
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            Repr::Inline(inline) => inline.as_ptr(),
            Repr::Heap(heap) => heap.as_ptr(),
        }
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            Repr::Inline(inline) => inline.as_mut_ptr(),
            Repr::Heap(heap) => heap.as_mut_ptr(),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Repr::Inline(inline) => inline.as_slice(),
            Repr::Heap(heap) => heap.as_slice(),
        }
    }

    #[inline]
    pub fn as_slice_with_nul(&self) -> &[u8] {
        match self {
            Repr::Inline(inline) => inline.as_slice_with_nul(),
            Repr::Heap(heap) => heap.as_slice_with_nul(),
        }
    }

    /// Sets the logical length within the current storage and rewrites the
    /// terminator.
    ///
    /// # Safety
    /// * `len` must be at most `capacity()`
    /// * the bytes at `..len` must be initialized
    #[inline]
    pub unsafe fn set_len(&mut self, len: usize) {
        match self {
            Repr::Inline(inline) => inline.set_len(len),
            Repr::Heap(heap) => heap.set_len(len),
        }
    }

    /// Swaps in freshly-allocated heap storage, freeing the old block.
    #[inline]
    fn install<A: Alloc>(&mut self, new: HeapBuf, alloc: &A) {
        let old = mem::replace(self, Repr::Heap(new));
        if let Repr::Heap(mut heap) = old {
            // SAFETY: the block was allocated by `alloc` (or an equal
            // instance) and is no longer reachable from `self`
            unsafe { heap.dealloc(alloc) };
        }
    }

    /// Grows storage to at least `capacity` content slots, exactly.
    ///
    /// A no-op when current storage already suffices; shrink requests are
    /// non-binding hints and go through [`Repr::shrink_to_fit`] instead.
    pub fn reserve<A: Alloc>(
        &mut self,
        capacity: usize,
        op: &'static str,
        alloc: &A,
    ) -> Result<(), Error> {
        if capacity <= self.capacity() {
            return Ok(());
        }

        let max_size = max_size(alloc);
        if capacity > max_size {
            return Err(Error::LengthExceeded {
                op,
                required: capacity,
                max_size,
            });
        }

        let new = HeapBuf::from_slice(self.as_slice(), capacity, alloc)?;
        self.install(new, alloc);
        Ok(())
    }

    /// Grows storage to hold `required` content bytes, over-allocating so
    /// that repeated single-byte appends reallocate O(log n) times.
    pub fn reserve_amortized<A: Alloc>(
        &mut self,
        required: usize,
        op: &'static str,
        alloc: &A,
    ) -> Result<(), Error> {
        if required <= self.capacity() {
            return Ok(());
        }

        let max_size = max_size(alloc);
        if required > max_size {
            return Err(Error::LengthExceeded {
                op,
                required,
                max_size,
            });
        }

        let len = self.len();
        let amortized = len + len / 2;
        let capacity = required.max(amortized).min(max_size);

        let new = HeapBuf::from_slice(self.as_slice(), capacity, alloc)?;
        self.install(new, alloc);
        Ok(())
    }

    /// Attempts one reallocation down to exactly `len()` content slots,
    /// demoting to inline storage when the content fits there.
    ///
    /// Allocation failure is swallowed and current storage kept: the shrink
    /// request is a non-binding hint by contract.
    pub fn shrink_to_fit<A: Alloc>(&mut self, alloc: &A) {
        let Repr::Heap(heap) = self else { return };

        let len = heap.len();
        if len <= INLINE_CAP {
            let inline = InlineBuf::new(heap.as_slice());
            // SAFETY: the heap block is unreachable once we overwrite `self`
            unsafe { heap.dealloc(alloc) };
            *self = Repr::Inline(inline);
        } else if len < heap.capacity() {
            if let Ok(new) = HeapBuf::from_slice(heap.as_slice(), len, alloc) {
                // SAFETY: as above
                unsafe { heap.dealloc(alloc) };
                *self = Repr::Heap(new);
            }
        }
    }

    /// The single mutation funnel: replaces the content region
    /// `[pos, pos + old_len)` with the bytes named by `src`.
    ///
    /// `old_len` is clamped to the available run `len() - pos`. All
    /// validation and capacity planning happens before the first byte moves,
    /// so a failure leaves the buffer untouched with no rollback needed.
    pub fn replace_region<A: Alloc>(
        &mut self,
        pos: usize,
        old_len: usize,
        src: Src<'_>,
        op: &'static str,
        alloc: &A,
    ) -> Result<(), Error> {
        let len = self.len();
        if pos > len {
            return Err(Error::OutOfRange { op, pos, len });
        }
        if let Src::Within(range) = &src {
            if range.start > range.end || range.end > len {
                return Err(Error::OutOfRange {
                    op,
                    pos: range.end,
                    len,
                });
            }
        }

        let old_len = old_len.min(len - pos);
        let src_len = src.len();
        let new_len = len - old_len + src_len;

        let max_size = max_size(alloc);
        if new_len > max_size {
            return Err(Error::LengthExceeded {
                op,
                required: new_len,
                max_size,
            });
        }

        let tail = len - pos - old_len;

        if new_len > self.capacity() {
            // Relocation path: assemble the result in a fresh block while
            // the old storage, and any source range inside it, is still live.
            // The old block is freed only after the copy completes.
            let amortized = len + len / 2;
            let capacity = new_len.max(amortized).min(max_size);
            let mut new = HeapBuf::with_capacity(capacity, alloc)?;

            let old_data = self.as_ptr();
            let src_ptr = match &src {
                Src::Borrowed(slice) => slice.as_ptr(),
                Src::Within(range) => {
                    // SAFETY: `range` was bounds-checked against `len` above
                    unsafe { old_data.add(range.start) }
                }
            };

            // SAFETY: `new` holds at least `new_len` content slots and does
            // not overlap the old storage; the three source runs are all
            // within the old block (or a disjoint borrowed slice)
            unsafe {
                let dst = new.as_mut_ptr();
                ptr::copy_nonoverlapping(old_data, dst, pos);
                ptr::copy_nonoverlapping(src_ptr, dst.add(pos), src_len);
                ptr::copy_nonoverlapping(
                    old_data.add(pos + old_len),
                    dst.add(pos + src_len),
                    tail,
                );
                new.set_len(new_len);
            }

            self.install(new, alloc);
            return Ok(());
        }

        // In-place path. Addresses are derived from one pointer so the
        // source stays valid while the tail shifts.
        let data = self.as_mut_ptr();
        // SAFETY: `pos <= len <= capacity`
        let p = unsafe { data.add(pos) };

        match src {
            Src::Borrowed(slice) => {
                // SAFETY: `slice` cannot alias our storage, so the only
                // overlapping move is the tail shift
                unsafe {
                    if tail > 0 && old_len != src_len {
                        ptr::copy(p.add(old_len), p.add(src_len), tail);
                    }
                    if src_len > 0 {
                        ptr::copy_nonoverlapping(slice.as_ptr(), p, src_len);
                    }
                }
            }
            Src::Within(range) => {
                // SAFETY: every address below lies within `..=capacity` of
                // our own storage; `ptr::copy` tolerates the overlaps
                unsafe {
                    let s = data.add(range.start) as *const u8;

                    if src_len > 0 && src_len <= old_len {
                        // the whole source fits inside the replaced region
                        // before anything shifts
                        ptr::copy(s, p, src_len);
                    }
                    if tail > 0 && old_len != src_len {
                        ptr::copy(p.add(old_len), p.add(src_len), tail);
                    }
                    if src_len > old_len {
                        if s.add(src_len) <= p.add(old_len) as *const u8 {
                            // source sits wholly before the region; the tail
                            // shift never touched it
                            ptr::copy(s, p, src_len);
                        } else if s >= p.add(old_len) as *const u8 {
                            // source sat wholly behind the region; the shift
                            // moved it forward by `src_len - old_len`
                            let off = (s as usize - p as usize) + (src_len - old_len);
                            ptr::copy(p.add(off), p, src_len);
                        } else {
                            // source straddles the region's end: its head is
                            // still in place, its tail moved with the shift
                            let head = p.add(old_len) as usize - s as usize;
                            ptr::copy(s, p, head);
                            ptr::copy(p.add(src_len), p.add(head), src_len - head);
                        }
                    }
                }
            }
        }

        // SAFETY: `new_len <= capacity` was established above, and every
        // byte at `..new_len` was just written or carried over
        unsafe { self.set_len(new_len) };
        Ok(())
    }

    /// Appends a single byte, skipping the general funnel.
    pub fn push<A: Alloc>(
        &mut self,
        byte: u8,
        op: &'static str,
        alloc: &A,
    ) -> Result<(), Error> {
        let len = self.len();
        if len == self.capacity() {
            self.reserve_amortized(len + 1, op, alloc)?;
        }

        // SAFETY: capacity now exceeds `len`, and the byte at `len` is
        // initialized by the write
        unsafe {
            self.as_mut_ptr().add(len).write(byte);
            self.set_len(len + 1);
        }
        Ok(())
    }

    /// Removes and returns the last byte, if any. Never reallocates.
    pub fn pop(&mut self) -> Option<u8> {
        let len = self.len();
        if len == 0 {
            return None;
        }

        let byte = self.as_slice()[len - 1];
        // SAFETY: `len - 1` shortens within initialized content
        unsafe { self.set_len(len - 1) };
        Some(byte)
    }

    /// Grows the content to exactly `new_len` bytes, padding with `fill`.
    ///
    /// Truncation is handled by the caller; `new_len` is at least `len()`.
    pub fn extend_with<A: Alloc>(
        &mut self,
        new_len: usize,
        fill: u8,
        op: &'static str,
        alloc: &A,
    ) -> Result<(), Error> {
        let len = self.len();
        debug_assert!(new_len >= len);

        if new_len > self.capacity() {
            self.reserve_amortized(new_len, op, alloc)?;
        }

        // SAFETY: capacity covers `new_len`, and the pad run initializes
        // every byte between the old and new lengths
        unsafe {
            ptr::write_bytes(self.as_mut_ptr().add(len), fill, new_len - len);
            self.set_len(new_len);
        }
        Ok(())
    }
}
