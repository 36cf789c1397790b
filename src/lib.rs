#![doc = include_str!("../README.md")]

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FromIterator;
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut, Range};
use core::ptr::NonNull;

use bstr::BStr;

mod alloc;
mod error;
mod find;
mod repr;

pub use alloc::{Alloc, Global};
pub use error::Error;
pub use find::NPOS;
pub use repr::INLINE_CAP;

use repr::{Repr, Src};

#[cfg(test)]
mod tests;

/// A [`CompactBuf`] is a growable, contiguous, always-NUL-terminated byte
/// buffer that stores short content inline.
///
/// Content of up to [`INLINE_CAP`] bytes lives directly inside the value;
/// longer content is moved to a heap block obtained through the buffer's
/// allocator. The switch is transparent: length, capacity, and the byte
/// slice views behave identically either way, and the byte one past the
/// content is always `0`, so [`as_ptr`] can be handed to NUL-terminated
/// consumers.
///
/// ```
/// use compact_buf::CompactBuf;
///
/// let mut buf = CompactBuf::from_slice(b"hello").unwrap();
/// assert!(buf.is_inline());
///
/// buf.append(b", world! this no longer fits inline").unwrap();
/// assert!(!buf.is_inline());
/// assert_eq!(&buf[..5], b"hello");
/// ```
///
/// # Errors
///
/// Mutating operations validate positions and plan capacity before touching
/// a single byte, so any [`Error`] they return leaves the buffer exactly as
/// it was. Allocation failure is reported the same way; only the non-binding
/// [`shrink_to_fit`] hint swallows it.
///
/// # Pointer and iterator validity
///
/// Any pointer obtained from [`as_ptr`] is invalidated by an operation that
/// may reallocate or shift storage. Safe callers don't need to track this:
/// borrows returned by [`as_slice`] or iteration hold `&self`, so the borrow
/// checker rejects exactly the accesses the invalidation contract forbids.
///
/// # Concurrency
///
/// A buffer owns its storage exclusively; two instances never share memory.
/// A single instance is not internally synchronized, and mutation demands
/// `&mut self`; `CompactBuf` is `Send + Sync` for `Send + Sync` allocators.
///
/// [`as_ptr`]: CompactBuf::as_ptr
/// [`as_slice`]: CompactBuf::as_slice
/// [`shrink_to_fit`]: CompactBuf::shrink_to_fit
pub struct CompactBuf<A: Alloc = Global> {
    repr: Repr,
    alloc: A,
}

impl CompactBuf {
    /// Creates a new empty [`CompactBuf`] in inline storage, using the
    /// process-wide allocator. Never allocates.
    ///
    /// ```
    /// use compact_buf::{CompactBuf, INLINE_CAP};
    ///
    /// let buf = CompactBuf::new();
    /// assert!(buf.is_empty());
    /// assert!(buf.is_inline());
    /// assert_eq!(buf.capacity(), INLINE_CAP);
    /// ```
    #[inline]
    pub const fn new() -> Self {
        CompactBuf {
            repr: Repr::empty(),
            alloc: Global,
        }
    }

    /// Creates a [`CompactBuf`] holding a copy of `bytes`.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let short = CompactBuf::from_slice(b"inline me").unwrap();
    /// assert!(short.is_inline());
    ///
    /// let long = CompactBuf::from_slice(b"long enough to require a heap block").unwrap();
    /// assert!(!long.is_inline());
    /// ```
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        CompactBuf::from_slice_in(bytes, Global)
    }

    /// Creates a [`CompactBuf`] of `count` copies of `byte`.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let buf = CompactBuf::from_elem(b'-', 4).unwrap();
    /// assert_eq!(buf.as_slice(), b"----");
    /// ```
    #[inline]
    pub fn from_elem(byte: u8, count: usize) -> Result<Self, Error> {
        CompactBuf::from_elem_in(byte, count, Global)
    }

    /// Creates an empty [`CompactBuf`] with room for at least `capacity`
    /// bytes before reallocating.
    ///
    /// A capacity of up to [`INLINE_CAP`] stays in inline storage, so the
    /// effective minimum capacity is [`INLINE_CAP`].
    ///
    /// ```
    /// use compact_buf::{CompactBuf, INLINE_CAP};
    ///
    /// let empty = CompactBuf::with_capacity(0).unwrap();
    /// assert_eq!(empty.capacity(), INLINE_CAP);
    /// assert!(empty.is_inline());
    ///
    /// let bigger = CompactBuf::with_capacity(100).unwrap();
    /// assert_eq!(bigger.capacity(), 100);
    /// assert!(!bigger.is_inline());
    /// ```
    #[inline]
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        CompactBuf::with_capacity_in(capacity, Global)
    }
}

impl<A: Alloc> CompactBuf<A> {
    /// Creates a new empty [`CompactBuf`] that performs all heap activity
    /// through `alloc`.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        CompactBuf {
            repr: Repr::empty(),
            alloc,
        }
    }

    /// [`CompactBuf::from_slice`], but in the given allocator.
    #[inline]
    pub fn from_slice_in(bytes: &[u8], alloc: A) -> Result<Self, Error> {
        let repr = Repr::from_slice(bytes, "from_slice", &alloc)?;
        Ok(CompactBuf { repr, alloc })
    }

    /// [`CompactBuf::from_elem`], but in the given allocator.
    pub fn from_elem_in(byte: u8, count: usize, alloc: A) -> Result<Self, Error> {
        let mut buf = CompactBuf::new_in(alloc);
        buf.repr.extend_with(count, byte, "from_elem", &buf.alloc)?;
        Ok(buf)
    }

    /// [`CompactBuf::with_capacity`], but in the given allocator.
    #[inline]
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, Error> {
        let repr = Repr::with_capacity(capacity, "with_capacity", &alloc)?;
        Ok(CompactBuf { repr, alloc })
    }

    /// Returns the length of the content in bytes, excluding the terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.repr.len()
    }

    /// Returns `true` if the buffer holds no content.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of content bytes the buffer can hold before the
    /// next reallocation. At least [`INLINE_CAP`].
    #[inline]
    pub fn capacity(&self) -> usize {
        self.repr.capacity()
    }

    /// Returns whether the content currently lives in the inline region
    /// rather than on the heap.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.repr.is_inline()
    }

    /// The structural maximum length, derived from the allocator's largest
    /// block: half of it, minus one, leaving headroom for signed position
    /// arithmetic.
    #[inline]
    pub fn max_size(&self) -> usize {
        repr::max_size(&self.alloc)
    }

    /// Returns a reference to the buffer's allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns the content as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.repr.as_slice()
    }

    /// Returns the content as a mutable byte slice.
    ///
    /// The terminator is not part of the slice, so no write through it can
    /// break the terminator invariant.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len();
        // SAFETY: `..len` is initialized content
        unsafe { core::slice::from_raw_parts_mut(self.repr.as_mut_ptr(), len) }
    }

    /// Returns the content plus the trailing NUL byte.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let buf = CompactBuf::from_slice(b"abc").unwrap();
    /// assert_eq!(buf.as_slice_with_nul(), b"abc\0");
    /// ```
    #[inline]
    pub fn as_slice_with_nul(&self) -> &[u8] {
        self.repr.as_slice_with_nul()
    }

    /// Returns a raw pointer to the first content byte.
    ///
    /// The pointee is NUL-terminated at `len()`. The pointer is invalidated
    /// by any operation that may reallocate or shift storage.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.repr.as_ptr()
    }

    /// Returns a mutable raw pointer to the first content byte.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.repr.as_mut_ptr()
    }

    /// Forces the length of the content to `new_len`, rewriting the
    /// terminator there.
    ///
    /// # Safety
    /// * `new_len` must be at most `capacity()`
    /// * the bytes at `..new_len` must be initialized
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        self.repr.set_len(new_len)
    }

    /// Ensures capacity for at least `capacity` content bytes.
    ///
    /// Requests smaller than the current capacity are non-binding hints and
    /// do nothing ([`shrink_to_fit`] is the explicit way down). On success,
    /// existing content and terminator are preserved in the new storage.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"abc").unwrap();
    /// buf.reserve(200).unwrap();
    /// assert!(buf.capacity() >= 200);
    /// assert_eq!(buf.as_slice(), b"abc");
    /// ```
    ///
    /// [`shrink_to_fit`]: CompactBuf::shrink_to_fit
    #[inline]
    pub fn reserve(&mut self, capacity: usize) -> Result<(), Error> {
        self.repr.reserve(capacity, "reserve", &self.alloc)
    }

    /// Ensures capacity for at least `additional` more content bytes,
    /// over-allocating with the amortized growth policy.
    #[inline]
    pub fn reserve_additional(&mut self, additional: usize) -> Result<(), Error> {
        let required = self.len().saturating_add(additional);
        self.repr
            .reserve_amortized(required, "reserve_additional", &self.alloc)
    }

    /// Attempts one reallocation down to exactly `len()` bytes, dropping
    /// back to inline storage when the content fits there.
    ///
    /// The request is a non-binding hint: if the smaller allocation fails,
    /// current storage is silently kept.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::with_capacity(100).unwrap();
    /// buf.append(b"short").unwrap();
    ///
    /// buf.shrink_to_fit();
    /// assert!(buf.is_inline());
    /// assert_eq!(buf.as_slice(), b"short");
    /// ```
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.repr.shrink_to_fit(&self.alloc);
    }

    /// Replaces the content region `[pos, pos + old_len)` with `src`.
    ///
    /// This is the funnel every other edit reduces to. `old_len` is clamped
    /// to the available run; `pos` past the end is an error. On any error
    /// the buffer is untouched.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"hello, world!").unwrap();
    /// buf.replace_region(7, 5, b"compact_buf").unwrap();
    /// assert_eq!(buf.as_slice(), b"hello, compact_buf!");
    /// ```
    #[inline]
    pub fn replace_region(&mut self, pos: usize, old_len: usize, src: &[u8]) -> Result<(), Error> {
        self.repr.replace_region(
            pos,
            old_len,
            Src::Borrowed(src),
            "replace_region",
            &self.alloc,
        )
    }

    /// Appends `bytes` to the end of the buffer.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.repr.replace_region(
            self.repr.len(),
            0,
            Src::Borrowed(bytes),
            "append",
            &self.alloc,
        )
    }

    /// Inserts `bytes` at position `pos`, shifting everything after it.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"ad").unwrap();
    /// buf.insert(1, b"bc").unwrap();
    /// assert_eq!(buf.as_slice(), b"abcd");
    /// ```
    #[inline]
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) -> Result<(), Error> {
        self.repr
            .replace_region(pos, 0, Src::Borrowed(bytes), "insert", &self.alloc)
    }

    /// Inserts a copy of the buffer's own `src` range at position `pos`.
    ///
    /// This is the self-aliasing form of [`insert`] that the borrow checker
    /// would otherwise forbid (compare [`slice::copy_within`]). Source
    /// positions refer to the content as it is before the call.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"ab").unwrap();
    /// buf.insert_within(1, 0..2).unwrap();
    /// assert_eq!(buf.as_slice(), b"aabb");
    /// ```
    ///
    /// [`insert`]: CompactBuf::insert
    #[inline]
    pub fn insert_within(&mut self, pos: usize, src: Range<usize>) -> Result<(), Error> {
        self.repr
            .replace_region(pos, 0, Src::Within(src), "insert_within", &self.alloc)
    }

    /// Removes the content region `[pos, pos + count)`.
    ///
    /// `count` is clamped to the available run. Deleting a trailing run
    /// takes a length-only fast path that simply truncates.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"abcdef").unwrap();
    /// buf.erase(1, 2).unwrap();
    /// assert_eq!(buf.as_slice(), b"adef");
    ///
    /// buf.erase(2, 100).unwrap();
    /// assert_eq!(buf.as_slice(), b"ad");
    /// ```
    pub fn erase(&mut self, pos: usize, count: usize) -> Result<(), Error> {
        let len = self.len();
        if pos > len {
            return Err(Error::OutOfRange {
                op: "erase",
                pos,
                len,
            });
        }

        let count = count.min(len - pos);
        if pos + count == len {
            // trailing run: no bytes need to move
            // SAFETY: `pos <= len`, shortening within initialized content
            unsafe { self.repr.set_len(pos) };
            return Ok(());
        }

        self.repr
            .replace_region(pos, count, Src::Borrowed(b""), "erase", &self.alloc)
    }

    /// Replaces the content region `[pos, pos + old_len)` with `bytes`.
    /// Synonym of [`replace_region`] under the conventional name.
    ///
    /// [`replace_region`]: CompactBuf::replace_region
    #[inline]
    pub fn replace(&mut self, pos: usize, old_len: usize, bytes: &[u8]) -> Result<(), Error> {
        self.repr
            .replace_region(pos, old_len, Src::Borrowed(bytes), "replace", &self.alloc)
    }

    /// Replaces the region `[pos, pos + old_len)` with a copy of the
    /// buffer's own `src` range, the self-aliasing form of [`replace`].
    ///
    /// [`replace`]: CompactBuf::replace
    #[inline]
    pub fn replace_within(
        &mut self,
        pos: usize,
        old_len: usize,
        src: Range<usize>,
    ) -> Result<(), Error> {
        self.repr
            .replace_region(pos, old_len, Src::Within(src), "replace_within", &self.alloc)
    }

    /// Replaces the whole content with `bytes`, reusing current storage
    /// when its capacity suffices.
    #[inline]
    pub fn assign(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.repr
            .replace_region(0, self.repr.len(), Src::Borrowed(bytes), "assign", &self.alloc)
    }

    /// Appends a single byte, via a fast path that skips the general
    /// region machinery.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), Error> {
        self.repr.push(byte, "push", &self.alloc)
    }

    /// Removes and returns the last content byte. Never reallocates.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"ab").unwrap();
    /// assert_eq!(buf.pop(), Some(b'b'));
    /// assert_eq!(buf.pop(), Some(b'a'));
    /// assert_eq!(buf.pop(), None);
    /// ```
    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        self.repr.pop()
    }

    /// Grows or shrinks the content to exactly `new_len` bytes, padding
    /// with `fill` when growing.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"ab").unwrap();
    /// buf.resize(4, b'!').unwrap();
    /// assert_eq!(buf.as_slice(), b"ab!!");
    ///
    /// buf.resize(1, b'!').unwrap();
    /// assert_eq!(buf.as_slice(), b"a");
    /// ```
    pub fn resize(&mut self, new_len: usize, fill: u8) -> Result<(), Error> {
        if new_len <= self.len() {
            self.truncate(new_len);
            Ok(())
        } else {
            self.repr.extend_with(new_len, fill, "resize", &self.alloc)
        }
    }

    /// Shortens the content to `new_len` bytes. A no-op when the content is
    /// already that short; never changes capacity.
    #[inline]
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len() {
            // SAFETY: shortening within initialized content
            unsafe { self.repr.set_len(new_len) };
        }
    }

    /// Empties the buffer. Never changes capacity.
    #[inline]
    pub fn clear(&mut self) {
        // SAFETY: zero is always a valid length
        unsafe { self.repr.set_len(0) };
    }

    /// Moves the buffer out, leaving `self` empty in inline storage.
    ///
    /// A heap block transfers by pointer, so this is O(1) for heap-backed
    /// buffers and a short copy for inline ones.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut buf = CompactBuf::from_slice(b"some heap-backed content here").unwrap();
    /// let moved = buf.take();
    ///
    /// assert_eq!(moved.as_slice(), b"some heap-backed content here");
    /// assert!(buf.is_empty());
    /// assert!(buf.is_inline());
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        let repr = mem::replace(&mut self.repr, Repr::empty());
        CompactBuf {
            repr,
            alloc: self.alloc.clone(),
        }
    }

    /// Takes the content of `src`, leaving it empty.
    ///
    /// When `src` is heap-backed and the two allocators compare equal, the
    /// storage itself is adopted in O(1): this buffer's own heap block (if
    /// any) is freed with its own allocator first, and `src`'s pointer and
    /// capacity move over unchanged. Otherwise the transfer degrades to a
    /// deep copy of the bytes, because a borrowed block must stay with the
    /// allocator that can free it.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let mut src = CompactBuf::from_slice(b"a heap-backed buffer to move").unwrap();
    /// let addr = src.as_ptr();
    ///
    /// let mut dst = CompactBuf::new();
    /// dst.transfer_from(&mut src).unwrap();
    ///
    /// assert_eq!(dst.as_ptr(), addr); // adopted, not copied
    /// assert!(src.is_empty() && src.is_inline());
    /// ```
    pub fn transfer_from(&mut self, src: &mut Self) -> Result<(), Error> {
        if matches!(src.repr, Repr::Heap(_)) && self.alloc == src.alloc {
            let adopted = mem::replace(&mut src.repr, Repr::empty());
            self.install_repr(adopted);
            Ok(())
        } else {
            self.assign(src.as_slice())?;
            src.clear();
            Ok(())
        }
    }

    /// Swaps in new storage, releasing the old heap block through our own
    /// allocator.
    fn install_repr(&mut self, new: Repr) {
        let old = mem::replace(&mut self.repr, new);
        if let Repr::Heap(mut heap) = old {
            // SAFETY: the block came from an allocator equal to ours and is
            // no longer reachable
            unsafe { heap.dealloc(&self.alloc) };
        }
    }

    /// First occurrence of `needle` at a position `>= pos`, or [`NPOS`].
    ///
    /// An empty needle matches at `pos` whenever `pos <= len()`.
    ///
    /// ```
    /// use compact_buf::{CompactBuf, NPOS};
    ///
    /// let buf = CompactBuf::from_slice(b"one two two").unwrap();
    /// assert_eq!(buf.find(b"two", 0), 4);
    /// assert_eq!(buf.find(b"two", 5), 8);
    /// assert_eq!(buf.find(b"three", 0), NPOS);
    /// ```
    #[inline]
    pub fn find(&self, needle: &[u8], pos: usize) -> usize {
        find::find(self.as_slice(), needle, pos)
    }

    /// Last occurrence of `needle` starting at a position `<= pos`, or
    /// [`NPOS`]. Pass [`NPOS`] as `pos` to search the whole content.
    #[inline]
    pub fn rfind(&self, needle: &[u8], pos: usize) -> usize {
        find::rfind(self.as_slice(), needle, pos)
    }

    /// First occurrence of `byte` at a position `>= pos`, or [`NPOS`].
    #[inline]
    pub fn find_byte(&self, byte: u8, pos: usize) -> usize {
        find::find_byte(self.as_slice(), byte, pos)
    }

    /// Last occurrence of `byte` at a position `<= pos`, or [`NPOS`].
    #[inline]
    pub fn rfind_byte(&self, byte: u8, pos: usize) -> usize {
        find::rfind_byte(self.as_slice(), byte, pos)
    }

    /// First position `>= pos` holding any byte of `set`, or [`NPOS`].
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let buf = CompactBuf::from_slice(b"key = value").unwrap();
    /// assert_eq!(buf.find_first_of(b"=:", 0), 4);
    /// ```
    #[inline]
    pub fn find_first_of(&self, set: &[u8], pos: usize) -> usize {
        find::find_first_of(self.as_slice(), set, pos)
    }

    /// Last position `<= pos` holding any byte of `set`, or [`NPOS`].
    #[inline]
    pub fn find_last_of(&self, set: &[u8], pos: usize) -> usize {
        find::find_last_of(self.as_slice(), set, pos)
    }

    /// First position `>= pos` holding a byte outside `set`, or [`NPOS`].
    #[inline]
    pub fn find_first_not_of(&self, set: &[u8], pos: usize) -> usize {
        find::find_first_not_of(self.as_slice(), set, pos)
    }

    /// Last position `<= pos` holding a byte outside `set`, or [`NPOS`].
    #[inline]
    pub fn find_last_not_of(&self, set: &[u8], pos: usize) -> usize {
        find::find_last_not_of(self.as_slice(), set, pos)
    }

    /// Three-way lexicographic comparison against `other`.
    ///
    /// Bytes are compared over the common prefix; a tie is broken in favor
    /// of the shorter operand. The magnitude is a clamped byte or length
    /// difference: depend only on the sign.
    ///
    /// ```
    /// use compact_buf::CompactBuf;
    ///
    /// let buf = CompactBuf::from_slice(b"abc").unwrap();
    /// assert!(buf.compare(b"abd") < 0);
    /// assert!(buf.compare(b"ab") > 0);
    /// assert_eq!(buf.compare(b"abc"), 0);
    /// ```
    pub fn compare(&self, other: &[u8]) -> i32 {
        let lhs = self.as_slice();
        let common = lhs.len().min(other.len());

        for i in 0..common {
            let diff = i32::from(lhs[i]) - i32::from(other[i]);
            if diff != 0 {
                return diff;
            }
        }

        // lengths are bounded by isize::MAX, so the difference fits an i64
        let diff = lhs.len() as i64 - other.len() as i64;
        diff.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

#[cold]
#[inline(never)]
fn alloc_failure(err: Error) -> ! {
    panic!("{err}");
}

/// Unwraps operations surfaced through infallible std traits, where the
/// documented behavior on allocator exhaustion is a panic.
fn unwrap_alloc<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => alloc_failure(err),
    }
}

impl<A: Alloc> Drop for CompactBuf<A> {
    fn drop(&mut self) {
        if let Repr::Heap(heap) = &mut self.repr {
            // SAFETY: the block came from `self.alloc` (or an equal
            // instance) and the buffer is going away
            unsafe { heap.dealloc(&self.alloc) };
        }
    }
}

impl<A: Alloc + Clone> Clone for CompactBuf<A> {
    fn clone(&self) -> Self {
        let repr = unwrap_alloc(Repr::from_slice(self.as_slice(), "clone", &self.alloc));
        CompactBuf {
            repr,
            alloc: self.alloc.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // reuses existing capacity when it suffices
        unwrap_alloc(self.assign(source.as_slice()));
    }
}

impl<A: Alloc + Default> Default for CompactBuf<A> {
    #[inline]
    fn default() -> Self {
        CompactBuf::new_in(A::default())
    }
}

impl<A: Alloc> Deref for CompactBuf<A> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<A: Alloc> DerefMut for CompactBuf<A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl<A: Alloc> AsRef<[u8]> for CompactBuf<A> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<A: Alloc> Borrow<[u8]> for CompactBuf<A> {
    #[inline]
    fn borrow(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<A: Alloc> Eq for CompactBuf<A> {}

impl<A: Alloc, T: AsRef<[u8]>> PartialEq<T> for CompactBuf<A> {
    fn eq(&self, other: &T) -> bool {
        let (lhs, rhs) = (self.as_slice(), other.as_ref());
        // equal length first: cheaper than a general three-way compare
        lhs.len() == rhs.len() && lhs == rhs
    }
}

impl<A: Alloc> PartialEq<CompactBuf<A>> for &[u8] {
    fn eq(&self, other: &CompactBuf<A>) -> bool {
        *self == other.as_slice()
    }
}

impl<A: Alloc> PartialEq<CompactBuf<A>> for Vec<u8> {
    fn eq(&self, other: &CompactBuf<A>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<A: Alloc> PartialEq<CompactBuf<A>> for &str {
    fn eq(&self, other: &CompactBuf<A>) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

impl<A: Alloc> Ord for CompactBuf<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<A: Alloc> PartialOrd for CompactBuf<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Alloc> Hash for CompactBuf<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<'a> From<&'a [u8]> for CompactBuf {
    fn from(bytes: &'a [u8]) -> Self {
        unwrap_alloc(CompactBuf::from_slice(bytes))
    }
}

impl<'a> From<&'a str> for CompactBuf {
    fn from(s: &'a str) -> Self {
        unwrap_alloc(CompactBuf::from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for CompactBuf {
    /// Adopts the vector's storage when possible: the content is too long
    /// to inline and the vector has spare capacity for the terminator.
    /// Otherwise the bytes are copied.
    fn from(vec: Vec<u8>) -> Self {
        if vec.len() > INLINE_CAP && vec.capacity() > vec.len() {
            let mut vec = ManuallyDrop::new(vec);
            let (len, cap) = (vec.len(), vec.capacity() - 1);
            let ptr = NonNull::new(vec.as_mut_ptr()).expect("vec with capacity has null ptr?");

            // SAFETY: the block is `cap + 1` bytes from the global allocator,
            // `len <= cap`, and the spare slot takes the terminator
            let heap = unsafe { repr::heap::HeapBuf::from_raw_parts(ptr, len, cap) };
            CompactBuf {
                repr: Repr::Heap(heap),
                alloc: Global,
            }
        } else {
            unwrap_alloc(CompactBuf::from_slice(&vec))
        }
    }
}

impl From<CompactBuf> for Vec<u8> {
    fn from(buf: CompactBuf) -> Self {
        let mut buf = ManuallyDrop::new(buf);
        match &mut buf.repr {
            Repr::Inline(_) => buf.repr.as_slice().to_vec(),
            Repr::Heap(heap) => {
                // SAFETY: the block is `capacity + 1` bytes from the global
                // allocator; `ManuallyDrop` keeps our Drop from freeing it
                unsafe { Vec::from_raw_parts(heap.as_mut_ptr(), heap.len(), heap.capacity() + 1) }
            }
        }
    }
}

impl FromIterator<u8> for CompactBuf {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut buf = CompactBuf::new();
        buf.extend(iter);
        buf
    }
}

impl<'a> FromIterator<&'a u8> for CompactBuf {
    fn from_iter<T: IntoIterator<Item = &'a u8>>(iter: T) -> Self {
        iter.into_iter().copied().collect()
    }
}

impl<A: Alloc> Extend<u8> for CompactBuf<A> {
    fn extend<T: IntoIterator<Item = u8>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let (lower_bound, _) = iter.size_hint();
        unwrap_alloc(self.reserve_additional(lower_bound));
        for byte in iter {
            unwrap_alloc(self.push(byte));
        }
    }
}

impl<'a, A: Alloc> Extend<&'a u8> for CompactBuf<A> {
    fn extend<T: IntoIterator<Item = &'a u8>>(&mut self, iter: T) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, A: Alloc> Extend<&'a [u8]> for CompactBuf<A> {
    fn extend<T: IntoIterator<Item = &'a [u8]>>(&mut self, iter: T) {
        for bytes in iter {
            unwrap_alloc(self.append(bytes));
        }
    }
}

impl<A: Alloc> fmt::Debug for CompactBuf<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(BStr::new(self.as_slice()), f)
    }
}

impl<A: Alloc> fmt::Display for CompactBuf<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(BStr::new(self.as_slice()), f)
    }
}

// the tagged repr costs one word over the three-word union overlay; hold
// the line there
static_assertions::const_assert!(
    core::mem::size_of::<CompactBuf>() <= 4 * core::mem::size_of::<usize>()
);
