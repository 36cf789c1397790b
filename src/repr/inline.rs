/// How many content bytes we can store without touching the heap.
///
/// One extra slot is reserved for the NUL terminator, so the inline region
/// is 16 bytes wide in total.
pub const INLINE_CAP: usize = 15;

/// A buffer whose content lives directly inside the struct.
///
/// Invariant: `buf[len] == 0` at all times, so `buf[..=len]` is always a
/// valid NUL-terminated sequence.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct InlineBuf {
    buf: [u8; INLINE_CAP + 1],
    len: u8,
}

impl InlineBuf {
    #[inline]
    pub const fn empty() -> Self {
        InlineBuf {
            buf: [0; INLINE_CAP + 1],
            len: 0,
        }
    }

    #[inline]
    pub fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= INLINE_CAP);

        let len = bytes.len();
        let mut buf = [0u8; INLINE_CAP + 1];
        buf[..len].copy_from_slice(bytes);
        // the array is zero-initialized, so `buf[len]` is already the terminator

        InlineBuf { buf, len: len as u8 }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        INLINE_CAP
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    /// The content plus the trailing NUL.
    #[inline]
    pub fn as_slice_with_nul(&self) -> &[u8] {
        &self.buf[..self.len as usize + 1]
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.buf.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    /// Sets the logical length and rewrites the terminator.
    ///
    /// # Safety
    /// * `len` must be at most [`INLINE_CAP`]
    /// * the bytes at `..len` must be initialized
    #[inline]
    pub unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= INLINE_CAP);

        self.len = len as u8;
        self.buf[len] = 0;
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<InlineBuf>(), INLINE_CAP + 2);
