use thiserror::Error;

/// The error type for fallible [`CompactBuf`] operations.
///
/// Every error leaves the buffer byte-identical to its state before the
/// failing call. There is no partially-applied mutation.
///
/// [`CompactBuf`]: crate::CompactBuf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A position argument exceeded the current length of the buffer.
    #[error("{op}: position {pos} out of range for buffer of length {len}")]
    OutOfRange {
        /// The operation that was passed the bad position.
        op: &'static str,
        /// The offending position.
        pos: usize,
        /// The buffer's length at the time of the call.
        len: usize,
    },

    /// The resulting length would exceed the structural maximum size.
    #[error("{op}: required size {required} exceeds maximum size {max_size}")]
    LengthExceeded {
        /// The operation whose result would have been too large.
        op: &'static str,
        /// The length the operation would have produced.
        required: usize,
        /// The buffer's maximum size, derived from the allocator.
        max_size: usize,
    },

    /// The allocator failed to provide a block during a mandatory
    /// reallocation.
    #[error("allocation of {size} bytes failed")]
    AllocFailed {
        /// The size of the block that was requested, in bytes.
        size: usize,
    },
}
