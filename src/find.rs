//! The search family: linear scans over the buffer's content.
//!
//! Absence is reported through [`NPOS`], never as an error, and start
//! offsets are clamped to the valid range. The empty-needle and offset
//! clamping rules follow the classic contract: `find(b"", pos)` is `pos`
//! while `pos <= len`, and `rfind(b"", pos)` is `min(pos, len)`.

/// The not-found sentinel returned by every search operation.
pub const NPOS: usize = usize::MAX;

/// First occurrence of `needle` at a position `>= pos`.
pub(crate) fn find(hay: &[u8], needle: &[u8], pos: usize) -> usize {
    let size = hay.len();
    let n = needle.len();

    if n == 0 {
        return if pos <= size { pos } else { NPOS };
    }
    if n <= size {
        for at in pos..=size - n {
            if &hay[at..at + n] == needle {
                return at;
            }
        }
    }
    NPOS
}

/// Last occurrence of `needle` starting at a position `<= pos`.
pub(crate) fn rfind(hay: &[u8], needle: &[u8], pos: usize) -> usize {
    let size = hay.len();
    let n = needle.len();

    if n <= size {
        let mut at = pos.min(size - n);
        loop {
            if &hay[at..at + n] == needle {
                return at;
            }
            if at == 0 {
                break;
            }
            at -= 1;
        }
    }
    NPOS
}

/// First occurrence of `byte` at a position `>= pos`.
pub(crate) fn find_byte(hay: &[u8], byte: u8, pos: usize) -> usize {
    match hay.get(pos..).and_then(|tail| tail.iter().position(|&b| b == byte)) {
        Some(off) => pos + off,
        None => NPOS,
    }
}

/// Last occurrence of `byte` at a position `<= pos`.
pub(crate) fn rfind_byte(hay: &[u8], byte: u8, pos: usize) -> usize {
    if hay.is_empty() {
        return NPOS;
    }
    let start = pos.min(hay.len() - 1);
    match hay[..=start].iter().rposition(|&b| b == byte) {
        Some(at) => at,
        None => NPOS,
    }
}

/// First position `>= pos` holding a byte contained in `set`.
pub(crate) fn find_first_of(hay: &[u8], set: &[u8], pos: usize) -> usize {
    if set.is_empty() {
        return NPOS;
    }
    for at in pos..hay.len() {
        if set.contains(&hay[at]) {
            return at;
        }
    }
    NPOS
}

/// Last position `<= pos` holding a byte contained in `set`.
pub(crate) fn find_last_of(hay: &[u8], set: &[u8], pos: usize) -> usize {
    if hay.is_empty() || set.is_empty() {
        return NPOS;
    }
    let mut at = pos.min(hay.len() - 1);
    loop {
        if set.contains(&hay[at]) {
            return at;
        }
        if at == 0 {
            break;
        }
        at -= 1;
    }
    NPOS
}

/// First position `>= pos` holding a byte *not* contained in `set`.
///
/// With an empty set every position qualifies.
pub(crate) fn find_first_not_of(hay: &[u8], set: &[u8], pos: usize) -> usize {
    for at in pos..hay.len() {
        if !set.contains(&hay[at]) {
            return at;
        }
    }
    NPOS
}

/// Last position `<= pos` holding a byte *not* contained in `set`.
pub(crate) fn find_last_not_of(hay: &[u8], set: &[u8], pos: usize) -> usize {
    if hay.is_empty() {
        return NPOS;
    }
    let mut at = pos.min(hay.len() - 1);
    loop {
        if !set.contains(&hay[at]) {
            return at;
        }
        if at == 0 {
            break;
        }
        at -= 1;
    }
    NPOS
}
