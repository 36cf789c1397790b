use proptest::{prelude::*, strategy::Strategy};

use crate::{CompactBuf, Error, INLINE_CAP, NPOS};

// generates random byte runs, upto 80 bytes long
fn rand_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..80)
}

proptest! {
    #[test]
    fn test_bytes_roundtrip(bytes in rand_bytes()) {
        let buf = CompactBuf::from_slice(&bytes).unwrap();
        prop_assert_eq!(buf.as_slice(), &bytes[..]);
    }

    #[test]
    fn test_bytes_allocated_properly(bytes in rand_bytes()) {
        let buf = CompactBuf::from_slice(&bytes).unwrap();

        if bytes.len() <= INLINE_CAP {
            prop_assert!(buf.is_inline());
        } else {
            prop_assert!(!buf.is_inline());
        }
    }

    #[test]
    fn test_terminator_always_present(bytes in rand_bytes()) {
        let mut buf = CompactBuf::from_slice(&bytes).unwrap();
        prop_assert_eq!(buf.as_slice_with_nul().last(), Some(&0));

        buf.push(b'x').unwrap();
        prop_assert_eq!(buf.as_slice_with_nul().last(), Some(&0));

        buf.pop();
        prop_assert_eq!(buf.as_slice_with_nul().last(), Some(&0));
    }

    #[test]
    fn test_capacity_holds_length(bytes in rand_bytes(), extra in rand_bytes()) {
        let mut buf = CompactBuf::from_slice(&bytes).unwrap();
        prop_assert!(buf.capacity() >= buf.len());

        buf.append(&extra).unwrap();
        prop_assert!(buf.capacity() >= buf.len());

        buf.shrink_to_fit();
        prop_assert!(buf.capacity() >= buf.len());
        prop_assert_eq!(buf.len(), bytes.len() + extra.len());
    }

    #[test]
    fn test_insert_erase_roundtrip(
        bytes in rand_bytes(),
        patch in rand_bytes(),
        pos_seed in any::<usize>(),
    ) {
        let pos = if bytes.is_empty() { 0 } else { pos_seed % (bytes.len() + 1) };

        let mut buf = CompactBuf::from_slice(&bytes).unwrap();
        buf.insert(pos, &patch).unwrap();
        buf.erase(pos, patch.len()).unwrap();

        prop_assert_eq!(buf.as_slice(), &bytes[..]);
    }

    #[test]
    fn test_compare_sign_matches_ord(a in rand_bytes(), b in rand_bytes()) {
        let buf = CompactBuf::from_slice(&a).unwrap();
        let sign = buf.compare(&b).signum();
        let expected = match a.cmp(&b) {
            core::cmp::Ordering::Less => -1,
            core::cmp::Ordering::Equal => 0,
            core::cmp::Ordering::Greater => 1,
        };
        prop_assert_eq!(sign, expected);
    }

    #[test]
    fn test_find_agrees_with_windows(hay in rand_bytes(), needle in proptest::collection::vec(any::<u8>(), 1..4)) {
        let buf = CompactBuf::from_slice(&hay).unwrap();
        let expected = hay
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap_or(NPOS);
        prop_assert_eq!(buf.find(&needle, 0), expected);
    }
}

#[test]
fn test_short_runs_inline() {
    let runs: [&[u8]; 4] = [b"nyc", b"statue", b"liberty", b"img_1234.png"];

    for run in runs {
        let buf = CompactBuf::from_slice(run).unwrap();
        assert_eq!(buf, run);
        assert!(buf.is_inline());
    }
}

#[test]
fn test_inline_threshold() {
    let at_cap = CompactBuf::from_slice(&[b'a'; INLINE_CAP]).unwrap();
    assert!(at_cap.is_inline());
    assert_eq!(at_cap.capacity(), INLINE_CAP);

    let past_cap = CompactBuf::from_slice(&[b'a'; INLINE_CAP + 1]).unwrap();
    assert!(!past_cap.is_inline());
}

#[test]
fn test_from_vec_adopts_storage() {
    let mut vec = Vec::with_capacity(64);
    vec.extend_from_slice(b"long enough to skip the inline region");
    let addr = vec.as_ptr();

    let buf = CompactBuf::from(vec);
    assert_eq!(buf.as_ptr(), addr);
    assert_eq!(buf, &b"long enough to skip the inline region"[..]);
}

#[test]
fn test_from_vec_short_copies() {
    let vec = b"short".to_vec();
    let buf = CompactBuf::from(vec);
    assert!(buf.is_inline());
    assert_eq!(buf, &b"short"[..]);
}

#[test]
fn test_into_vec_roundtrip() {
    for content in [&b"tiny"[..], &b"something long enough to live on the heap"[..]] {
        let buf = CompactBuf::from_slice(content).unwrap();
        let vec: Vec<u8> = buf.into();
        assert_eq!(vec, content);
    }
}

#[test]
fn test_extend_and_collect() {
    let buf: CompactBuf = (b'a'..=b'z').collect();
    assert_eq!(buf, &b"abcdefghijklmnopqrstuvwxyz"[..]);

    let mut buf = CompactBuf::new();
    buf.extend([&b"ab"[..], &b"cd"[..], &b"ef"[..]]);
    assert_eq!(buf, &b"abcdef"[..]);
}

#[test]
fn test_clone_is_independent() {
    let a = CompactBuf::from_slice(b"x").unwrap();
    let mut b = a.clone();
    b.append(b"y").unwrap();

    assert_eq!(a, &b"x"[..]);
    assert_eq!(b, &b"xy"[..]);
}

#[test]
fn test_clone_from_reuses_capacity() {
    let source = CompactBuf::from_slice(b"replacement content, heap sized?").unwrap();

    let mut target = CompactBuf::with_capacity(128).unwrap();
    target.append(b"old").unwrap();
    let addr = target.as_ptr();

    target.clone_from(&source);
    assert_eq!(target, source);
    assert_eq!(target.as_ptr(), addr);
}

#[test]
fn test_failed_edit_leaves_buffer_untouched() {
    let mut buf = CompactBuf::from_slice(b"abc").unwrap();

    let err = buf.insert(4, b"x").unwrap_err();
    assert!(matches!(err, Error::OutOfRange { pos: 4, len: 3, .. }));
    assert_eq!(buf, &b"abc"[..]);

    let err = buf.erase(9, 1).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { pos: 9, len: 3, .. }));
    assert_eq!(buf, &b"abc"[..]);
}

#[test]
fn test_debug_renders_bytes() {
    let buf = CompactBuf::from_slice(b"ab\xffc").unwrap();
    assert_eq!(format!("{buf:?}"), "\"ab\\xFFc\"");
}
