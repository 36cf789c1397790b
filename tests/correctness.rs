use std::cell::Cell;
use std::ptr::NonNull;
use std::rc::Rc;

use compact_buf::{Alloc, CompactBuf, Error, Global, INLINE_CAP, NPOS};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Delegates to [`Global`] while counting every allocation, so tests can
/// observe reallocation behavior. Instances compare equal when they share
/// a counter.
#[derive(Clone)]
struct Counting {
    allocations: Rc<Cell<usize>>,
}

impl Counting {
    fn new() -> Self {
        Counting {
            allocations: Rc::new(Cell::new(0)),
        }
    }

    fn allocations(&self) -> usize {
        self.allocations.get()
    }
}

impl PartialEq for Counting {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.allocations, &other.allocations)
    }
}

impl Alloc for Counting {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, Error> {
        self.allocations.set(self.allocations.get() + 1);
        Global.allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        Global.deallocate(ptr, size)
    }

    fn max_allocation_size(&self) -> usize {
        Global.max_allocation_size()
    }
}

/// Delegates to [`Global`] until armed, then fails every allocation, so
/// tests can observe the error paths of mandatory and non-binding
/// reallocations.
#[derive(Clone)]
struct Unreliable {
    fail: Rc<Cell<bool>>,
}

impl Unreliable {
    fn new() -> Self {
        Unreliable {
            fail: Rc::new(Cell::new(false)),
        }
    }

    fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl PartialEq for Unreliable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.fail, &other.fail)
    }
}

impl Alloc for Unreliable {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, Error> {
        if self.fail.get() {
            return Err(Error::AllocFailed { size });
        }
        Global.allocate(size)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        Global.deallocate(ptr, size)
    }

    fn max_allocation_size(&self) -> usize {
        Global.max_allocation_size()
    }
}

#[test]
fn test_randomized_edits_match_vec() {
    let seed: u64 = rand::thread_rng().gen();
    eprintln!("using seed: {}_u64", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let runs = option_env!("RANDOMIZED_RUNS")
        .map(|v| v.parse().expect("provided non-integer value?"))
        .unwrap_or(10_000);
    println!("Running with RANDOMIZED_RUNS: {}", runs);

    let mut buf = CompactBuf::new();
    let mut model: Vec<u8> = Vec::new();

    for _ in 0..runs {
        let len = model.len();
        match rng.gen_range(0..11) {
            0 => {
                let byte = rng.gen();
                buf.push(byte).unwrap();
                model.push(byte);
            }
            1 => {
                assert_eq!(buf.pop(), model.pop());
            }
            2 => {
                let pos = rng.gen_range(0..=len);
                let patch: Vec<u8> = (0..rng.gen_range(0..8)).map(|_| rng.gen()).collect();
                buf.insert(pos, &patch).unwrap();
                model.splice(pos..pos, patch);
            }
            3 => {
                let pos = rng.gen_range(0..=len);
                let count = rng.gen_range(0..8);
                buf.erase(pos, count).unwrap();
                let end = (pos + count).min(model.len());
                model.drain(pos..end);
            }
            4 => {
                let pos = rng.gen_range(0..=len);
                let old_len = rng.gen_range(0..8);
                let patch: Vec<u8> = (0..rng.gen_range(0..8)).map(|_| rng.gen()).collect();
                buf.replace(pos, old_len, &patch).unwrap();
                let end = (pos + old_len).min(model.len());
                model.splice(pos..end, patch);
            }
            5 => {
                let start = rng.gen_range(0..=len);
                let end = rng.gen_range(start..=len);
                let pos = rng.gen_range(0..=len);
                buf.insert_within(pos, start..end).unwrap();
                let copy: Vec<u8> = model[start..end].to_vec();
                model.splice(pos..pos, copy);
            }
            6 => {
                let start = rng.gen_range(0..=len);
                let end = rng.gen_range(start..=len);
                let pos = rng.gen_range(0..=len);
                let old_len = rng.gen_range(0..8);
                buf.replace_within(pos, old_len, start..end).unwrap();
                let copy: Vec<u8> = model[start..end].to_vec();
                let stop = (pos + old_len).min(model.len());
                model.splice(pos..stop, copy);
            }
            7 => {
                let content: Vec<u8> = (0..rng.gen_range(0..24)).map(|_| rng.gen()).collect();
                buf.assign(&content).unwrap();
                model = content;
            }
            8 => {
                let new_len = rng.gen_range(0..len + 8);
                let fill = rng.gen();
                buf.resize(new_len, fill).unwrap();
                model.resize(new_len, fill);
            }
            9 => {
                let new_len = rng.gen_range(0..=len);
                buf.truncate(new_len);
                model.truncate(new_len);
            }
            _ => {
                buf.shrink_to_fit();
            }
        }

        assert_eq!(buf.as_slice(), &model[..]);
        assert_eq!(buf.len(), model.len());
        assert!(buf.capacity() >= buf.len());
        assert_eq!(buf.as_slice_with_nul().last(), Some(&0));
        assert_eq!(buf.is_inline(), buf.capacity() == INLINE_CAP);
    }
}

#[test]
fn test_push_growth_is_amortized() {
    let alloc = Counting::new();
    let mut buf = CompactBuf::new_in(alloc.clone());

    for _ in 0..10_000 {
        buf.push(b'x').unwrap();
    }

    assert_eq!(buf.len(), 10_000);
    // 1.5x growth from the 15-byte inline region needs ~ log_1.5(10_000 / 15)
    // reallocations; anything near linear would blow way past this
    assert!(alloc.allocations() <= 20, "{} allocations", alloc.allocations());
}

#[test]
fn test_self_insert_doubles_content() {
    let mut buf = CompactBuf::from_slice(b"ab").unwrap();
    buf.insert_within(1, 0..2).unwrap();
    assert_eq!(buf.as_slice(), b"aabb");
}

#[test]
fn test_self_replace_through_reallocation() {
    // inserting the whole content into its own middle forces a grow while
    // the source lives in the old block
    let mut buf = CompactBuf::from_slice(b"0123456789").unwrap();
    buf.reserve(10).unwrap();
    buf.insert_within(5, 0..10).unwrap();
    assert_eq!(buf.as_slice(), b"01234012345678956789");
}

#[test]
fn test_transfer_adopts_heap_storage() {
    let mut src = CompactBuf::from_slice(b"content long enough for the heap").unwrap();
    assert!(!src.is_inline());
    let addr = src.as_ptr();

    let mut dst = CompactBuf::new();
    dst.transfer_from(&mut src).unwrap();

    assert_eq!(dst.as_ptr(), addr);
    assert_eq!(dst, &b"content long enough for the heap"[..]);
    assert!(src.is_empty());
    assert!(src.is_inline());
}

#[test]
fn test_transfer_between_allocators_copies() {
    let mut src = CompactBuf::new_in(Counting::new());
    src.append(b"content long enough for the heap").unwrap();
    let addr = src.as_ptr();

    let mut dst = CompactBuf::new_in(Counting::new());
    dst.transfer_from(&mut src).unwrap();

    assert_ne!(dst.as_ptr(), addr);
    assert_eq!(dst, &b"content long enough for the heap"[..]);
    assert!(src.is_empty());
}

#[test]
fn test_take_leaves_source_empty() {
    let mut buf = CompactBuf::from_slice(b"content long enough for the heap").unwrap();
    let addr = buf.as_ptr();

    let moved = buf.take();
    assert_eq!(moved.as_ptr(), addr);
    assert!(buf.is_empty());
    assert!(buf.is_inline());
    assert!(buf.capacity() == INLINE_CAP);
}

#[test]
fn test_find_miss_is_npos_everywhere() {
    let buf = CompactBuf::from_slice(b"the quick brown fox").unwrap();

    for pos in 0..=buf.len() + 1 {
        assert_eq!(buf.find(b"wolf", pos), NPOS);
        assert_eq!(buf.find_byte(b'z', pos), NPOS);
        assert_eq!(buf.find_first_of(b"XYZ", pos), NPOS);
    }
}

#[test]
fn test_errors_leave_content_untouched() {
    let mut buf = CompactBuf::from_slice(b"untouchable").unwrap();
    let before: Vec<u8> = buf.as_slice().to_vec();
    let cap = buf.capacity();

    assert!(buf.insert(buf.len() + 1, b"x").is_err());
    assert!(buf.erase(buf.len() + 1, 0).is_err());
    assert!(buf.replace(99, 1, b"x").is_err());
    assert!(buf.replace_within(0, 1, 5..99).is_err());
    assert!(buf.insert_within(0, 9..2).is_err());

    assert_eq!(buf.as_slice(), &before[..]);
    assert_eq!(buf.capacity(), cap);
}

#[test]
fn test_alloc_failure_leaves_buffer_untouched() {
    let alloc = Unreliable::new();
    let mut buf = CompactBuf::new_in(alloc.clone());
    buf.append(b"content long enough for the heap").unwrap();

    let before: Vec<u8> = buf.as_slice().to_vec();
    let cap = buf.capacity();
    let addr = buf.as_ptr();

    alloc.fail(true);

    let err = buf.reserve(500).unwrap_err();
    assert!(matches!(err, Error::AllocFailed { .. }));

    let patch = [b'x'; 300];
    let err = buf.append(&patch).unwrap_err();
    assert!(matches!(err, Error::AllocFailed { .. }));

    assert_eq!(buf.as_slice(), &before[..]);
    assert_eq!(buf.capacity(), cap);
    assert_eq!(buf.as_ptr(), addr);
    assert_eq!(buf.as_slice_with_nul().last(), Some(&0));

    // pointer-stable: the failed calls never swapped storage
    alloc.fail(false);
    buf.push(b'!').unwrap();
    assert_eq!(buf.len(), before.len() + 1);
}

#[test]
fn test_shrink_swallows_alloc_failure() {
    let alloc = Unreliable::new();
    let mut buf = CompactBuf::new_in(alloc.clone());
    buf.reserve(100).unwrap();
    buf.append(b"longer than the inline region!!").unwrap();
    let cap = buf.capacity();

    alloc.fail(true);
    buf.shrink_to_fit();

    // the non-binding hint swallows the failure and keeps current storage
    assert_eq!(buf.capacity(), cap);
    assert_eq!(buf, &b"longer than the inline region!!"[..]);

    alloc.fail(false);
    buf.shrink_to_fit();
    assert_eq!(buf.capacity(), buf.len());
    assert_eq!(buf, &b"longer than the inline region!!"[..]);
}

#[test]
fn test_error_messages() {
    let mut buf = CompactBuf::from_slice(b"abc").unwrap();

    let err = buf.insert(5, b"x").unwrap_err();
    assert_eq!(
        err.to_string(),
        "insert: position 5 out of range for buffer of length 3"
    );
}
