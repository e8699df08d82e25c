//! # segalloc — a segregated-fit sbrk allocator
//!
//! This crate implements a dynamic memory allocator: a heap manager
//! servicing allocate/free/resize/zero-initialize requests for
//! variable-sized byte regions drawn from a single contiguous,
//! `sbrk`-style growable arena.
//!
//! ## Overview
//!
//! ```text
//!   [ prologue-footer : 8B ] [ block0 ] [ block1 ] ... [ epilogue-header : 8B ]
//! ```
//!
//! Every block — allocated or free — carries an 8-byte header and an
//! 8-byte footer duplicating it (a *boundary tag*), which lets any block
//! inspect its neighbors in O(1) without walking the whole heap. Free
//! blocks are additionally linked into one of 15 size-segregated doubly
//! linked free lists:
//!
//! ```text
//!   class:   0     1      2       ...     13         14
//!   size:  <=16  17-32  33-64   ...  65537-131072  >131072
//! ```
//!
//! A `malloc` request is rounded up to a 16-byte-aligned block size,
//! matched against the smallest admissible free-list class via
//! segregated first-fit, split if the match is oversized, and extended
//! from the arena if no class yields a fit. A `free` marks its block
//! free, coalesces it with any free neighbors using the boundary tags,
//! and reinserts the result into the free-list index.
//!
//! ## Crate structure
//!
//! ```text
//!   segalloc
//!   ├── arena     - sbrk-backed growable byte region
//!   ├── bytes     - memmove/memset-equivalent primitives
//!   ├── block     - boundary-tag block layout, neighbor walking
//!   ├── freelist  - size-segregated free-list index
//!   ├── policy    - find-fit, split, coalesce, extend
//!   └── checker   - structural heap-invariant audit
//! ```
//!
//! ## Safety
//!
//! This crate is inherently unsafe: it performs raw pointer arithmetic
//! over a heap it shares with nothing else, and it trusts the caller not
//! to free a pointer it didn't hand out, double-free, or write past a
//! payload's bounds. None of that is detected; see the Non-goals in
//! `spec.md` §1.
//!
//! ## Thread safety
//!
//! Not thread-safe, and not reentrant: `Allocator` is single-client, the
//! same as the `sbrk` break it drives is genuinely process-wide state.
//! Multi-threaded use requires external serialization (e.g. a mutex
//! around every call).

mod arena;
mod block;
mod bytes;
mod checker;
pub mod config;
mod freelist;
mod policy;

use std::ptr::NonNull;

use arena::Arena;
use block::RawBlock;
use config::{CHUNKSIZE, DSIZE, MIN_BLOCK_SIZE};
use freelist::FreeLists;

/// A single heap instance: the arena it owns, its free-list index, and
/// the fixed address of its first real block.
///
/// Construct with [`Allocator::new`]. The heap isn't actually extended
/// until the first call to [`Allocator::init`] or [`Allocator::malloc`]
/// — matching `spec.md` §4.4's "`malloc` detects the uninitialized state
/// and calls `init`".
pub struct Allocator {
    arena: Arena,
    lists: FreeLists,
    first_block: Option<RawBlock>,
}

impl Allocator {
    /// A heap with nothing allocated from the arena yet.
    pub const fn new() -> Self {
        Self {
            arena: Arena::new(),
            lists: FreeLists::new(),
            first_block: None,
        }
    }

    fn epilogue(&self) -> RawBlock {
        let hi = self.arena.hi().expect("epilogue queried before init");
        RawBlock::at(NonNull::new((hi.as_ptr() as usize - 7) as *mut u8).unwrap())
    }

    /// Grows the arena by 16 bytes for the prologue/epilogue sentinels,
    /// then extends by [`config::CHUNKSIZE`] bytes of free space.
    /// Returns `false` on arena exhaustion.
    ///
    /// Safe to call more than once only before the first allocation —
    /// `spec.md` §4.4 notes it's "idempotent only in the sense that
    /// callers may invoke `malloc` before `init`".
    pub fn init(&mut self) -> bool {
        let Ok(start) = self.arena.extend(16) else {
            return false;
        };

        unsafe {
            // Prologue footer.
            (start.as_ptr() as *mut u64).write(block::pack(0, true));
            // Epilogue header — immediately overwritten by extend_heap's
            // first extension, but written now so an empty heap with no
            // subsequent extension would still be well-formed.
            ((start.as_ptr() as usize + 8) as *mut u64).write(block::pack(0, true));
        }

        self.first_block = Some(RawBlock::at(
            NonNull::new((start.as_ptr() as usize + 8) as *mut u8).unwrap(),
        ));

        policy::extend_heap(&mut self.arena, &mut self.lists, CHUNKSIZE).is_some()
    }

    fn ensure_init(&mut self) -> bool {
        if self.first_block.is_some() {
            return true;
        }
        self.init()
    }

    /// Allocates at least `size` bytes, 16-byte aligned. Returns `NULL`
    /// if `size == 0` or the arena is exhausted.
    pub fn malloc(&mut self, size: usize) -> *mut u8 {
        #[cfg(feature = "checker-diagnostics")]
        debug_assert!(self.first_block.is_none() || self.checkheap(0));

        if !self.ensure_init() {
            return std::ptr::null_mut();
        }
        if size == 0 {
            return std::ptr::null_mut();
        }

        let asize = std::cmp::max(round_up(size + DSIZE, DSIZE), MIN_BLOCK_SIZE);

        let block = match policy::find_fit(&self.lists, asize) {
            Some(block) => block,
            None => {
                let extend_size = std::cmp::max(asize, CHUNKSIZE);
                match policy::extend_heap(&mut self.arena, &mut self.lists, extend_size) {
                    Some(block) => block,
                    None => return std::ptr::null_mut(),
                }
            }
        };

        unsafe {
            let block_size = block.size();
            self.lists.remove(block);
            block.write_block(block_size, true);
            policy::split_block(&mut self.lists, block, asize);

            #[cfg(feature = "checker-diagnostics")]
            debug_assert!(self.checkheap(0));

            block.payload().as_ptr()
        }
    }

    /// Frees a pointer previously returned by [`Allocator::malloc`],
    /// [`Allocator::calloc`], or [`Allocator::realloc`]. A no-op if
    /// `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must have been returned by this allocator and not already
    /// freed. Passing any other pointer is undefined behavior —
    /// `spec.md` §1 explicitly rules out defending against this.
    pub unsafe fn free(&mut self, ptr: *mut u8) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        let block = RawBlock::from_payload(ptr);
        unsafe {
            let size = block.size();
            block.write_block(size, false);
            let merged = policy::coalesce_block(&mut self.lists, block);
            self.lists.insert(merged);
        }

        #[cfg(feature = "checker-diagnostics")]
        debug_assert!(self.checkheap(0));
    }

    /// Resizes the allocation at `ptr` to `size` bytes, preserving the
    /// first `min(size, old_size)` bytes. `size == 0` is equivalent to
    /// `free(ptr)` followed by returning `NULL`. `ptr == NULL` is
    /// equivalent to `malloc(size)`. Always allocates fresh and copies —
    /// no in-place growth attempt, per `spec.md` §4.4/§9.
    ///
    /// # Safety
    /// `ptr` must be null or have been returned by this allocator and
    /// not already freed.
    pub unsafe fn realloc(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if size == 0 {
            unsafe { self.free(ptr) };
            return std::ptr::null_mut();
        }

        let Some(old_payload) = NonNull::new(ptr) else {
            return self.malloc(size);
        };

        let old_block = RawBlock::from_payload(old_payload);
        let old_payload_size = unsafe { old_block.size() } - DSIZE;

        let new_ptr = self.malloc(size);
        let Some(new_payload) = NonNull::new(new_ptr) else {
            return std::ptr::null_mut();
        };

        let copy_len = std::cmp::min(size, old_payload_size);
        unsafe { bytes::copy(new_payload, old_payload, copy_len) };
        unsafe { self.free(ptr) };

        new_ptr
    }

    /// Allocates space for `n` elements of `size` bytes each, zeroed.
    /// Returns `NULL` on overflow of `n * size`, if `n == 0`, or if the
    /// arena is exhausted.
    pub fn calloc(&mut self, n: usize, size: usize) -> *mut u8 {
        if n == 0 {
            return std::ptr::null_mut();
        }

        let Some(total) = n.checked_mul(size) else {
            return std::ptr::null_mut();
        };

        let ptr = self.malloc(total);
        if let Some(ptr) = NonNull::new(ptr) {
            unsafe { bytes::fill(ptr, 0, total) };
        }
        ptr
    }

    /// Audits every structural invariant in `spec.md` §3: block
    /// alignment, boundary-tag consistency, maximal coalescing,
    /// free-list soundness, class correctness, and pointer containment.
    /// `line_hint` is surfaced in `checker-diagnostics` log output to
    /// help locate the call site; it has no effect on the result.
    pub fn checkheap(&self, line_hint: u32) -> bool {
        #[cfg(not(feature = "checker-diagnostics"))]
        let _ = line_hint;
        #[cfg(feature = "checker-diagnostics")]
        log::debug!("checkheap called at line {line_hint}");

        let Some(first_block) = self.first_block else {
            return true;
        };

        #[cfg(feature = "checker-diagnostics")]
        checker::dump_heap(first_block);

        let epilogue = self.epilogue();
        checker::check_heap(&self.arena, &self.lists, first_block, epilogue)
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

fn round_up(size: usize, n: usize) -> usize {
    n * size.div_ceil(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_aligned(ptr: *mut u8, align: usize) -> bool {
        (ptr as usize) % align == 0
    }

    #[test]
    fn basic_alloc_write_free_checkheap() {
        let mut alloc = Allocator::new();
        let p = alloc.malloc(24) as *mut u64;
        assert!(!p.is_null());
        assert!(is_aligned(p as *mut u8, 16));

        unsafe {
            p.write(0xDEAD_BEEF_DEAD_BEEF);
            assert_eq!(p.read(), 0xDEAD_BEEF_DEAD_BEEF);
            alloc.free(p as *mut u8);
        }
        assert!(alloc.checkheap(0));
    }

    #[test]
    fn malloc_zero_returns_null() {
        let mut alloc = Allocator::new();
        assert!(alloc.malloc(0).is_null());
    }

    #[test]
    fn free_null_is_noop() {
        let mut alloc = Allocator::new();
        unsafe { alloc.free(std::ptr::null_mut()) };
        // an allocator that never allocated still reports a valid (trivial) heap
        assert!(alloc.checkheap(0));
    }

    #[test]
    fn realloc_null_is_malloc_and_size_zero_is_free() {
        let mut alloc = Allocator::new();
        let p = unsafe { alloc.realloc(std::ptr::null_mut(), 32) };
        assert!(!p.is_null());

        let freed = unsafe { alloc.realloc(p, 0) };
        assert!(freed.is_null());
        assert!(alloc.checkheap(0));
    }

    #[test]
    fn realloc_preserves_prefix_bytes() {
        let mut alloc = Allocator::new();
        let p = alloc.malloc(16);
        assert!(!p.is_null());
        unsafe {
            for i in 0..16u8 {
                p.add(i as usize).write(i);
            }
            let q = alloc.realloc(p, 64);
            assert!(!q.is_null());
            for i in 0..16u8 {
                assert_eq!(q.add(i as usize).read(), i);
            }
        }
    }

    #[test]
    fn calloc_zeroes_memory() {
        let mut alloc = Allocator::new();
        let p = alloc.calloc(16, 4);
        assert!(!p.is_null());
        unsafe {
            for i in 0..64usize {
                assert_eq!(p.add(i).read(), 0);
            }
        }
    }

    #[test]
    fn calloc_overflow_returns_null() {
        let mut alloc = Allocator::new();
        assert!(alloc.calloc(usize::MAX, 2).is_null());
    }

    #[test]
    fn calloc_zero_count_returns_null() {
        let mut alloc = Allocator::new();
        assert!(alloc.calloc(0, 8).is_null());
    }

    #[test]
    fn freed_blocks_land_in_the_class_size_predicts_and_no_other() {
        // spec.md §8 scenario 4: four free blocks of different sizes should
        // coexist, each in exactly the class its own size predicts. An
        // allocated spacer after each target keeps it from coalescing into
        // its neighbor once freed, so all four survive as distinct free
        // blocks rather than merging into one (see the discussion in
        // tests/scenarios.rs, which checks the same property black-box).
        let mut alloc = Allocator::new();

        let sizes = [24usize, 100, 1000, 10_000];
        let mut targets = Vec::new();
        for &size in &sizes {
            let p = alloc.malloc(size);
            assert!(!p.is_null());
            targets.push(p);

            let spacer = alloc.malloc(16);
            assert!(!spacer.is_null());
        }

        for &p in &targets {
            unsafe { alloc.free(p) };
        }
        assert!(alloc.checkheap(0));

        for &p in &targets {
            let block = RawBlock::from_payload(NonNull::new(p).unwrap());
            let size = unsafe { block.size() };
            let expected_class = FreeLists::class_of(size);

            assert!(
                alloc.lists.iter(expected_class).any(|b| b == block),
                "block of size {size} not found in its predicted class {expected_class}"
            );
            for class in 0..config::NUM_SIZE_CLASSES {
                if class != expected_class {
                    assert!(
                        !alloc.lists.iter(class).any(|b| b == block),
                        "block of size {size} unexpectedly found in class {class}, not its predicted class {expected_class}"
                    );
                }
            }
        }
    }
}
