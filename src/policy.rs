//! # Placement policy
//!
//! Segregated first-fit placement, splitting, coalescing, and heap
//! extension — `spec.md` §4.3. Grounded directly on
//! `original_source/mm.c`'s `find_fit`, `split_block`, `coalesce_block`,
//! and `extend_heap`; this module is the Rust transcription of those
//! four functions onto `block::RawBlock` / `freelist::FreeLists`.

use std::ptr::NonNull;

use crate::arena::Arena;
use crate::block::RawBlock;
use crate::config::MIN_BLOCK_SIZE;
use crate::freelist::FreeLists;

/// Segregated first-fit: starts at `class_of(asize)`, scans head to
/// tail, and on exhaustion advances to the next class, up to the last
/// one. Returns the first block whose size is at least `asize`.
pub fn find_fit(lists: &FreeLists, asize: usize) -> Option<RawBlock> {
    let start = FreeLists::class_of(asize);
    for class in start..crate::config::NUM_SIZE_CLASSES {
        for block in lists.iter(class) {
            if unsafe { block.size() } >= asize {
                return Some(block);
            }
        }
    }
    None
}

/// Splits an allocated block of size `asize` out of `block`, inserting
/// the remainder into the free-list index if it's at least
/// `MIN_BLOCK_SIZE`. Does nothing if the remainder would be too small —
/// the caller has already written `block` as allocated at its full
/// size, so an unsplit block stays correctly sized.
///
/// # Safety
/// `block` must already be written as allocated, and `asize` must be no
/// larger than `block`'s current size.
pub unsafe fn split_block(lists: &mut FreeLists, block: RawBlock, asize: usize) {
    let block_size = unsafe { block.size() };
    debug_assert!(unsafe { block.is_alloc() });
    debug_assert!(asize <= block_size);

    if block_size - asize >= MIN_BLOCK_SIZE {
        unsafe {
            block.write_block(asize, true);
            let remainder = block.next(asize);
            remainder.write_block(block_size - asize, false);
            lists.insert(remainder);
        }
    }
}

/// Merges a newly-freed block with any free neighbors, per the four
/// cases in `spec.md` §4.3. Must be called *before* `block` is inserted
/// into the free-list index; the caller inserts whatever block this
/// function returns.
///
/// # Safety
/// `block` must be free, written at its current size, and not yet
/// linked into any free list. Its neighbors, if present, must be valid
/// blocks (or the epilogue/prologue sentinels).
pub unsafe fn coalesce_block(lists: &mut FreeLists, block: RawBlock) -> RawBlock {
    let size = unsafe { block.size() };

    let prev = unsafe { block.prev() };
    let prev_free = prev.is_some_and(|p| unsafe { !p.is_alloc() });

    let next = unsafe { block.next(size) };
    let next_free = unsafe { !next.is_alloc() };

    match (prev_free, next_free) {
        (false, false) => block,
        (false, true) => unsafe {
            let next_size = next.size();
            lists.remove(next);
            block.write_block(size + next_size, false);
            block
        },
        (true, false) => unsafe {
            let prev = prev.unwrap();
            let prev_size = prev.size();
            lists.remove(prev);
            prev.write_block(prev_size + size, false);
            prev
        },
        (true, true) => unsafe {
            let prev = prev.unwrap();
            let prev_size = prev.size();
            let next_size = next.size();
            lists.remove(prev);
            lists.remove(next);
            prev.write_block(prev_size + size + next_size, false);
            prev
        },
    }
}

/// Rounds `size` up to the arena's 16-byte alignment, grows the arena by
/// that many bytes, writes a free block over the old epilogue, writes a
/// fresh epilogue at the new high-water mark, coalesces with the prior
/// last block if it was free, and inserts the result into the free-list
/// index. Returns `None` if the arena is exhausted.
pub fn extend_heap(arena: &mut Arena, lists: &mut FreeLists, size: usize) -> Option<RawBlock> {
    let size = round_up(size, crate::config::DSIZE);

    let old_break = arena.extend(size).ok()?;

    // `old_break` is the first byte of the newly sbrk'd region; the old
    // epilogue occupied the 8 bytes immediately before it, and that's
    // where the new block's header goes, so the new block's payload
    // starts exactly at `old_break`.
    let block = RawBlock::at(NonNull::new((old_break.as_ptr() as usize - 8) as *mut u8)?);
    unsafe { block.write_block(size, false) };

    let hi = arena.hi()?;
    let epilogue_addr = NonNull::new((hi.as_ptr() as usize - 7) as *mut u8)?;
    let epilogue = RawBlock::at(epilogue_addr);
    unsafe { epilogue.write_epilogue() };

    let coalesced = unsafe { coalesce_block(lists, block) };
    unsafe { lists.insert(coalesced) };
    Some(coalesced)
}

fn round_up(size: usize, n: usize) -> usize {
    n * size.div_ceil(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_heap() -> (Arena, FreeLists, RawBlock) {
        let mut arena = Arena::new();
        // prologue footer + epilogue header, matching Allocator::init.
        let start = arena.extend(16).unwrap();
        unsafe {
            (start.as_ptr() as *mut u64).write(crate::block::pack(0, true));
            ((start.as_ptr() as usize + 8) as *mut u64).write(crate::block::pack(0, true));
        }

        let mut lists = FreeLists::new();
        let block = extend_heap(&mut arena, &mut lists, 4096).expect("initial extension");
        (arena, lists, block)
    }

    #[test]
    fn find_fit_returns_first_block_at_least_as_large() {
        let (_arena, lists, block) = fresh_heap();
        let fit = find_fit(&lists, 64).expect("a 4096-byte free block should fit a 64-byte request");
        assert_eq!(fit, block);
        assert!(unsafe { fit.size() } >= 64);
    }

    #[test]
    fn split_block_inserts_remainder_and_shrinks_allocated_block() {
        let (_arena, mut lists, block) = fresh_heap();
        let original_size = unsafe { block.size() };
        unsafe {
            lists.remove(block);
            block.write_block(original_size, true);
            split_block(&mut lists, block, 32);
        }
        assert_eq!(unsafe { block.size() }, 32);
        assert!(unsafe { block.is_alloc() });

        let remainder = unsafe { block.next(32) };
        assert_eq!(unsafe { remainder.size() }, original_size - 32);
        assert!(!unsafe { remainder.is_alloc() });
    }

    #[test]
    fn coalesce_merges_free_neighbors_on_both_sides() {
        let (_arena, mut lists, block) = fresh_heap();
        let total = unsafe { block.size() };

        // Carve the big free block into three 32-byte pieces, all allocated,
        // with whatever free space remains tacked onto the third as `rest`.
        let (a, b, c) = unsafe {
            lists.remove(block);
            block.write_block(32, true);
            let a = block;
            let b = a.next(32);
            b.write_block(32, true);
            let c = b.next(32);
            c.write_block(total - 64, true);
            (a, b, c)
        };

        // Free a and c first (neither neighbor is free yet), then free b:
        // b's coalesce should absorb both a and c into one block.
        unsafe {
            a.write_block(32, false);
            let merged = coalesce_block(&mut lists, a);
            lists.insert(merged);

            c.write_block(total - 64, false);
            let merged = coalesce_block(&mut lists, c);
            lists.insert(merged);

            lists.remove(a);
            lists.remove(c);
            b.write_block(32, false);
            let merged = coalesce_block(&mut lists, b);

            assert_eq!(merged, a);
            assert_eq!(merged.size(), total);
            assert!(!merged.is_alloc());
        }
    }
}
