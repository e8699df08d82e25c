//! # Block layout
//!
//! Pure functions over raw heap addresses, per `spec.md` §4.1 / §3.
//!
//! Every block — allocated or free — begins with an 8-byte header and
//! ends with an 8-byte footer duplicating it. A free block additionally
//! overlays two 8-byte free-list pointers (predecessor, successor)
//! immediately after the header, inside what would otherwise be payload.
//!
//! This is the same boundary-tag shape `original_source/mm.c`'s
//! `block_t` uses (a C union of `{pred, succ}` vs. a flexible
//! `payload[0]` array); Rust has no flexible array members, so the
//! equivalent here is a newtype over the header's address plus raw
//! pointer arithmetic, in the same spirit as the teacher crate's
//! `Block::new`/pointer-offset style in `bump.rs`.

use std::ptr::NonNull;

use crate::config::{ALLOC_MASK, SIZE_MASK};

/// Packs a block size and allocation flag into a boundary-tag word.
///
/// # Panics
/// Panics if `size` is not a multiple of 16 — every block size must be,
/// per `spec.md` invariant 1.
pub fn pack(size: usize, alloc: bool) -> u64 {
    debug_assert_eq!(size & 0xF, 0, "block size must be 16-byte aligned");
    let mut word = size as u64;
    if alloc {
        word |= ALLOC_MASK;
    }
    word
}

/// Extracts the size encoded in a boundary-tag word.
pub fn size_of_word(word: u64) -> usize {
    (word & SIZE_MASK) as usize
}

/// Extracts the allocation flag encoded in a boundary-tag word.
pub fn alloc_of_word(word: u64) -> bool {
    word & ALLOC_MASK != 0
}

/// A block in the heap, identified by the address of its header.
///
/// Cheap to copy — it's just a pointer — and carries no lifetime of its
/// own; the caller is responsible for only dereferencing it while the
/// arena is alive and the block hasn't been coalesced away.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RawBlock {
    header: NonNull<u8>,
}

impl RawBlock {
    /// Wraps the header address `addr` as a block.
    pub fn at(addr: NonNull<u8>) -> Self {
        Self { header: addr }
    }

    /// The address of this block's header (== the block's address).
    pub fn addr(self) -> NonNull<u8> {
        self.header
    }

    fn header_ptr(self) -> *mut u64 {
        self.header.as_ptr() as *mut u64
    }

    /// Reads this block's header word.
    ///
    /// # Safety
    /// The header must be a valid, initialized boundary tag.
    pub unsafe fn header(self) -> u64 {
        unsafe { self.header_ptr().read() }
    }

    fn footer_ptr(self, size: usize) -> *mut u64 {
        (self.header.as_ptr() as usize + size - 8) as *mut u64
    }

    /// Reads this block's footer word, given the block's own size.
    ///
    /// # Safety
    /// The block must be a non-sentinel, fully written block of `size`
    /// bytes.
    pub unsafe fn footer(self, size: usize) -> u64 {
        unsafe { self.footer_ptr(size).read() }
    }

    /// This block's size, read from its header.
    ///
    /// # Safety
    /// Same as [`RawBlock::header`].
    pub unsafe fn size(self) -> usize {
        unsafe { size_of_word(self.header()) }
    }

    /// This block's allocation flag, read from its header.
    ///
    /// # Safety
    /// Same as [`RawBlock::header`].
    pub unsafe fn is_alloc(self) -> bool {
        unsafe { alloc_of_word(self.header()) }
    }

    /// The payload address: immediately after the header.
    pub fn payload(self) -> NonNull<u8> {
        NonNull::new((self.header.as_ptr() as usize + 8) as *mut u8)
            .expect("header address is non-null, so payload is too")
    }

    /// Recovers the block owning a payload pointer previously handed to
    /// a caller.
    pub fn from_payload(payload: NonNull<u8>) -> Self {
        let header = (payload.as_ptr() as usize - 8) as *mut u8;
        Self {
            header: NonNull::new(header).expect("payload - 8 must stay non-null"),
        }
    }

    /// Writes this block's header and mirrors it to the footer.
    ///
    /// # Safety
    /// `size` must be at least `MIN_BLOCK_SIZE` for a free block, or at
    /// least 32 for an allocated block (`spec.md` §3), and the region
    /// `[header, header + size)` must be valid for writes.
    pub unsafe fn write_block(self, size: usize, alloc: bool) {
        let word = pack(size, alloc);
        unsafe {
            self.header_ptr().write(word);
            self.footer_ptr(size).write(word);
        }
    }

    /// Writes a zero-size, allocated epilogue header at this address (no
    /// footer — the epilogue is a sentinel, not a real block).
    ///
    /// # Safety
    /// This block's address must be exactly `arena.hi() - 7`.
    pub unsafe fn write_epilogue(self) {
        unsafe { self.header_ptr().write(pack(0, true)) }
    }

    /// The block immediately following this one in address order.
    ///
    /// # Safety
    /// Must not be called on the epilogue (it has no "next").
    pub unsafe fn next(self, size: usize) -> Self {
        Self::at(
            NonNull::new((self.header.as_ptr() as usize + size) as *mut u8)
                .expect("next block address must stay non-null"),
        )
    }

    /// The block immediately preceding this one in address order, or
    /// `None` if this is the first real block (its predecessor word is
    /// the bare prologue footer, size 0).
    ///
    /// Preserves the reference implementation's trick of not needing an
    /// explicit heap-bounds check here: the prologue is written as a
    /// zero-size footer, so a size-0 read is unambiguous proof there's
    /// no real predecessor (`spec.md` §9 Open Question).
    ///
    /// # Safety
    /// The 8 bytes immediately before this block's header must be
    /// readable (true for every block except one placed at `arena.lo()`,
    /// which callers never do — the prologue always precedes it).
    pub unsafe fn prev(self) -> Option<Self> {
        let prev_footer_addr = self.header.as_ptr() as usize - 8;
        let prev_footer = unsafe { (prev_footer_addr as *const u64).read() };
        let prev_size = size_of_word(prev_footer);
        if prev_size == 0 {
            return None;
        }
        let prev_header_addr = prev_footer_addr + 8 - prev_size;
        Some(Self::at(
            NonNull::new(prev_header_addr as *mut u8).expect("prev header address must be non-null"),
        ))
    }

    fn pred_slot(self) -> *mut usize {
        (self.header.as_ptr() as usize + 8) as *mut usize
    }

    fn succ_slot(self) -> *mut usize {
        (self.header.as_ptr() as usize + 8 + 8) as *mut usize
    }

    /// Reads the predecessor free-list pointer overlaid on this block's
    /// payload.
    ///
    /// # Safety
    /// The block must currently be free (and therefore at least
    /// `MIN_BLOCK_SIZE`).
    pub unsafe fn pred(self) -> Option<Self> {
        let raw = unsafe { self.pred_slot().read() };
        NonNull::new(raw as *mut u8).map(Self::at)
    }

    /// Writes the predecessor free-list pointer.
    ///
    /// # Safety
    /// Same as [`RawBlock::pred`].
    pub unsafe fn set_pred(self, pred: Option<Self>) {
        let raw = pred.map(|b| b.addr().as_ptr() as usize).unwrap_or(0);
        unsafe { self.pred_slot().write(raw) }
    }

    /// Reads the successor free-list pointer overlaid on this block's
    /// payload.
    ///
    /// # Safety
    /// Same as [`RawBlock::pred`].
    pub unsafe fn succ(self) -> Option<Self> {
        let raw = unsafe { self.succ_slot().read() };
        NonNull::new(raw as *mut u8).map(Self::at)
    }

    /// Writes the successor free-list pointer.
    ///
    /// # Safety
    /// Same as [`RawBlock::pred`].
    pub unsafe fn set_succ(self, succ: Option<Self>) {
        let raw = succ.map(|b| b.addr().as_ptr() as usize).unwrap_or(0);
        unsafe { self.succ_slot().write(raw) }
    }
}
