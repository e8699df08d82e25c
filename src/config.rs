//! Tuning constants for the heap layout and placement policy.
//!
//! These are part of the allocator's ABI contract (alignment, block
//! overhead) and the documented tradeoffs around list granularity, not
//! runtime-configurable knobs — see the design notes in `spec.md` §9.

/// Machine word size in bytes.
pub const WSIZE: usize = size_of::<u64>();

/// Double-word size in bytes; every block size is a multiple of this.
pub const DSIZE: usize = 2 * WSIZE;

/// ABI-required payload/block alignment, in bytes.
pub const ALIGNMENT: usize = 16;

/// Smallest legal block size: header + two free-list pointers + footer.
pub const MIN_BLOCK_SIZE: usize = 2 * DSIZE;

/// Default arena extension size when no fit is found and the caller
/// didn't request more than this.
pub const CHUNKSIZE: usize = 1 << 12;

/// Number of size-segregated free lists.
pub const NUM_SIZE_CLASSES: usize = 15;

/// Low bit of a boundary tag: 1 means allocated.
pub const ALLOC_MASK: u64 = 0x1;

/// Mask that strips the low 4 tag bits, leaving only the size.
pub const SIZE_MASK: u64 = !0xFu64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_block_size_is_16_aligned() {
        assert_eq!(MIN_BLOCK_SIZE % ALIGNMENT, 0);
        assert_eq!(MIN_BLOCK_SIZE, 32);
    }

    #[test]
    fn chunksize_is_dsize_multiple() {
        assert_eq!(CHUNKSIZE % DSIZE, 0);
    }
}
