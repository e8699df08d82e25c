//! # Byte primitives
//!
//! `spec.md` §6 lists `copy`/`fill` as externally supplied memmove- and
//! memset-equivalents. Rust's core library already provides exactly
//! these primitives; this module exists only so call sites in `lib.rs`
//! read as "call the byte-moving primitive" rather than reaching for
//! `core::ptr` directly, keeping the same "consumed interface, thinly
//! wrapped" shape as `arena.rs`.

use std::ptr::NonNull;

/// Copies `n` bytes from `src` to `dst`. Source and destination ranges
/// may overlap (memmove semantics).
///
/// # Safety
/// `src` and `dst` must each be valid for reads/writes of `n` bytes.
pub unsafe fn copy(dst: NonNull<u8>, src: NonNull<u8>, n: usize) {
    unsafe { std::ptr::copy(src.as_ptr(), dst.as_ptr(), n) }
}

/// Fills `n` bytes starting at `dst` with `byte`.
///
/// # Safety
/// `dst` must be valid for writes of `n` bytes.
pub unsafe fn fill(dst: NonNull<u8>, byte: u8, n: usize) {
    unsafe { std::ptr::write_bytes(dst.as_ptr(), byte, n) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_moves_bytes() {
        let mut src = [1u8, 2, 3, 4];
        let mut dst = [0u8; 4];
        unsafe {
            copy(
                NonNull::new(dst.as_mut_ptr()).unwrap(),
                NonNull::new(src.as_mut_ptr()).unwrap(),
                4,
            );
        }
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn fill_writes_repeated_byte() {
        let mut buf = [0xFFu8; 6];
        unsafe {
            fill(NonNull::new(buf.as_mut_ptr()).unwrap(), 0, 6);
        }
        assert_eq!(buf, [0u8; 6]);
    }
}
