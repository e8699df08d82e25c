//! # Arena interface
//!
//! The raw `sbrk`-style growable arena the allocator is built on top of.
//! `spec.md` §6 treats this as an externally supplied primitive; this
//! crate has no separate benchmark harness to supply one, so it is
//! implemented here as a thin wrapper around `libc::sbrk`.
//!
//! Like the teacher crate's use of `libc::sbrk` in `bump.rs`, failure is
//! detected by comparing the raw return value against the `(void*)-1`
//! sentinel before doing anything with it.

use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};

/// The arena is exhausted: the underlying `sbrk` call failed.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("arena exhausted: sbrk failed to extend the heap by {delta} bytes")]
    Exhausted { delta: usize },
}

/// A single contiguous, growable-at-the-top byte region.
///
/// `Arena` does not itself track a length; `hi()` always re-reads the
/// live program break via `sbrk(0)`. This mirrors the real constraint
/// that the break is process-wide OS state: nothing prevents it from
/// moving out from under us except the single-client assumption
/// `spec.md` §5 already requires.
pub struct Arena {
    lo: Option<NonNull<u8>>,
}

impl Arena {
    /// An arena with nothing extended yet.
    pub const fn new() -> Self {
        Self { lo: None }
    }

    /// Grows the arena by `delta` bytes and returns the address of the
    /// first new byte (the previous break), or `ArenaError::Exhausted`
    /// if `sbrk` reports failure. `delta` may be zero, in which case the
    /// current break is returned without growing anything.
    pub fn extend(&mut self, delta: usize) -> Result<NonNull<u8>, ArenaError> {
        let raw = unsafe { sbrk(delta as intptr_t) };
        if raw as usize == usize::MAX {
            return Err(ArenaError::Exhausted { delta });
        }

        let ptr = NonNull::new(raw as *mut u8).expect("sbrk returned a null, non-sentinel break");
        if self.lo.is_none() {
            self.lo = Some(ptr);
        }
        Ok(ptr)
    }

    /// The lowest address ever handed out by this arena, or `None` if
    /// the arena has never been extended.
    pub fn lo(&self) -> Option<NonNull<u8>> {
        self.lo
    }

    /// The address of the last valid byte in the arena (inclusive), or
    /// `None` if the arena has never been extended.
    pub fn hi(&self) -> Option<NonNull<u8>> {
        self.lo?;
        let brk = unsafe { sbrk(0) };
        if brk as usize == usize::MAX || (brk as *const c_void).is_null() {
            return None;
        }
        NonNull::new((brk as usize - 1) as *mut u8)
    }

    /// Whether `addr` lies within `[lo, hi]`.
    pub fn contains(&self, addr: NonNull<u8>) -> bool {
        match (self.lo, self.hi()) {
            (Some(lo), Some(hi)) => {
                let a = addr.as_ptr() as usize;
                a >= lo.as_ptr() as usize && a <= hi.as_ptr() as usize
            }
            _ => false,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_tracks_lo_and_advances_hi() {
        let mut arena = Arena::new();
        assert!(arena.lo().is_none());

        let first = arena.extend(64).expect("sbrk should not fail in tests");
        assert_eq!(arena.lo(), Some(first));

        let hi_after_first = arena.hi().expect("hi must be set after an extension");
        assert!(hi_after_first.as_ptr() as usize >= first.as_ptr() as usize + 63);

        let second = arena.extend(64).expect("sbrk should not fail in tests");
        // lo is pinned to the first extension.
        assert_eq!(arena.lo(), Some(first));
        assert!(second.as_ptr() as usize >= first.as_ptr() as usize + 64);
    }

    #[test]
    fn extend_zero_returns_current_break_without_growing() {
        let mut arena = Arena::new();
        let first = arena.extend(32).unwrap();
        let hi_before = arena.hi().unwrap();
        let queried = arena.extend(0).unwrap();
        assert_eq!(queried.as_ptr() as usize, hi_before.as_ptr() as usize + 1);
        assert_eq!(arena.lo(), Some(first));
    }

    #[test]
    fn contains_reflects_current_bounds() {
        let mut arena = Arena::new();
        let first = arena.extend(128).unwrap();
        assert!(arena.contains(first));
        assert!(!arena.contains(NonNull::new(1 as *mut u8).unwrap()));
    }
}
