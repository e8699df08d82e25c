//! # Free-list index
//!
//! A fixed-width array of 15 list heads, per `spec.md` §4.2 / §3. Every
//! free block belongs to exactly one list, inserted at the head (LIFO)
//! for O(1) cost and cache locality of recently freed blocks — see the
//! design notes in `spec.md` §9.
//!
//! Grounded directly on `original_source/mm.c`'s `find_index`,
//! `insert_to_free_list`, and `remove_from_free_list`; only the pointer
//! representation changes (raw C pointers become `block::RawBlock`).

use crate::block::RawBlock;
use crate::config::NUM_SIZE_CLASSES;

/// The size-segregated free-list heads.
pub struct FreeLists {
    heads: [Option<RawBlock>; NUM_SIZE_CLASSES],
}

impl FreeLists {
    /// All lists empty.
    pub const fn new() -> Self {
        Self {
            heads: [None; NUM_SIZE_CLASSES],
        }
    }

    /// The size class a block of size `size` belongs in, per the
    /// power-of-two cascade in `spec.md` §3:
    /// `class(s) = 0` for `s <= 16`, `i` for `2^(i+3) < s <= 2^(i+4)`
    /// (`1 <= i <= 13`), `14` for `s > 2^17`.
    pub fn class_of(size: usize) -> usize {
        if size <= 16 {
            return 0;
        }
        for i in 1..NUM_SIZE_CLASSES {
            if (1usize << (i + 3)) < size && size <= (1usize << (i + 4)) {
                return i;
            }
        }
        NUM_SIZE_CLASSES - 1
    }

    /// The head of list `class`, if non-empty.
    pub fn head(&self, class: usize) -> Option<RawBlock> {
        self.heads[class]
    }

    /// Pushes `block` onto the head of the list for its own size class.
    ///
    /// # Safety
    /// `block` must be free and not already linked into any free list.
    pub unsafe fn insert(&mut self, block: RawBlock) {
        let class = Self::class_of(unsafe { block.size() });
        let old_head = self.heads[class];
        unsafe {
            block.set_pred(None);
            block.set_succ(old_head);
            if let Some(head) = old_head {
                head.set_pred(Some(block));
            }
        }
        self.heads[class] = Some(block);
    }

    /// Splices `block` out of whichever list it's currently in.
    ///
    /// # Safety
    /// `block` must currently be linked into its size class's list
    /// (i.e. it was previously `insert`ed and not yet `remove`d).
    pub unsafe fn remove(&mut self, block: RawBlock) {
        let class = Self::class_of(unsafe { block.size() });
        let (pred, succ) = unsafe { (block.pred(), block.succ()) };

        match (pred, succ) {
            (None, None) => self.heads[class] = None,
            (None, Some(succ)) => {
                unsafe { succ.set_pred(None) };
                self.heads[class] = Some(succ);
            }
            (Some(pred), None) => unsafe { pred.set_succ(None) },
            (Some(pred), Some(succ)) => unsafe {
                pred.set_succ(Some(succ));
                succ.set_pred(Some(pred));
            },
        }
    }

    /// Iterates the blocks in list `class`, head to tail.
    pub fn iter(&self, class: usize) -> FreeListIter {
        FreeListIter {
            current: self.heads[class],
        }
    }
}

impl Default for FreeLists {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over one size class's free list, head to tail.
pub struct FreeListIter {
    current: Option<RawBlock>,
}

impl Iterator for FreeListIter {
    type Item = RawBlock;

    fn next(&mut self) -> Option<RawBlock> {
        let block = self.current?;
        self.current = unsafe { block.succ() };
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr::NonNull;

    fn make_block(buf: &mut [u8], size: usize) -> RawBlock {
        let block = RawBlock::at(NonNull::new(buf.as_mut_ptr()).unwrap());
        unsafe { block.write_block(size, false) };
        block
    }

    #[test]
    fn class_of_matches_spec_formula() {
        assert_eq!(FreeLists::class_of(16), 0);
        assert_eq!(FreeLists::class_of(17), 1);
        assert_eq!(FreeLists::class_of(32), 1);
        assert_eq!(FreeLists::class_of(33), 2);
        assert_eq!(FreeLists::class_of(64), 2);
        assert_eq!(FreeLists::class_of(100), 3);
        assert_eq!(FreeLists::class_of(1000), 6);
        assert_eq!(FreeLists::class_of(10_000), 10);
        assert_eq!(FreeLists::class_of(1 << 17), 13);
        assert_eq!(FreeLists::class_of((1 << 17) + 1), 14);
        assert_eq!(FreeLists::class_of(usize::MAX), 14);
    }

    #[test]
    fn insert_is_lifo_and_remove_splices_correctly() {
        let mut lists = FreeLists::new();
        let mut buf_a = vec![0u8; 32];
        let mut buf_b = vec![0u8; 32];
        let mut buf_c = vec![0u8; 32];
        let a = make_block(&mut buf_a, 32);
        let b = make_block(&mut buf_b, 32);
        let c = make_block(&mut buf_c, 32);

        unsafe {
            lists.insert(a);
            lists.insert(b);
            lists.insert(c);
        }

        let class = FreeLists::class_of(32);
        let order: Vec<RawBlock> = lists.iter(class).collect();
        assert_eq!(order, vec![c, b, a]);

        unsafe { lists.remove(b) };
        let order: Vec<RawBlock> = lists.iter(class).collect();
        assert_eq!(order, vec![c, a]);

        unsafe { lists.remove(c) };
        let order: Vec<RawBlock> = lists.iter(class).collect();
        assert_eq!(order, vec![a]);

        unsafe { lists.remove(a) };
        assert!(lists.head(class).is_none());
    }
}
