//! An interactive, `sbrk`-observing walkthrough of the allocator, in the
//! same spirit as the teacher crate's `examples/bump.rs`: pause between
//! steps so the program break can be inspected with `pmap`/`htop`/`gdb`.

use std::io::Read;

use libc::sbrk;
use segalloc::Allocator;

fn block_until_enter_pressed() {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
    println!(
        "[{label}] PID = {}, program break (sbrk(0)) = {:?}",
        std::process::id(),
        unsafe { sbrk(0) },
    );
}

fn main() {
    let mut alloc = Allocator::new();

    print_program_break("start");
    block_until_enter_pressed();

    println!("\n[1] Allocate 24 bytes");
    let first = alloc.malloc(24);
    assert!(!first.is_null());
    unsafe { (first as *mut u64).write(0xDEAD_BEEF) };
    println!("[1] address = {first:?}, checkheap = {}", alloc.checkheap(0));
    block_until_enter_pressed();

    println!("\n[2] Allocate another 24 bytes (observe the split)");
    let second = alloc.malloc(24);
    println!(
        "[2] address = {:?}, distance from first = {}",
        second,
        second as usize - first as usize
    );
    block_until_enter_pressed();

    println!("\n[3] Free the first block, then reallocate 24 bytes");
    unsafe { alloc.free(first) };
    let third = alloc.malloc(24);
    println!(
        "[3] reused the freed block? {}",
        if third == first { "yes" } else { "no" }
    );
    block_until_enter_pressed();

    println!("\n[4] Allocate a 64 KiB block to force arena growth");
    print_program_break("before large alloc");
    let big = alloc.malloc(64 * 1024);
    assert!(!big.is_null());
    print_program_break("after large alloc");
    println!("[4] checkheap = {}", alloc.checkheap(0));

    println!("\n[5] End of demo.");
}
