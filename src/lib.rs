//! # rheap - A Best-Fit Boundary-Tag Heap
//!
//! This crate provides a **best-fit heap** that serves variable-size
//! allocations out of one fixed arena mapped once from the operating system
//! with `mmap(2)`. All bookkeeping lives inside the arena itself.
//!
//! ## Overview
//!
//! The arena is split into blocks laid out back to back. Every block starts
//! with a one-word header; free blocks also end with a footer (the "boundary
//! tag") mirroring their size:
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌─────┬──────────────┬──────────┬─────────────────────────┬──────────┬─────┐
//!   │ pad │  Busy  (24)  │ Busy (8) │        Free (104)       │   Busy   │ end │
//!   │  4  │ hdr│payload  │ hdr│pay  │ hdr│               │ftr │ hdr│...  │  4  │
//!   └─────┴──────────────┴──────────┴─────────────────────────┴──────────┴─────┘
//!            ▲
//!            └── Handle returned by alloc (8-byte aligned)
//! ```
//!
//! A header packs the block size together with two flags:
//!
//! ```text
//!   ┌──────────────────────────────────┬───┬───┐
//!   │        size (multiple of 8)      │ P │ A │
//!   └──────────────────────────────────┴───┴───┘
//!                                        │   └── this block is allocated
//!                                        └────── previous block is allocated
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Alignment macros (align!, align_to!)
//!   ├── block      - Header/footer word encoding (internal)
//!   ├── region     - mmap-backed arena (internal)
//!   ├── heap       - Heap and Handle
//!   ├── dump       - Block listing for debugging
//!   └── error      - HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::Heap;
//!
//! let mut heap = Heap::new();
//! heap.init(4096).unwrap();
//!
//! let handle = heap.alloc(42).unwrap();
//! heap.payload_mut(handle).unwrap()[..5].copy_from_slice(b"hello");
//! assert_eq!(&heap.payload(handle).unwrap()[..5], b"hello");
//!
//! heap.free(handle).unwrap();
//! print!("{}", heap.dump().unwrap());
//! ```
//!
//! ## How It Works
//!
//! **Allocation** rounds the request plus its header up to a multiple of 8,
//! then scans every block and picks the free block that leaves the least
//! slack. If the slack can hold a block of its own it is split off as a new
//! free block:
//!
//! ```text
//!   alloc(20):  needed = 24
//!
//!   before  ┌───────────────── Free (64) ─────────────────┐
//!   after   ┌─ Busy (24) ─┬──────────── Free (40) ────────┐
//! ```
//!
//! **Release** clears the allocated bit and merges the block with any free
//! neighbour right away, so two free blocks are never adjacent:
//!
//! ```text
//!   free(B):
//!
//!   before  ┌─ Free ─┬─ B ─┬─ Free ─┬─ Busy ─┐
//!   after   ┌────── Free (merged) ───┬─ Busy ─┐
//! ```
//!
//! The predecessor is only reached through its footer when B's
//! prev-allocated bit says it is free, so footers are never read for
//! allocated blocks.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed arena**: The arena never grows; a heap is initialized once
//! - **One arena per heap**: The initialized flag belongs to the `Heap`
//!   value, not the process; create one `Heap` to get one arena per process
//! - **O(n) allocation**: Best-fit walks every block
//! - **Foreign handles**: An aligned handle that `alloc` never returned
//!   (for example one into the middle of a live block) is not detected
//! - **Unix-only**: Requires `libc` and `mmap`
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: initialization failures at
//! `error`, rejected frees at `warn`, each allocation and free at `trace`.

pub mod align;
mod block;
mod dump;
mod error;
mod heap;
mod region;

pub use dump::{BlockInfo, BlockStatus, HeapDump};
pub use error::HeapError;
pub use heap::{Handle, Heap};
