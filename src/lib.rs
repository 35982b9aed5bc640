//! Quark is the memory and storage core of an OS-less calculator firmware.
//! It carves a dynamic-allocation heap and a small hierarchical filesystem
//! out of fixed, battery-retained RAM windows.
//!
//! Quark's memory layout (device addresses, ClassWiz II profile):
//! - 0x9000..0x9C04    VRAM, not ours
//! - heap_base         Heap arena, `heap_size` bytes
//! - heap_base + size  Filesystem region, `fs_size` bytes:
//!   - Free-list head word of the data pool
//!   - Node table, `max_nodes` records of 20 bytes (slot 0 is the root)
//!   - Data pool of extents
//!
//! Quark's layers (from bottom to top):
//! 1. Region: Byte window the core works on.                  | User supplied (static RAM, Vec, etc.)
//! 2. Heap: First-fit allocator with deferred coalescing.      | Quark implemented
//! 3. Node table / Extent pool: Fixed-record metadata, chained file data.
//! 4. Tree / Path: Sibling-chained hierarchy and path walking.
//! 5. File: Whole-file reads and writes.
//! 6. FileSystem: The facade handed to the rest of the firmware.
//!
//! There is a single thread of execution. Nothing here is reentrant: if an
//! interrupt handler touches the heap or the filesystem, mask it around
//! every call from the main loop. [`LockedHeap`] covers the allocator side
//! with a spin lock.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod error;
mod region;
mod layout;
mod heap;
mod global;
mod structs;
mod node;
mod extent;
mod tree;
mod path;
mod file;
mod fs;

pub use config::*;
pub use region::Region;
pub use layout::{read_free_head, write_free_head, Layout};
pub use heap::{BlockInfo, Blocks, Heap, HeapPtr, HeapStats};
pub use global::{LockedHeap, RawArena};
pub use structs::*;
pub use node::{count_free_nodes, get_live_node, get_node, write_node};
pub use extent::{
    allocate_chain, chain_usage, pool_stats, read_chain, read_extent, release_chain, write_chain,
    write_extent, PoolStats,
};
pub use tree::{children, create, delete, encode_name, find_child, move_node, rename, chmod};
pub use path::{components, is_absolute, resolve, resolve_parent, split};
pub use file::{read_file, write_file};
pub use fs::FileSystem;
pub use error::QuarkError as Error;
pub use error::Result;
