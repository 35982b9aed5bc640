//! First-fit heap allocator over a fixed arena.
//!
//! The arena is a chain of blocks in ascending address order, each one a
//! `BLOCK_HEADER_SIZE` header followed by its payload. `free` only flips the
//! header flag; adjacent free blocks stay separate until the caller runs
//! `merge` at an idle point. Release is O(1) that way, which matters more on
//! the target than the fragmentation it leaves behind.

use log::{debug, trace, warn};

use crate::config::*;
use crate::error::QuarkError;
use crate::region::{bytes_mut, read_bytes, read_word, write_bytes, write_word, Region};
use crate::Result;

/// Handle to an allocated payload: its byte offset inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapPtr(u16);

impl HeapPtr {
    pub(crate) fn from_offset(offset: u16) -> Self {
        Self(offset)
    }

    pub fn offset(self) -> usize {
        self.0 as usize
    }

    /// Absolute address of the payload for an arena mapped at `base`.
    pub fn addr(self, base: usize) -> usize {
        base + self.offset()
    }

    fn header(self) -> Result<usize> {
        self.offset()
            .checked_sub(BLOCK_HEADER_SIZE)
            .ok_or(QuarkError::InvalidHandle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    size: u16,
    next: u16,
    free: bool,
}

/// A block as seen by [`Heap::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub offset: usize,  // Header offset in the arena
    pub size: usize,    // Payload capacity
    pub free: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub capacity: usize,
    pub used_blocks: usize,
    pub free_blocks: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    pub largest_free: usize,
}

fn align_up(size: usize) -> Result<usize> {
    let aligned = size
        .checked_add(HEAP_BLOCK_ALIGN - 1)
        .ok_or(QuarkError::OutOfMemory)?
        & !(HEAP_BLOCK_ALIGN - 1);
    if aligned > u16::MAX as usize {
        return Err(QuarkError::OutOfMemory);
    }
    Ok(aligned)
}

#[derive(Debug)]
pub struct Heap<R: Region> {
    arena: R,
}

impl<R: Region> Heap<R> {
    /// Formats the arena as a single free block spanning all of it.
    pub fn init(mut arena: R) -> Result<Self> {
        let capacity = arena.len();
        if capacity <= BLOCK_HEADER_SIZE
            || capacity >= NULL_BLOCK as usize
            || capacity % HEAP_BLOCK_ALIGN != 0
        {
            return Err(QuarkError::InvalidLayout);
        }
        let size = capacity - BLOCK_HEADER_SIZE;
        let mut heap = Self { arena };
        heap.write_header(0, &BlockHeader { size: size as u16, next: NULL_BLOCK, free: true })?;
        debug!("heap: formatted {} byte arena, {} bytes free", capacity, size);
        Ok(heap)
    }

    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    pub fn arena(&self) -> &R {
        &self.arena
    }

    pub fn into_inner(self) -> R {
        self.arena
    }

    fn read_header(&self, at: usize) -> Result<BlockHeader> {
        let size = read_word(&self.arena, at)?;
        let next = read_word(&self.arena, at + 2)?;
        let free = read_bytes(&self.arena, at + 4, 1)?[0] != 0;
        if at + BLOCK_HEADER_SIZE + size as usize > self.arena.len() {
            return Err(QuarkError::OutOfBounds);
        }
        Ok(BlockHeader { size, next, free })
    }

    fn write_header(&mut self, at: usize, header: &BlockHeader) -> Result<()> {
        write_word(&mut self.arena, at, header.size)?;
        write_word(&mut self.arena, at + 2, header.next)?;
        write_bytes(&mut self.arena, at + 4, &[header.free as u8, 0])
    }

    /// Header of a block handed out earlier; fails on anything that is not
    /// a live allocation.
    fn used_header(&self, ptr: HeapPtr) -> Result<(usize, BlockHeader)> {
        let at = ptr.header()?;
        if at + BLOCK_HEADER_SIZE > self.arena.len() {
            return Err(QuarkError::InvalidHandle);
        }
        let header = self.read_header(at)?;
        if header.free {
            return Err(QuarkError::InvalidOperation);
        }
        Ok((at, header))
    }

    /// Shrinks the block at `at` to `want` bytes, splitting off the tail as
    /// a new free block when it is larger than one header.
    fn split(&mut self, at: usize, header: &mut BlockHeader, want: usize) -> Result<()> {
        let remainder = header.size as usize - want;
        if remainder > BLOCK_HEADER_SIZE {
            let tail_at = at + BLOCK_HEADER_SIZE + want;
            let tail = BlockHeader {
                size: (remainder - BLOCK_HEADER_SIZE) as u16,
                next: header.next,
                free: true,
            };
            self.write_header(tail_at, &tail)?;
            header.size = want as u16;
            header.next = tail_at as u16;
            trace!("heap: split block {:#06x}, tail {:#06x} holds {} bytes", at, tail_at, tail.size);
        }
        self.write_header(at, header)
    }

    /// First-fit allocation of at least `size` bytes.
    pub fn alloc(&mut self, size: usize) -> Result<HeapPtr> {
        let want = align_up(size)?;
        let mut at = 0;
        loop {
            let mut header = self.read_header(at)?;
            if header.free && header.size as usize >= want {
                header.free = false;
                self.split(at, &mut header, want)?;
                trace!("heap: alloc {} bytes at {:#06x}", want, at + BLOCK_HEADER_SIZE);
                return Ok(HeapPtr::from_offset((at + BLOCK_HEADER_SIZE) as u16));
            }
            if header.next == NULL_BLOCK {
                break;
            }
            at = header.next as usize;
        }
        warn!("heap: out of memory for {} bytes", want);
        Err(QuarkError::OutOfMemory)
    }

    /// Allocates `count * size` zeroed bytes. The product must fit a word.
    pub fn calloc(&mut self, count: usize, size: usize) -> Result<HeapPtr> {
        let total = count
            .checked_mul(size)
            .filter(|total| *total <= u16::MAX as usize)
            .ok_or(QuarkError::OutOfMemory)?;
        let ptr = self.alloc(total)?;
        self.payload_mut(ptr)?.fill(0);
        Ok(ptr)
    }

    /// Resizes an allocation, in place when possible.
    ///
    /// Growing first tries to absorb the immediately following block if it
    /// is free and large enough; otherwise a new block is allocated, the old
    /// contents are copied over and the old block is released.
    pub fn realloc(&mut self, ptr: Option<HeapPtr>, size: usize) -> Result<HeapPtr> {
        let Some(ptr) = ptr else {
            return self.alloc(size);
        };
        let (at, mut header) = self.used_header(ptr)?;
        let want = align_up(size)?;

        if want <= header.size as usize {
            self.split(at, &mut header, want)?;
            return Ok(ptr);
        }

        if header.next != NULL_BLOCK {
            let next = self.read_header(header.next as usize)?;
            let combined = header.size as usize + BLOCK_HEADER_SIZE + next.size as usize;
            if next.free && combined >= want {
                trace!("heap: grow {:#06x} in place by absorbing {:#06x}", at, header.next);
                header.size = combined as u16;
                header.next = next.next;
                self.split(at, &mut header, want)?;
                return Ok(ptr);
            }
        }

        let fresh = self.alloc(size)?;
        let keep = (header.size as usize).min(want);
        self.arena
            .bytes_mut()
            .copy_within(ptr.offset()..ptr.offset() + keep, fresh.offset());
        self.free(ptr)?;
        Ok(fresh)
    }

    /// Marks the block free. Neighbours are left alone until [`Heap::merge`].
    pub fn free(&mut self, ptr: HeapPtr) -> Result<()> {
        let (at, mut header) = self.used_header(ptr)?;
        header.free = true;
        self.write_header(at, &header)?;
        trace!("heap: free {:#06x}", ptr.offset());
        Ok(())
    }

    /// Coalesces every run of adjacent free blocks in one pass.
    /// Returns the number of blocks absorbed.
    pub fn merge(&mut self) -> Result<usize> {
        let mut merged = 0;
        let mut at = 0;
        loop {
            let mut header = self.read_header(at)?;
            if header.free {
                let mut grew = false;
                while header.next != NULL_BLOCK {
                    let next = self.read_header(header.next as usize)?;
                    if !next.free {
                        break;
                    }
                    header.size += BLOCK_HEADER_SIZE as u16 + next.size;
                    header.next = next.next;
                    merged += 1;
                    grew = true;
                }
                if grew {
                    self.write_header(at, &header)?;
                }
            }
            if header.next == NULL_BLOCK {
                break;
            }
            at = header.next as usize;
        }
        debug!("heap: merge absorbed {} blocks", merged);
        Ok(merged)
    }

    /// Payload capacity of a live allocation (the rounded request, or a
    /// little more when the block was consumed whole).
    pub fn capacity_of(&self, ptr: HeapPtr) -> Result<usize> {
        Ok(self.used_header(ptr)?.1.size as usize)
    }

    pub fn payload(&self, ptr: HeapPtr) -> Result<&[u8]> {
        let (_, header) = self.used_header(ptr)?;
        read_bytes(&self.arena, ptr.offset(), header.size as usize)
    }

    pub fn payload_mut(&mut self, ptr: HeapPtr) -> Result<&mut [u8]> {
        let (_, header) = self.used_header(ptr)?;
        bytes_mut(&mut self.arena, ptr.offset(), header.size as usize)
    }

    pub fn blocks(&self) -> Blocks<'_, R> {
        Blocks { heap: self, cursor: Some(0) }
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats { capacity: self.capacity(), ..Default::default() };
        for block in self.blocks() {
            if block.free {
                stats.free_blocks += 1;
                stats.free_bytes += block.size;
                stats.largest_free = stats.largest_free.max(block.size);
            } else {
                stats.used_blocks += 1;
                stats.used_bytes += block.size;
            }
        }
        stats
    }
}

/// Walks the block chain in address order.
pub struct Blocks<'a, R: Region> {
    heap: &'a Heap<R>,
    cursor: Option<usize>,
}

impl<R: Region> Iterator for Blocks<'_, R> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let at = self.cursor?;
        let header = self.heap.read_header(at).ok()?;
        // Headers only ever link forward; anything else ends the walk.
        self.cursor = (header.next != NULL_BLOCK && header.next as usize > at)
            .then_some(header.next as usize);
        Some(BlockInfo { offset: at, size: header.size as usize, free: header.free })
    }
}
