//! The data pool: file contents stored as chains of variable-size extents.
//!
//! Every segment of the pool, free or in use, starts with an extent header.
//! Free segments form one chain whose head word sits at the start of the
//! filesystem region. Released chains are spliced back in front of it as
//! they are; nothing ever coalesces neighbouring free extents.

use log::{trace, warn};

use crate::config::*;
use crate::error::QuarkError;
use crate::layout::{read_free_head, write_free_head, Layout};
use crate::region::{bytes_mut, read_bytes, read_word, write_word, Region};
use crate::structs::Extent;
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub free_bytes: usize,      // Sum of free extent payloads
    pub free_footprint: usize,  // Free payloads plus their headers
    pub free_extents: usize,
    pub largest_free: usize,
}

fn max_steps(layout: &Layout) -> usize {
    layout.data_pool_size() / EXTENT_HEADER_SIZE + 1
}

pub fn read_extent(region: &impl Region, layout: &Layout, offset: u16) -> Result<Extent> {
    let at = layout.data_pool_offset() + offset as usize;
    let size = read_word(region, at)?;
    let next = read_word(region, at + 2)?;
    if offset as usize + EXTENT_HEADER_SIZE + size as usize > layout.data_pool_size() {
        return Err(QuarkError::OutOfBounds);
    }
    Ok(Extent { size, next: (next != FS_NULL_OFFSET).then_some(next) })
}

pub fn write_extent(region: &mut impl Region, layout: &Layout, offset: u16, extent: &Extent) -> Result<()> {
    let at = layout.data_pool_offset() + offset as usize;
    write_word(region, at, extent.size)?;
    write_word(region, at + 2, extent.next.unwrap_or(FS_NULL_OFFSET))
}

fn payload_at(layout: &Layout, offset: u16) -> usize {
    layout.data_pool_offset() + offset as usize + EXTENT_HEADER_SIZE
}

/// Turns the whole pool into a single free extent.
pub(crate) fn format_pool(region: &mut impl Region, layout: &Layout) -> Result<()> {
    let size = layout.data_pool_size() - EXTENT_HEADER_SIZE;
    write_extent(region, layout, 0, &Extent { size: size as u16, next: None })?;
    write_free_head(region, layout, Some(0))
}

/// Carves a chain of extents covering `size` bytes off the front of the
/// free list. Returns the chain head, or `None` for an empty chain.
///
/// Fails with `NoSpace` when the free list as a whole is too small; there
/// is no compaction pass to recover space lost to extent headers.
pub fn allocate_chain(region: &mut impl Region, layout: &Layout, size: usize) -> Result<Option<u16>> {
    if size == 0 {
        return Ok(None);
    }
    let stats = pool_stats(region, layout)?;
    if stats.free_bytes < size {
        warn!("extent pool: {} bytes requested, {} free", size, stats.free_bytes);
        return Err(QuarkError::NoSpace);
    }

    let mut remaining = size;
    let mut cursor = read_free_head(region, layout)?;
    let mut head = None;
    let mut tail: Option<u16> = None;
    while remaining > 0 {
        let offset = cursor.ok_or(QuarkError::NoSpace)?;
        let mut extent = read_extent(region, layout, offset)?;
        let next_free;
        if extent.size as usize > remaining + EXTENT_HEADER_SIZE {
            // Keep the front, hand the rest back as a smaller free extent.
            let rest = offset + (EXTENT_HEADER_SIZE + remaining) as u16;
            write_extent(region, layout, rest, &Extent {
                size: extent.size - (EXTENT_HEADER_SIZE + remaining) as u16,
                next: extent.next,
            })?;
            next_free = Some(rest);
            extent.size = remaining as u16;
            remaining = 0;
        } else {
            next_free = extent.next;
            remaining -= remaining.min(extent.size as usize);
        }
        extent.next = None;
        write_extent(region, layout, offset, &extent)?;
        trace!("extent pool: took {:#06x} ({} bytes)", offset, extent.size);

        match tail {
            Some(prev) => {
                let mut prev_extent = read_extent(region, layout, prev)?;
                prev_extent.next = Some(offset);
                write_extent(region, layout, prev, &prev_extent)?;
            }
            None => head = Some(offset),
        }
        tail = Some(offset);
        cursor = next_free;
    }
    write_free_head(region, layout, cursor)?;
    Ok(head)
}

/// Returns every extent of the chain to the free list.
/// Returns the number of extents released.
pub fn release_chain(region: &mut impl Region, layout: &Layout, head: Option<u16>) -> Result<usize> {
    let Some(head) = head else {
        return Ok(0);
    };
    let mut count = 1;
    let mut tail = head;
    let mut extent = read_extent(region, layout, tail)?;
    while let Some(next) = extent.next {
        count += 1;
        if count > max_steps(layout) {
            return Err(QuarkError::OutOfBounds);
        }
        tail = next;
        extent = read_extent(region, layout, tail)?;
    }
    extent.next = read_free_head(region, layout)?;
    write_extent(region, layout, tail, &extent)?;
    write_free_head(region, layout, Some(head))?;
    trace!("extent pool: released {} extents from {:#06x}", count, head);
    Ok(count)
}

/// Copies `data` into the chain in order. The chain must be large enough.
pub fn write_chain(region: &mut impl Region, layout: &Layout, head: Option<u16>, data: &[u8]) -> Result<()> {
    let mut written = 0;
    let mut cursor = head;
    while written < data.len() {
        let offset = cursor.ok_or(QuarkError::OutOfBounds)?;
        let extent = read_extent(region, layout, offset)?;
        let len = (extent.size as usize).min(data.len() - written);
        bytes_mut(region, payload_at(layout, offset), len)?
            .copy_from_slice(&data[written..written + len]);
        written += len;
        cursor = extent.next;
    }
    Ok(())
}

/// Copies the first `buf.len()` bytes of the chain into `buf`.
pub fn read_chain(region: &impl Region, layout: &Layout, head: Option<u16>, buf: &mut [u8]) -> Result<()> {
    let mut read = 0;
    let mut cursor = head;
    while read < buf.len() {
        let offset = cursor.ok_or(QuarkError::OutOfBounds)?;
        let extent = read_extent(region, layout, offset)?;
        let len = (extent.size as usize).min(buf.len() - read);
        buf[read..read + len].copy_from_slice(read_bytes(region, payload_at(layout, offset), len)?);
        read += len;
        cursor = extent.next;
    }
    Ok(())
}

/// Visits every extent of a chain, returning (extent count, payload bytes).
pub fn chain_usage(region: &impl Region, layout: &Layout, head: Option<u16>) -> Result<(usize, usize)> {
    let mut count = 0;
    let mut bytes = 0;
    let mut cursor = head;
    while let Some(offset) = cursor {
        count += 1;
        if count > max_steps(layout) {
            return Err(QuarkError::OutOfBounds);
        }
        let extent = read_extent(region, layout, offset)?;
        bytes += extent.size as usize;
        cursor = extent.next;
    }
    Ok((count, bytes))
}

pub fn pool_stats(region: &impl Region, layout: &Layout) -> Result<PoolStats> {
    let mut stats = PoolStats { capacity: layout.data_pool_size(), ..Default::default() };
    let mut cursor = read_free_head(region, layout)?;
    while let Some(offset) = cursor {
        stats.free_extents += 1;
        if stats.free_extents > max_steps(layout) {
            return Err(QuarkError::OutOfBounds);
        }
        let extent = read_extent(region, layout, offset)?;
        stats.free_bytes += extent.size as usize;
        stats.free_footprint += EXTENT_HEADER_SIZE + extent.size as usize;
        stats.largest_free = stats.largest_free.max(extent.size as usize);
        cursor = extent.next;
    }
    Ok(stats)
}
