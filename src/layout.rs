//! Memory layout of the two reserved regions.
//!
//! The heap arena sits at `heap_base`; the filesystem region follows it
//! immediately and is laid out as:
//! - Free-list head word (extent pool)
//! - Node table (`max_nodes` records of `NODE_SIZE` bytes)
//! - Data pool (everything that is left)

use crate::config::*;
use crate::error::QuarkError;
use crate::region::{read_word, write_word, Region};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub heap_base: usize,   // Absolute address of the heap arena
    pub heap_size: usize,   // Heap arena capacity in bytes
    pub fs_size: usize,     // Filesystem region capacity in bytes
    pub max_nodes: usize,   // Node table capacity, root included
}

impl Layout {
    /// ClassWiz II models: VRAM at 0x9000.
    pub const CWII: Self = Self {
        heap_base: 0x9000 + 0xC04,
        heap_size: 0x1400,
        fs_size: 0x3800,
        max_nodes: 255,
    };

    /// ClassWiz X models: VRAM at 0xD000, smaller regions.
    pub const CWX: Self = Self {
        heap_base: 0xD000 + 0x604,
        heap_size: 0xA00,
        fs_size: 0x1000,
        max_nodes: 64,
    };

    pub fn new(heap_base: usize, heap_size: usize, fs_size: usize, max_nodes: usize) -> Result<Self> {
        let layout = Self { heap_base, heap_size, fs_size, max_nodes };
        layout.validate()?;
        Ok(layout)
    }

    /// Checks that every offset the formats store fits its word and that
    /// both regions have room for at least one header.
    pub fn validate(&self) -> Result<()> {
        // Node indices are single bytes and 0xFF is reserved.
        if self.max_nodes == 0 || self.max_nodes > FS_INVALID_IDX as usize {
            return Err(QuarkError::InvalidLayout);
        }
        if self.heap_size <= BLOCK_HEADER_SIZE
            || self.heap_size >= NULL_BLOCK as usize
            || self.heap_size % HEAP_BLOCK_ALIGN != 0
        {
            return Err(QuarkError::InvalidLayout);
        }
        let pool_offset = FREE_LIST_HEAD_SIZE + NODE_SIZE * self.max_nodes;
        if self.fs_size <= pool_offset + EXTENT_HEADER_SIZE {
            return Err(QuarkError::InvalidLayout);
        }
        if self.fs_size - pool_offset >= FS_NULL_OFFSET as usize {
            return Err(QuarkError::InvalidLayout);
        }
        self.heap_base
            .checked_add(self.heap_size)
            .and_then(|end| end.checked_add(self.fs_size))
            .ok_or(QuarkError::InvalidLayout)?;
        Ok(())
    }

    pub fn fs_base(&self) -> usize {
        self.heap_base + self.heap_size
    }

    pub fn free_list_offset(&self) -> usize {
        0
    }

    pub fn node_table_offset(&self) -> usize {
        FREE_LIST_HEAD_SIZE
    }

    pub fn node_table_size(&self) -> usize {
        NODE_SIZE * self.max_nodes
    }

    pub fn node_offset(&self, index: usize) -> usize {
        self.node_table_offset() + index * NODE_SIZE
    }

    pub fn data_pool_offset(&self) -> usize {
        FREE_LIST_HEAD_SIZE + self.node_table_size()
    }

    pub fn data_pool_size(&self) -> usize {
        self.fs_size - self.data_pool_offset()
    }

    /// Absolute address of the node table on the device.
    pub fn node_table_addr(&self) -> usize {
        self.fs_base() + self.node_table_offset()
    }

    /// Absolute address of the data pool on the device.
    pub fn data_pool_addr(&self) -> usize {
        self.fs_base() + self.data_pool_offset()
    }
}

/// Reads the pool-wide free-list head. `None` once the pool is exhausted.
pub fn read_free_head(region: &impl Region, layout: &Layout) -> Result<Option<u16>> {
    let head = read_word(region, layout.free_list_offset())?;
    Ok((head != FS_NULL_OFFSET).then_some(head))
}

pub fn write_free_head(region: &mut impl Region, layout: &Layout, head: Option<u16>) -> Result<()> {
    write_word(region, layout.free_list_offset(), head.unwrap_or(FS_NULL_OFFSET))
}
