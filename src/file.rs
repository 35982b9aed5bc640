//! Whole-file content operations.

use log::debug;

use crate::error::QuarkError;
use crate::extent::{allocate_chain, read_chain, release_chain, write_chain};
use crate::layout::Layout;
use crate::node::{get_live_node, write_node};
use crate::region::Region;
use crate::structs::{NodeId, Perms};
use crate::Result;

/// Replaces the whole content of a file with `data`.
///
/// The old chain is released before the new one is carved, so a write that
/// fails with `NoSpace` leaves the file empty.
pub fn write_file(region: &mut impl Region, layout: &Layout, id: NodeId, data: &[u8]) -> Result<()> {
    let mut node = get_live_node(region, layout, id)?;
    if !node.perms.contains(Perms::WRITE) {
        return Err(QuarkError::PermissionDenied);
    }
    if node.is_dir() {
        return Err(QuarkError::NotAFile);
    }
    let size = u16::try_from(data.len()).map_err(|_| QuarkError::NoSpace)?;

    release_chain(region, layout, node.data)?;
    node.data = None;
    node.size = 0;
    write_node(region, layout, id, &node)?;

    let head = allocate_chain(region, layout, data.len())?;
    write_chain(region, layout, head, data)?;
    node.data = head;
    node.size = size;
    write_node(region, layout, id, &node)?;
    debug!("wrote {} bytes to node {}", size, id.raw());
    Ok(())
}

/// Reads up to `buf.len()` bytes from the start of a file.
/// A buffer smaller than the file just truncates the read.
pub fn read_file(region: &impl Region, layout: &Layout, id: NodeId, buf: &mut [u8]) -> Result<usize> {
    let node = get_live_node(region, layout, id)?;
    if !node.perms.contains(Perms::READ) {
        return Err(QuarkError::PermissionDenied);
    }
    if node.is_dir() {
        return Err(QuarkError::NotAFile);
    }
    let len = buf.len().min(node.size as usize);
    read_chain(region, layout, node.data, &mut buf[..len])?;
    Ok(len)
}
