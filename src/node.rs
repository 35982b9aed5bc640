//! Reading, writing and allocating node table slots.
//! A slot other than the root's is free while its parent link is unset.

use crate::error::QuarkError;
use crate::layout::Layout;
use crate::region::{read_bytes, write_bytes, Region};
use crate::structs::{Node, NodeId};
use crate::config::NODE_SIZE;
use crate::Result;

fn check_index(layout: &Layout, id: NodeId) -> Result<()> {
    if id.index() >= layout.max_nodes {
        return Err(QuarkError::InvalidHandle);
    }
    Ok(())
}

fn is_free_slot(id: NodeId, node: &Node) -> bool {
    !id.is_root() && node.parent.is_none()
}

pub fn get_node(region: &impl Region, layout: &Layout, id: NodeId) -> Result<Node> {
    check_index(layout, id)?;
    let raw = read_bytes(region, layout.node_offset(id.index()), NODE_SIZE)?;
    let mut buf = [0u8; NODE_SIZE];
    buf.copy_from_slice(raw);
    Ok(Node::decode(&buf))
}

pub fn write_node(region: &mut impl Region, layout: &Layout, id: NodeId, node: &Node) -> Result<()> {
    check_index(layout, id)?;
    write_bytes(region, layout.node_offset(id.index()), &node.encode())
}

/// Like [`get_node`], but rejects slots that are not in use.
pub fn get_live_node(region: &impl Region, layout: &Layout, id: NodeId) -> Result<Node> {
    let node = get_node(region, layout, id)?;
    if is_free_slot(id, &node) {
        return Err(QuarkError::InvalidHandle);
    }
    Ok(node)
}

/// Takes the first free slot, lowest index first.
/// The slot still reads as free until the caller writes the new node.
pub(crate) fn alloc_node(region: &impl Region, layout: &Layout) -> Result<NodeId> {
    for index in 1..layout.max_nodes {
        let Some(id) = NodeId::from_raw(index as u8) else {
            break;
        };
        if is_free_slot(id, &get_node(region, layout, id)?) {
            return Ok(id);
        }
    }
    log::warn!("node table full ({} slots)", layout.max_nodes);
    Err(QuarkError::NoSpace)
}

pub(crate) fn free_node(region: &mut impl Region, layout: &Layout, id: NodeId) -> Result<()> {
    if id.is_root() {
        return Err(QuarkError::InvalidOperation);
    }
    write_node(region, layout, id, &Node::EMPTY)
}

pub fn count_free_nodes(region: &impl Region, layout: &Layout) -> Result<usize> {
    let mut free = 0;
    for index in 1..layout.max_nodes {
        let id = NodeId::from_raw(index as u8).ok_or(QuarkError::InvalidLayout)?;
        if is_free_slot(id, &get_node(region, layout, id)?) {
            free += 1;
        }
    }
    Ok(free)
}
