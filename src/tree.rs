//! Tree operations over the node table.
//!
//! Children hang off `first_child` and chain through `next_sibling`. New
//! nodes are always linked in front, so listings come out most recent
//! first; unlinking has to scan for the predecessor.

use alloc::vec::Vec;

use log::debug;

use crate::config::*;
use crate::error::QuarkError;
use crate::extent::release_chain;
use crate::layout::Layout;
use crate::node::{alloc_node, free_node, get_live_node, get_node, write_node};
use crate::region::Region;
use crate::structs::{Node, NodeId, Perms};
use crate::Result;

/// Validates a node name and returns it NUL padded.
pub fn encode_name(name: &str) -> Result<[u8; FS_NAME_MAX_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.contains(&0) || name.contains(PATH_SEPARATOR) {
        return Err(QuarkError::InvalidName);
    }
    if bytes == DOT_NAME || bytes == DOTDOT_NAME {
        return Err(QuarkError::InvalidName);
    }
    if bytes.len() > FS_NAME_MAX_LEN {
        return Err(QuarkError::NameTooLong);
    }
    let mut padded = [0u8; FS_NAME_MAX_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(padded)
}

/// Resets the table: a bare root and every other slot free.
pub(crate) fn format_tree(region: &mut impl Region, layout: &Layout) -> Result<()> {
    write_node(region, layout, NodeId::ROOT, &Node::root())?;
    for index in 1..layout.max_nodes {
        let id = NodeId::from_raw(index as u8).ok_or(QuarkError::InvalidLayout)?;
        free_node(region, layout, id)?;
    }
    Ok(())
}

/// Linear, case-sensitive scan of a directory's children.
pub fn find_child(region: &impl Region, layout: &Layout, dir: &Node, name: &[u8]) -> Result<Option<NodeId>> {
    let mut cursor = dir.first_child;
    let mut steps = 0;
    while let Some(id) = cursor {
        steps += 1;
        if steps > layout.max_nodes {
            return Err(QuarkError::OutOfBounds);
        }
        let child = get_node(region, layout, id)?;
        if child.name_eq(name) {
            return Ok(Some(id));
        }
        cursor = child.next_sibling;
    }
    Ok(None)
}

pub fn children(region: &impl Region, layout: &Layout, dir: NodeId) -> Result<Vec<NodeId>> {
    let node = get_live_node(region, layout, dir)?;
    if !node.is_dir() {
        return Err(QuarkError::NotADirectory);
    }
    let mut ids = Vec::new();
    let mut cursor = node.first_child;
    while let Some(id) = cursor {
        if ids.len() >= layout.max_nodes {
            return Err(QuarkError::OutOfBounds);
        }
        ids.push(id);
        cursor = get_node(region, layout, id)?.next_sibling;
    }
    Ok(ids)
}

/// True when `ancestor` is `node` itself or lies on its parent chain.
fn is_ancestor_or_self(region: &impl Region, layout: &Layout, ancestor: NodeId, node: NodeId) -> Result<bool> {
    let mut cursor = Some(node);
    let mut steps = 0;
    while let Some(id) = cursor {
        if id == ancestor {
            return Ok(true);
        }
        steps += 1;
        if steps > layout.max_nodes {
            return Err(QuarkError::OutOfBounds);
        }
        cursor = get_node(region, layout, id)?.parent;
    }
    Ok(false)
}

/// Links `id` in front of `parent`'s children.
fn link_first(region: &mut impl Region, layout: &Layout, parent: NodeId, id: NodeId) -> Result<()> {
    let mut parent_node = get_node(region, layout, parent)?;
    let mut node = get_node(region, layout, id)?;
    node.parent = Some(parent);
    node.next_sibling = parent_node.first_child;
    parent_node.first_child = Some(id);
    write_node(region, layout, id, &node)?;
    write_node(region, layout, parent, &parent_node)
}

/// Removes `id` from its parent's sibling chain. Leaves `id`'s own parent
/// link in place.
fn unlink(region: &mut impl Region, layout: &Layout, id: NodeId) -> Result<()> {
    let node = get_node(region, layout, id)?;
    let parent = node.parent.ok_or(QuarkError::InvalidHandle)?;
    let mut parent_node = get_node(region, layout, parent)?;
    if parent_node.first_child == Some(id) {
        parent_node.first_child = node.next_sibling;
        return write_node(region, layout, parent, &parent_node);
    }

    let mut cursor = parent_node.first_child;
    let mut steps = 0;
    while let Some(prev) = cursor {
        steps += 1;
        if steps > layout.max_nodes {
            return Err(QuarkError::OutOfBounds);
        }
        let mut prev_node = get_node(region, layout, prev)?;
        if prev_node.next_sibling == Some(id) {
            prev_node.next_sibling = node.next_sibling;
            return write_node(region, layout, prev, &prev_node);
        }
        cursor = prev_node.next_sibling;
    }
    Err(QuarkError::InvalidHandle)
}

/// Creates a file or directory as the first child of `parent`.
pub fn create(
    region: &mut impl Region,
    layout: &Layout,
    parent: NodeId,
    name: &str,
    perms: Perms,
    is_dir: bool,
) -> Result<NodeId> {
    let parent_node = get_live_node(region, layout, parent)?;
    if !parent_node.is_dir() {
        return Err(QuarkError::NotADirectory);
    }
    let encoded = encode_name(name)?;
    if find_child(region, layout, &parent_node, name.as_bytes())?.is_some() {
        return Err(QuarkError::DuplicateName);
    }
    let id = alloc_node(region, layout)?;

    let mut perms = perms & Perms::ACCESS;
    if is_dir {
        perms |= Perms::DIRECTORY;
    }
    let node = Node { perms, name: encoded, parent: Some(parent), ..Node::EMPTY };
    write_node(region, layout, id, &node)?;
    link_first(region, layout, parent, id)?;
    debug!("created {} {:?} (node {}) under node {}",
        if is_dir { "directory" } else { "file" }, name, id.raw(), parent.raw());
    Ok(id)
}

/// Frees `id` and everything below it. Does not touch the parent's links.
fn destroy(region: &mut impl Region, layout: &Layout, id: NodeId) -> Result<()> {
    let node = get_node(region, layout, id)?;
    if node.is_dir() {
        let mut cursor = node.first_child;
        while let Some(child) = cursor {
            cursor = get_node(region, layout, child)?.next_sibling;
            destroy(region, layout, child)?;
        }
    } else {
        release_chain(region, layout, node.data)?;
    }
    free_node(region, layout, id)
}

/// Deletes a node, recursively for directories. Needs write permission on
/// the parent.
pub fn delete(region: &mut impl Region, layout: &Layout, id: NodeId) -> Result<()> {
    if id.is_root() {
        return Err(QuarkError::InvalidOperation);
    }
    let node = get_live_node(region, layout, id)?;
    let parent = node.parent.ok_or(QuarkError::InvalidHandle)?;
    if !get_node(region, layout, parent)?.perms.contains(Perms::WRITE) {
        return Err(QuarkError::PermissionDenied);
    }

    unlink(region, layout, id)?;
    destroy(region, layout, id)?;
    debug!("deleted node {} from node {}", id.raw(), parent.raw());
    Ok(())
}

/// Re-parents a node as the first child of `new_parent`.
/// The root is an ancestor of every directory, so moving it is always cyclic.
pub fn move_node(region: &mut impl Region, layout: &Layout, id: NodeId, new_parent: NodeId) -> Result<()> {
    let node = get_live_node(region, layout, id)?;
    let target = get_live_node(region, layout, new_parent)?;
    if !target.is_dir() {
        return Err(QuarkError::NotADirectory);
    }
    if is_ancestor_or_self(region, layout, id, new_parent)? {
        return Err(QuarkError::CyclicMove);
    }
    if let Some(existing) = find_child(region, layout, &target, node.name())? {
        if existing != id {
            return Err(QuarkError::DuplicateName);
        }
    }
    unlink(region, layout, id)?;
    link_first(region, layout, new_parent, id)?;
    debug!("moved node {} under node {}", id.raw(), new_parent.raw());
    Ok(())
}

pub fn rename(region: &mut impl Region, layout: &Layout, id: NodeId, new_name: &str) -> Result<()> {
    if id.is_root() {
        return Err(QuarkError::InvalidOperation);
    }
    let mut node = get_live_node(region, layout, id)?;
    let encoded = encode_name(new_name)?;
    let parent = node.parent.ok_or(QuarkError::InvalidHandle)?;
    let parent_node = get_node(region, layout, parent)?;
    if let Some(existing) = find_child(region, layout, &parent_node, new_name.as_bytes())? {
        if existing != id {
            return Err(QuarkError::DuplicateName);
        }
    }
    node.name = encoded;
    write_node(region, layout, id, &node)?;
    debug!("renamed node {} to {:?}", id.raw(), new_name);
    Ok(())
}

/// Replaces the read/write/execute bits. The directory bit is fixed at
/// creation: asking for it on a file fails.
pub fn chmod(region: &mut impl Region, layout: &Layout, id: NodeId, perms: Perms) -> Result<()> {
    if id.is_root() {
        return Err(QuarkError::InvalidOperation);
    }
    let mut node = get_live_node(region, layout, id)?;
    if perms.is_directory() && !node.is_dir() {
        return Err(QuarkError::InvalidOperation);
    }
    node.perms = (node.perms - Perms::ACCESS) | (perms & Perms::ACCESS);
    write_node(region, layout, id, &node)?;
    debug!("chmod node {} to {:#06b}", id.raw(), node.perms.bits());
    Ok(())
}
