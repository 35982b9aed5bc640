//! Path resolution and manipulation utilities.
//!
//! Paths are `/`-separated. A leading `/` starts from the root, anything
//! else from the given start node. Empty components are skipped; `.` and
//! `..` have no special meaning and only match nodes literally named so,
//! which cannot be created.

use crate::config::*;
use crate::error::QuarkError;
use crate::layout::Layout;
use crate::node::get_live_node;
use crate::region::Region;
use crate::structs::NodeId;
use crate::tree::find_child;
use crate::Result;

pub fn is_absolute(path: &str) -> bool {
    path.starts_with(PATH_SEPARATOR)
}

pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|c| !c.is_empty())
}

/// Splits a path into its directory portion and leaf name.
/// e.g. "/docs/note.txt" -> ("/docs", "note.txt"), "note.txt" -> ("", "note.txt")
pub fn split(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches(PATH_SEPARATOR);
    match trimmed.rfind(PATH_SEPARATOR) {
        Some(0) => (&trimmed[..1], &trimmed[1..]),
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    }
}

/// Resolves `path` to a node, starting at `start` unless it is absolute.
pub fn resolve(region: &impl Region, layout: &Layout, path: &str, start: NodeId) -> Result<NodeId> {
    let mut current = if is_absolute(path) { NodeId::ROOT } else { start };
    get_live_node(region, layout, current)?;

    for component in components(path) {
        let node = get_live_node(region, layout, current)?;
        if !node.is_dir() {
            return Err(QuarkError::NotADirectory);
        }
        current = find_child(region, layout, &node, component.as_bytes())?
            .ok_or(QuarkError::NotFound)?;
    }
    Ok(current)
}

/// Resolves the directory portion of `path` and returns it with the leaf
/// name. The directory portion has to exist already.
pub fn resolve_parent<'p>(
    region: &impl Region,
    layout: &Layout,
    path: &'p str,
    start: NodeId,
) -> Result<(NodeId, &'p str)> {
    let (dir_path, leaf) = split(path);
    if leaf.is_empty() {
        return Err(QuarkError::InvalidName);
    }
    let dir = resolve(region, layout, dir_path, start)?;
    if !get_live_node(region, layout, dir)?.is_dir() {
        return Err(QuarkError::NotADirectory);
    }
    Ok((dir, leaf))
}
