use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use log::debug;

use crate::error::QuarkError;
use crate::extent::{format_pool, pool_stats, PoolStats};
use crate::file::{read_file, write_file};
use crate::layout::Layout;
use crate::node::{count_free_nodes, get_live_node};
use crate::path::{resolve, resolve_parent};
use crate::region::Region;
use crate::structs::{Node, NodeId, Perms};
use crate::tree::{self, find_child};
use crate::Result;

#[derive(Debug)]
pub struct FileSystem<R: Region> {
    region: R,
    layout: Layout,
}

impl<R: Region> FileSystem<R> {
    /// Formats the region: a bare root directory and an empty data pool.
    pub fn format(mut region: R, layout: Layout) -> Result<Self> {
        Self::check(&region, &layout)?;
        tree::format_tree(&mut region, &layout)?;
        format_pool(&mut region, &layout)?;
        debug!("fs: formatted {} bytes, {} node slots, {} byte pool",
            layout.fs_size, layout.max_nodes, layout.data_pool_size());
        Ok(Self { region, layout })
    }

    /// Attaches to a region formatted earlier, e.g. after a power cycle.
    /// The contents are trusted as they are.
    pub fn mount(region: R, layout: Layout) -> Result<Self> {
        Self::check(&region, &layout)?;
        Ok(Self { region, layout })
    }

    fn check(region: &R, layout: &Layout) -> Result<()> {
        layout.validate()?;
        if region.len() < layout.fs_size {
            return Err(QuarkError::InvalidLayout);
        }
        Ok(())
    }

    // Following methods directly operate on the region; callers sharing the
    // filesystem with an interrupt handler must mask it around each call.

    pub fn create_file(&mut self, parent: NodeId, name: &str, perms: Perms) -> Result<NodeId> {
        tree::create(&mut self.region, &self.layout, parent, name, perms, false)
    }

    pub fn create_directory(&mut self, parent: NodeId, name: &str, perms: Perms) -> Result<NodeId> {
        tree::create(&mut self.region, &self.layout, parent, name, perms, true)
    }

    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        tree::delete(&mut self.region, &self.layout, id)
    }

    pub fn move_node(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        tree::move_node(&mut self.region, &self.layout, id, new_parent)
    }

    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        tree::rename(&mut self.region, &self.layout, id, new_name)
    }

    pub fn chmod(&mut self, id: NodeId, perms: Perms) -> Result<()> {
        tree::chmod(&mut self.region, &self.layout, id, perms)
    }

    pub fn write_file(&mut self, id: NodeId, data: &[u8]) -> Result<()> {
        write_file(&mut self.region, &self.layout, id, data)
    }

    pub fn read_file(&self, id: NodeId, buf: &mut [u8]) -> Result<usize> {
        read_file(&self.region, &self.layout, id, buf)
    }

    /// Resolves `path` from `start`, or from the root for absolute paths.
    pub fn resolve(&self, path: &str, start: NodeId) -> Result<NodeId> {
        resolve(&self.region, &self.layout, path, start)
    }

    pub fn lookup(&self, parent: NodeId, path: &str) -> Result<NodeId> {
        resolve(&self.region, &self.layout, path, parent)
    }

    /// Resolves everything but the last component of `path`, which must be
    /// a directory. Returns it together with the leaf name.
    pub fn dir_lookup<'p>(&self, parent: NodeId, path: &'p str) -> Result<(NodeId, &'p str)> {
        resolve_parent(&self.region, &self.layout, path, parent)
    }

    /// Creates the directory named by the last component of `path`.
    /// Intermediate directories are never created.
    pub fn mkdir(&mut self, parent: NodeId, path: &str, perms: Perms) -> Result<NodeId> {
        let (dir, leaf) = self.dir_lookup(parent, path)?;
        self.create_directory(dir, leaf, perms)
    }

    /// Creates the file named by the last component of `path`.
    pub fn touch(&mut self, parent: NodeId, path: &str, perms: Perms) -> Result<NodeId> {
        let (dir, leaf) = self.dir_lookup(parent, path)?;
        self.create_file(dir, leaf, perms)
    }

    pub fn read(&self, parent: NodeId, path: &str, buf: &mut [u8]) -> Result<usize> {
        let id = self.lookup(parent, path)?;
        self.read_file(id, buf)
    }

    /// Writes a file by path, creating it read-write if the leaf is missing.
    pub fn write(&mut self, parent: NodeId, path: &str, data: &[u8]) -> Result<NodeId> {
        let (dir, leaf) = self.dir_lookup(parent, path)?;
        let dir_node = get_live_node(&self.region, &self.layout, dir)?;
        let id = match find_child(&self.region, &self.layout, &dir_node, leaf.as_bytes())? {
            Some(id) => id,
            None => self.create_file(dir, leaf, Perms::RW)?,
        };
        self.write_file(id, data)?;
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<Node> {
        get_live_node(&self.region, &self.layout, id)
    }

    /// Children of a directory, most recently linked first.
    pub fn children(&self, dir: NodeId) -> Result<Vec<NodeId>> {
        tree::children(&self.region, &self.layout, dir)
    }

    pub fn free_nodes(&self) -> Result<usize> {
        count_free_nodes(&self.region, &self.layout)
    }

    pub fn pool_stats(&self) -> Result<PoolStats> {
        pool_stats(&self.region, &self.layout)
    }

    /// Renders the tree, one node per line, for diagnostics.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        self.dump_node(&mut out, NodeId::ROOT, 0)?;
        let stats = self.pool_stats()?;
        let _ = writeln!(out, "free nodes: {}, free pool bytes: {} in {} extents",
            self.free_nodes()?, stats.free_bytes, stats.free_extents);
        Ok(out)
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize) -> Result<()> {
        let node = self.node(id)?;
        let name = if id.is_root() { "/" } else { node.name_str().unwrap_or("?") };
        let _ = writeln!(out, "{:indent$}{} [{}] perms={:04b} size={}",
            "", name, id.raw(), node.perms.bits(), node.size, indent = depth * 2);
        if node.is_dir() {
            for child in self.children(id)? {
                self.dump_node(out, child, depth + 1)?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn into_region(self) -> R {
        self.region
    }
}
