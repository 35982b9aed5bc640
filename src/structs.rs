use bitflags::bitflags;

use crate::config::*;

bitflags! {
    /// Capability bits of a node. The upper nibble is reserved and kept as
    /// stored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Perms: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const EXECUTE = 0b0100;
        const DIRECTORY = 0b1000;
    }
}

impl Perms {
    pub const RWX: Self = Self::READ.union(Self::WRITE).union(Self::EXECUTE);
    pub const RW: Self = Self::READ.union(Self::WRITE);
    pub const R: Self = Self::READ;
    pub const WX: Self = Self::WRITE.union(Self::EXECUTE);
    pub const W: Self = Self::WRITE;
    pub const X: Self = Self::EXECUTE;
    pub const RX: Self = Self::READ.union(Self::EXECUTE);
    pub const NONE: Self = Self::empty();

    /// The bits `chmod` may change.
    pub const ACCESS: Self = Self::RWX;

    pub fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }
}

/// Index of a slot in the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u8);

impl NodeId {
    pub const ROOT: Self = Self(ROOT_NODE_ID);

    /// `None` for the reserved "no relation" index.
    pub fn from_raw(raw: u8) -> Option<Self> {
        (raw != FS_INVALID_IDX).then_some(Self(raw))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

fn encode_link(link: Option<NodeId>) -> u8 {
    link.map_or(FS_INVALID_IDX, NodeId::raw)
}

/// One record of the node table.
///
/// Persisted as `NODE_SIZE` bytes: perms, name, parent, first child,
/// next sibling, size (LE word), data offset (LE word).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub perms: Perms,
    pub name: [u8; FS_NAME_MAX_LEN],
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub size: u16,
    pub data: Option<u16>,  // Head extent offset in the data pool, files only
}

impl Node {
    /// An unused slot.
    pub const EMPTY: Self = Self {
        perms: Perms::NONE,
        name: [0; FS_NAME_MAX_LEN],
        parent: None,
        first_child: None,
        next_sibling: None,
        size: 0,
        data: None,
    };

    pub fn root() -> Self {
        Self { perms: Perms::RWX | Perms::DIRECTORY, ..Self::EMPTY }
    }

    pub fn is_dir(&self) -> bool {
        self.perms.is_directory()
    }

    /// The name without its NUL padding.
    pub fn name(&self) -> &[u8] {
        let end = self.name.iter().position(|&c| c == 0).unwrap_or(FS_NAME_MAX_LEN);
        &self.name[..end]
    }

    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name()).ok()
    }

    /// Exact, case-sensitive comparison.
    pub fn name_eq(&self, name: &[u8]) -> bool {
        self.name() == name
    }

    pub fn encode(&self) -> [u8; NODE_SIZE] {
        let mut raw = [0u8; NODE_SIZE];
        raw[0] = self.perms.bits();
        raw[1..13].copy_from_slice(&self.name);
        raw[13] = encode_link(self.parent);
        raw[14] = encode_link(self.first_child);
        raw[15] = encode_link(self.next_sibling);
        raw[16..18].copy_from_slice(&self.size.to_le_bytes());
        raw[18..20].copy_from_slice(&self.data.unwrap_or(FS_NULL_OFFSET).to_le_bytes());
        raw
    }

    pub fn decode(raw: &[u8; NODE_SIZE]) -> Self {
        let mut name = [0u8; FS_NAME_MAX_LEN];
        name.copy_from_slice(&raw[1..13]);
        let data = u16::from_le_bytes([raw[18], raw[19]]);
        Self {
            perms: Perms::from_bits_retain(raw[0]),
            name,
            parent: NodeId::from_raw(raw[13]),
            first_child: NodeId::from_raw(raw[14]),
            next_sibling: NodeId::from_raw(raw[15]),
            size: u16::from_le_bytes([raw[16], raw[17]]),
            data: (data != FS_NULL_OFFSET).then_some(data),
        }
    }
}

/// Header stored in front of every extent of the data pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub size: u16,          // Payload bytes following the header
    pub next: Option<u16>,  // Pool offset of the next extent in the chain
}
