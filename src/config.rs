use static_assertions::const_assert;
use static_assertions::const_assert_eq;

pub const HEAP_BLOCK_ALIGN: usize = 2;
pub const BLOCK_HEADER_SIZE: usize = 6; // size word, next word, free byte, pad byte
pub const NULL_BLOCK: u16 = 0xFFFF;

pub const FS_NAME_MAX_LEN: usize = 12;
pub const FS_INVALID_IDX: u8 = 0xFF;
pub const FS_NULL_OFFSET: u16 = 0xFFFF;
pub const ROOT_NODE_ID: u8 = 0;

pub const FREE_LIST_HEAD_SIZE: usize = 2; // One word holding the pool's free-list head
pub const NODE_SIZE: usize = 20;
pub const EXTENT_HEADER_SIZE: usize = 4; // size word, next word

pub const PATH_SEPARATOR: char = '/';
pub const DOT_NAME: &[u8; 1] = b".";
pub const DOTDOT_NAME: &[u8; 2] = b"..";

// perms + name + parent + first_child + next_sibling + size + data_offset
const_assert_eq!(NODE_SIZE, 1 + FS_NAME_MAX_LEN + 3 + 2 + 2);
const_assert!(BLOCK_HEADER_SIZE % HEAP_BLOCK_ALIGN == 0);
const_assert!(EXTENT_HEADER_SIZE % 2 == 0);
