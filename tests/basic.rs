#![allow(unused)]

mod common;

use common::{fresh_fs, small_layout};
use quark::{Error, FileSystem, Layout, NodeId, Perms};

#[test]
fn test_init_fs() {
    let fs = fresh_fs(Layout::CWII);
    log!("{}", fs.dump().unwrap());
    assert_eq!(fs.free_nodes().unwrap(), 254);
    let stats = fs.pool_stats().unwrap();
    assert_eq!(stats.capacity, 0x3800 - 2 - 255 * 20);
    assert_eq!(stats.free_bytes, stats.capacity - 4);
    assert_eq!(stats.free_extents, 1);
}

#[test]
fn test_root_dir() {
    let fs = fresh_fs(small_layout());
    let root = fs.node(fs.root()).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.perms, Perms::RWX | Perms::DIRECTORY);
    assert_eq!(root.parent, None);
    assert!(fs.children(fs.root()).unwrap().is_empty());
}

#[test]
fn test_create_file() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let id = fs.create_file(root, "a.txt", Perms::RW).unwrap();
    let node = fs.node(id).unwrap();
    assert!(!node.is_dir());
    assert_eq!(node.name_str(), Some("a.txt"));
    assert_eq!(node.parent, Some(root));
    assert_eq!(node.size, 0);
    assert_eq!(node.data, None);

    // Names are case sensitive.
    fs.create_file(root, "A.txt", Perms::RW).unwrap();
    assert_eq!(fs.create_file(root, "a.txt", Perms::RW), Err(Error::DuplicateName));
    assert_eq!(fs.create_directory(root, "a.txt", Perms::RWX), Err(Error::DuplicateName));
    assert_eq!(fs.create_file(id, "x", Perms::RW), Err(Error::NotADirectory));
    assert_eq!(fs.create_file(root, "name_too_long", Perms::RW), Err(Error::NameTooLong));
    assert_eq!(fs.create_file(root, "", Perms::RW), Err(Error::InvalidName));
}

#[test]
fn test_directory_listing_order() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let a = fs.create_file(root, "a", Perms::RW).unwrap();
    let b = fs.create_directory(root, "b", Perms::RWX).unwrap();
    let c = fs.create_file(root, "c", Perms::RW).unwrap();
    assert_eq!(fs.children(root).unwrap(), vec![c, b, a]);
    assert_eq!(fs.children(a), Err(Error::NotADirectory));
}

#[test]
fn test_node_table_exhaustion() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    for i in 0..15 {
        fs.create_file(root, &format!("f{}", i), Perms::RW).unwrap();
    }
    assert_eq!(fs.free_nodes().unwrap(), 0);
    assert_eq!(fs.create_file(root, "one_more", Perms::RW), Err(Error::NoSpace));
    assert_eq!(fs.children(root).unwrap().len(), 15);
}

#[test]
fn test_write_and_read_file() {
    let mut fs = fresh_fs(small_layout());
    let id = fs.create_file(fs.root(), "data", Perms::RW).unwrap();
    fs.write_file(id, b"hello, world").unwrap();
    assert_eq!(fs.node(id).unwrap().size, 12);

    let mut buf = [0u8; 32];
    assert_eq!(fs.read_file(id, &mut buf).unwrap(), 12);
    assert_eq!(&buf[..12], b"hello, world");

    // Short buffers truncate.
    let mut small = [0u8; 5];
    assert_eq!(fs.read_file(id, &mut small).unwrap(), 5);
    assert_eq!(&small, b"hello");

    // Rewrites replace the whole content and give the old extents back.
    let before = fs.pool_stats().unwrap().free_bytes;
    fs.write_file(id, b"bye").unwrap();
    assert_eq!(fs.read_file(id, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"bye");
    assert!(fs.pool_stats().unwrap().free_bytes > before);

    fs.write_file(id, b"").unwrap();
    assert_eq!(fs.node(id).unwrap().data, None);
    assert_eq!(fs.read_file(id, &mut buf).unwrap(), 0);
}

#[test]
fn test_write_too_large() {
    let mut fs = fresh_fs(small_layout());
    let id = fs.create_file(fs.root(), "big", Perms::RW).unwrap();
    fs.write_file(id, b"keep").unwrap();
    let data = vec![7u8; 300];
    assert_eq!(fs.write_file(id, &data), Err(Error::NoSpace));
    // The failed write released the old content; its extent stays split off.
    assert_eq!(fs.node(id).unwrap().size, 0);
    let stats = fs.pool_stats().unwrap();
    assert_eq!(stats.free_extents, 2);
    assert_eq!(stats.free_bytes, 256 - 2 * 4);
}

#[test]
fn test_file_spans_fragmented_pool() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let a = fs.create_file(root, "a", Perms::RW).unwrap();
    let b = fs.create_file(root, "b", Perms::RW).unwrap();
    let c = fs.create_file(root, "c", Perms::RW).unwrap();
    fs.write_file(a, &[1u8; 60]).unwrap();
    fs.write_file(b, &[2u8; 60]).unwrap();
    fs.write_file(c, &[3u8; 60]).unwrap();
    fs.delete(a).unwrap();
    fs.delete(c).unwrap();

    // Needs pieces of several free extents.
    let data: Vec<u8> = (0..150u8).collect();
    let d = fs.create_file(root, "d", Perms::RW).unwrap();
    fs.write_file(d, &data).unwrap();
    log!("{}", fs.dump().unwrap());
    let mut back = vec![0u8; 150];
    assert_eq!(fs.read_file(d, &mut back).unwrap(), 150);
    assert_eq!(back, data);

    let mut untouched = [0u8; 60];
    fs.read_file(b, &mut untouched).unwrap();
    assert_eq!(untouched, [2u8; 60]);
}

#[test]
fn test_file_permissions() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let ro = fs.create_file(root, "ro", Perms::R).unwrap();
    let wo = fs.create_file(root, "wo", Perms::W).unwrap();
    let dir = fs.create_directory(root, "dir", Perms::RWX).unwrap();
    let mut buf = [0u8; 4];

    assert_eq!(fs.write_file(ro, b"x"), Err(Error::PermissionDenied));
    assert_eq!(fs.read_file(ro, &mut buf).unwrap(), 0);
    fs.write_file(wo, b"x").unwrap();
    assert_eq!(fs.read_file(wo, &mut buf), Err(Error::PermissionDenied));
    assert_eq!(fs.write_file(dir, b"x"), Err(Error::NotAFile));
    assert_eq!(fs.read_file(dir, &mut buf), Err(Error::NotAFile));

    fs.chmod(ro, Perms::RW).unwrap();
    fs.write_file(ro, b"ok").unwrap();
}

#[test]
fn test_delete_subtree_restores_resources() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let free_nodes = fs.free_nodes().unwrap();
    let free_footprint = fs.pool_stats().unwrap().free_footprint;

    let top = fs.create_directory(root, "top", Perms::RWX).unwrap();
    let mid = fs.create_directory(top, "mid", Perms::RWX).unwrap();
    let f1 = fs.create_file(top, "f1", Perms::RW).unwrap();
    let f2 = fs.create_file(mid, "f2", Perms::RW).unwrap();
    fs.write_file(f1, &[1u8; 20]).unwrap();
    fs.write_file(f2, &[2u8; 40]).unwrap();
    assert_eq!(fs.free_nodes().unwrap(), free_nodes - 4);

    fs.delete(top).unwrap();
    assert_eq!(fs.free_nodes().unwrap(), free_nodes);
    assert!(fs.children(root).unwrap().is_empty());
    // Extents come back split, but every header and payload byte is free again.
    let stats = fs.pool_stats().unwrap();
    assert_eq!(stats.free_footprint, free_footprint);
    assert_eq!(stats.free_footprint, small_layout().data_pool_size());
    assert_eq!(fs.node(f2), Err(Error::InvalidHandle));
}

#[test]
fn test_delete_checks() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    assert_eq!(fs.delete(root), Err(Error::InvalidOperation));

    let locked = fs.create_directory(root, "locked", Perms::RX).unwrap();
    // Creation does not look at the write bit; deletion does.
    let inner = fs.create_file(locked, "inner", Perms::RW).unwrap();
    assert_eq!(fs.delete(inner), Err(Error::PermissionDenied));
    fs.delete(locked).unwrap();
}

#[test]
fn test_move_node() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let a = fs.create_directory(root, "a", Perms::RWX).unwrap();
    let b = fs.create_directory(a, "b", Perms::RWX).unwrap();
    let f = fs.create_file(root, "f", Perms::RW).unwrap();

    fs.move_node(f, b).unwrap();
    assert_eq!(fs.node(f).unwrap().parent, Some(b));
    assert_eq!(fs.children(root).unwrap(), vec![a]);
    assert_eq!(fs.children(b).unwrap(), vec![f]);

    assert_eq!(fs.move_node(f, f), Err(Error::NotADirectory));
    assert_eq!(fs.move_node(root, a), Err(Error::CyclicMove));
    assert_eq!(fs.move_node(root, root), Err(Error::CyclicMove));
    assert_eq!(fs.move_node(root, f), Err(Error::NotADirectory));

    let clash = fs.create_file(root, "f", Perms::RW).unwrap();
    assert_eq!(fs.move_node(clash, b), Err(Error::DuplicateName));
}

#[test]
fn test_cyclic_move_leaves_tree_unchanged() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let a = fs.create_directory(root, "a", Perms::RWX).unwrap();
    let b = fs.create_directory(a, "b", Perms::RWX).unwrap();
    let before = fs.dump().unwrap();

    assert_eq!(fs.move_node(a, b), Err(Error::CyclicMove));
    assert_eq!(fs.move_node(a, a), Err(Error::CyclicMove));
    assert_eq!(fs.dump().unwrap(), before);
}

#[test]
fn test_rename() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let a = fs.create_file(root, "a", Perms::RW).unwrap();
    fs.create_file(root, "b", Perms::RW).unwrap();

    fs.rename(a, "c").unwrap();
    assert_eq!(fs.node(a).unwrap().name_str(), Some("c"));
    assert_eq!(fs.lookup(root, "c").unwrap(), a);
    assert_eq!(fs.lookup(root, "a"), Err(Error::NotFound));

    fs.rename(a, "c").unwrap();
    assert_eq!(fs.rename(a, "b"), Err(Error::DuplicateName));
    assert_eq!(fs.rename(a, "twelve_chars"), Ok(()));
    assert_eq!(fs.rename(a, "thirteen_char"), Err(Error::NameTooLong));
    assert_eq!(fs.rename(root, "x"), Err(Error::InvalidOperation));
}

#[test]
fn test_path_operations() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    let docs = fs.mkdir(root, "/docs", Perms::RWX).unwrap();
    let note = fs.touch(root, "/docs/note.txt", Perms::RW).unwrap();

    assert_eq!(fs.lookup(root, "/docs/note.txt").unwrap(), note);
    assert_eq!(fs.lookup(docs, "note.txt").unwrap(), note);
    assert_eq!(fs.lookup(note, "/docs").unwrap(), docs);
    assert_eq!(fs.lookup(root, "//docs//note.txt").unwrap(), note);
    assert_eq!(fs.lookup(root, "/").unwrap(), root);
    assert_eq!(fs.dir_lookup(root, "/docs/new.txt").unwrap(), (docs, "new.txt"));

    assert_eq!(fs.lookup(root, "/docs/missing"), Err(Error::NotFound));
    assert_eq!(fs.lookup(root, "/docs/note.txt/x"), Err(Error::NotADirectory));
    assert_eq!(fs.lookup(root, "/docs/.."), Err(Error::NotFound));
    assert_eq!(fs.lookup(root, "/docs/much_too_long_name"), Err(Error::NotFound));
    assert_eq!(fs.mkdir(root, "/a/b", Perms::RWX), Err(Error::NotFound));
    assert_eq!(fs.touch(root, "/docs/note.txt", Perms::RW), Err(Error::DuplicateName));
}

#[test]
fn test_write_by_path() {
    let mut fs = fresh_fs(small_layout());
    let root = fs.root();
    fs.mkdir(root, "/docs", Perms::RWX).unwrap();
    let free_nodes = fs.free_nodes().unwrap();

    let note = fs.write(root, "/docs/note.txt", b"hi").unwrap();
    assert_eq!(fs.free_nodes().unwrap(), free_nodes - 1);
    assert_eq!(fs.node(note).unwrap().perms, Perms::RW);

    let mut buf = [0u8; 10];
    assert_eq!(fs.read(root, "/docs/note.txt", &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"hi");

    // Writing again reuses the node.
    assert_eq!(fs.write(root, "/docs/note.txt", b"again").unwrap(), note);
    assert_eq!(fs.free_nodes().unwrap(), free_nodes - 1);
    assert_eq!(fs.write(root, "/docs", b"x"), Err(Error::NotAFile));
}

#[test]
fn test_note_scenario() {
    let mut fs = fresh_fs(Layout::CWX);
    let root = fs.root();
    let docs = fs.create_directory(root, "docs", Perms::RWX).unwrap();
    let note = fs.create_file(docs, "note.txt", Perms::RW).unwrap();
    fs.write(root, "/docs/note.txt", b"hi").unwrap();

    let mut buf = [0u8; 10];
    assert_eq!(fs.read(root, "/docs/note.txt", &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"hi");

    let free_nodes = fs.free_nodes().unwrap();
    assert_eq!(fs.create_file(docs, "note.txt", Perms::RW), Err(Error::DuplicateName));
    assert_eq!(fs.free_nodes().unwrap(), free_nodes);
    assert_eq!(fs.children(docs).unwrap(), vec![note]);
    log!("{}", fs.dump().unwrap());
}
