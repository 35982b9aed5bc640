//! Common utilities for tests

#![allow(unused)]

use quark::{FileSystem, Layout};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Routes the crate's `log` output to the test harness. Safe to call from
/// every test.
pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small filesystem: 16 node slots and a 256 byte data pool.
pub fn small_layout() -> Layout {
    Layout::new(0, 0x100, 2 + 16 * 20 + 256, 16).unwrap()
}

pub fn fresh_fs(layout: Layout) -> FileSystem<Vec<u8>> {
    setup();
    FileSystem::format(vec![0u8; layout.fs_size], layout).unwrap()
}
