use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuarkError {
    #[error("no heap block can hold the request")]
    OutOfMemory,

    #[error("node is not a directory")]
    NotADirectory,

    #[error("node is not a file")]
    NotAFile,

    #[error("name exceeds the maximum length")]
    NameTooLong,

    #[error("a sibling with the same name already exists")]
    DuplicateName,

    #[error("no free node slot or extent space left")]
    NoSpace,

    #[error("permission denied")]
    PermissionDenied,

    #[error("path component not found")]
    NotFound,

    #[error("cannot move a directory into itself or a descendant")]
    CyclicMove,

    #[error("invalid operation")]
    InvalidOperation,

    #[error("invalid name")]
    InvalidName,

    #[error("handle does not name a live node or block")]
    InvalidHandle,

    #[error("offset out of region bounds")]
    OutOfBounds,

    #[error("layout cannot hold the on-region formats")]
    InvalidLayout,
}

pub type Result<T> = core::result::Result<T, QuarkError>;
