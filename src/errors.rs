use std::{io, path::PathBuf};

use thiserror::Error;

use super::inode::InodeNumber;

#[derive(Error, Debug)]
pub enum ExtfsError {
    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Read of {size} bytes at device offset {offset} failed: {source}")]
    DeviceRead {
        offset: u64,
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("Invalid super block magic: {0:#x}")]
    InvalidSignature(u16),

    #[error("Unsupported block size: {0}")]
    UnsupportedBlockSize(u64),

    #[error("Invalid filesystem geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("Read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("Block group {group} out of range, volume has {count}")]
    BlockGroupOutOfRange { group: u32, count: u32 },

    #[error("Invalid inode number: {0}")]
    InvalidInodeNumber(u32),

    #[error("Invalid extent header magic: {0:#x}")]
    CorruptExtentTree(u16),

    #[error("Unsupported extent tree depth: {0}")]
    UnsupportedExtentDepth(u16),

    #[error("Unsupported extent length: {0}")]
    UnsupportedExtentLength(u16),

    #[error("Extent index {index} out of range, node has {entries} entries")]
    ExtentIndexOutOfRange { index: u16, entries: u16 },

    #[error("Inode {0} does not use extents")]
    NotExtentMapped(InodeNumber),

    #[error("Unknown file type in mode: {0:#o}")]
    UnknownFileType(u16),

    #[error("Corrupt directory entry at block offset {offset}: {reason}")]
    CorruptDirectory { offset: usize, reason: &'static str },

    #[error("No entry named {0:?}")]
    NameNotFound(String),

    #[error("Require absolute path, got {0}")]
    RequireAbsolutePath(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("{0} is not directory")]
    NotADirectory(PathBuf),

    #[error("{0} is not regular file")]
    NotRegularFile(PathBuf),

    #[error("Failed to resolve {component:?} in {path}: {source}")]
    Component {
        path: PathBuf,
        component: String,
        #[source]
        source: Box<ExtfsError>,
    },
}

impl ExtfsError {
    /// Strip path-walk context and return the error that stopped the walk.
    pub fn root_cause(&self) -> &ExtfsError {
        match self {
            ExtfsError::Component { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
