use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{
    errors::ExtfsError,
    inode::{FileType, INode, InodeNumber},
};

/// Metadata information about a file, read from its inode.
#[derive(Debug, Clone)]
pub struct Metadata {
    ino: InodeNumber,
    inode: INode,
}

impl Metadata {
    pub fn new(ino: InodeNumber, inode: INode) -> Self {
        Self { ino, inode }
    }

    pub fn ino(&self) -> InodeNumber {
        self.ino
    }

    pub fn file_type(&self) -> Result<FileType, ExtfsError> {
        self.inode.file_type()
    }

    pub fn is_dir(&self) -> bool {
        self.inode.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.inode.is_regular()
    }

    pub fn len(&self) -> u64 {
        self.inode.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn uid(&self) -> u16 {
        self.inode.uid
    }

    pub fn gid(&self) -> u16 {
        self.inode.gid
    }

    pub fn links(&self) -> u16 {
        self.inode.links_count
    }

    /// Permission bits including setuid, setgid and sticky.
    pub fn permissions(&self) -> u16 {
        self.inode.mode & 0o7777
    }

    pub fn modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.inode.mtime as u64)
    }

    pub fn accessed(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.inode.atime as u64)
    }

    /// Last inode change time.
    pub fn changed(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.inode.ctime as u64)
    }
}
