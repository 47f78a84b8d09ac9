use std::path::Path;

use log::debug;

use super::{
    device::BlockSource,
    errors::ExtfsError,
    file::File,
    inode::{INode, InodeNumber},
    metadata::Metadata,
    read_dir::ReadDir,
    resolver::PathResolver,
    superblock::SuperBlock,
};

/// Session settings for [`FileSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsOptions {
    /// Inode path walks start from.
    pub root: InodeNumber,
    /// Reject directories and files not mapped by extents.
    pub strict_extents: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            root: InodeNumber::ROOT,
            strict_extents: false,
        }
    }
}

/// A read-only session over one device.
///
/// The superblock is decoded once here; every other structure is re-read
/// from the device on each call.
#[derive(Debug)]
pub struct FileSystem<D> {
    super_block: SuperBlock,
    device: D,
    options: FsOptions,
}

impl<D: BlockSource> FileSystem<D> {
    pub fn from_device(device: D) -> Result<Self, ExtfsError> {
        Self::with_options(device, FsOptions::default())
    }

    pub fn with_options(device: D, options: FsOptions) -> Result<Self, ExtfsError> {
        let super_block = SuperBlock::from_device(&device)?;
        debug!(
            "ext4 volume {:?}: block_size={} blocks_per_group={} inodes_per_group={} inode_size={}",
            super_block.volume_name(),
            super_block.block_size(),
            super_block.blocks_per_group(),
            super_block.inodes_per_group(),
            super_block.inode_size(),
        );

        Ok(Self {
            super_block,
            device,
            options,
        })
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    /// Give the device back to the caller.
    pub fn into_device(self) -> D {
        self.device
    }

    pub fn resolver(&self) -> PathResolver<'_, D> {
        PathResolver::new(&self.super_block, &self.device, self.options.root)
            .with_strict_extents(self.options.strict_extents)
    }

    /// Decode the inode with number `ino`.
    pub fn inode(&self, ino: InodeNumber) -> Result<INode, ExtfsError> {
        self.resolver().load(ino)
    }

    /// Resolve an absolute path to an inode number.
    pub fn lookup<P: AsRef<Path>>(&self, path: P) -> Result<InodeNumber, ExtfsError> {
        self.resolver().resolve(path)
    }

    /// Fetch the raw bytes of one extent run of the file at `path`.
    pub fn read_data_block<P: AsRef<Path>>(
        &self,
        path: P,
        extent_index: u16,
    ) -> Result<Vec<u8>, ExtfsError> {
        let (_, inode) = self.resolver().resolve_inode(path)?;
        inode.read_data_block(&self.super_block, extent_index, &self.device)
    }

    /// Returns an iterator over the entries within a directory.
    pub fn read_dir<P: AsRef<Path>>(&self, path: P) -> Result<ReadDir<'_, D>, ExtfsError> {
        let (_, i) = self.resolver().resolve_inode(path.as_ref())?;
        if !i.is_dir() {
            return Err(ExtfsError::NotADirectory(path.as_ref().to_path_buf()));
        }
        i.read_dir(&self.super_block, &self.device)
    }

    /// Read the entire contents of a file into a bytes vector.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>, ExtfsError> {
        let (_, i) = self.resolver().resolve_inode(path.as_ref())?;
        if !i.is_regular() {
            return Err(ExtfsError::NotRegularFile(path.as_ref().to_path_buf()));
        }
        i.read_bytes(&self.super_block, &self.device)
    }

    /// Given a path, query the file system to get information about a file, directory, etc
    pub fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<Metadata, ExtfsError> {
        let (ino, i) = self.resolver().resolve_inode(path)?;
        Ok(Metadata::new(ino, i))
    }

    /// Attempts to open a file in read-only mode.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<File<'_, D>, ExtfsError> {
        let (_, i) = self.resolver().resolve_inode(path.as_ref())?;
        if !i.is_regular() {
            return Err(ExtfsError::NotRegularFile(path.as_ref().to_path_buf()));
        }
        i.open(&self.super_block, &self.device)
    }
}
