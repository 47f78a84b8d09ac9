use std::fmt;

use log::{debug, trace};

use super::{
    constants::{
        INODE_BLOCK_MAP_SIZE, INODE_FLAG_EXTENTS, INODE_MODE_BLK, INODE_MODE_CHR, INODE_MODE_DIR,
        INODE_MODE_FIFO, INODE_MODE_LNK, INODE_MODE_REG, INODE_MODE_SOCK, INODE_MODE_TYPE_MASK,
    },
    descriptor::BlockGroupNumber,
    device::BlockSource,
    entry::DirectoryEntry,
    errors::ExtfsError,
    extent::{Extent, ExtentHeader, Extents},
    file::File,
    read_dir::ReadDir,
    reader::ByteReader,
    superblock::SuperBlock,
    utils::compute_u64,
};

// Field offsets within an inode record.
const MODE: usize = 0x0;
const UID: usize = 0x2;
const SIZE_LO: usize = 0x4;
const ATIME: usize = 0x8;
const CTIME: usize = 0xC;
const MTIME: usize = 0x10;
const GID: usize = 0x18;
const LINKS_COUNT: usize = 0x1A;
const FLAGS: usize = 0x20;
const BLOCK: usize = 0x28;
const SIZE_HIGH: usize = 0x6C;

/// The kind of object an inode describes, from the top nibble of its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Fifo,
    CharacterDevice,
    Directory,
    BlockDevice,
    Regular,
    SymbolicLink,
    Socket,
}

impl FileType {
    pub fn from_mode(mode: u16) -> Result<Self, ExtfsError> {
        match mode & INODE_MODE_TYPE_MASK {
            INODE_MODE_FIFO => Ok(FileType::Fifo),
            INODE_MODE_CHR => Ok(FileType::CharacterDevice),
            INODE_MODE_DIR => Ok(FileType::Directory),
            INODE_MODE_BLK => Ok(FileType::BlockDevice),
            INODE_MODE_REG => Ok(FileType::Regular),
            INODE_MODE_LNK => Ok(FileType::SymbolicLink),
            INODE_MODE_SOCK => Ok(FileType::Socket),
            _ => Err(ExtfsError::UnknownFileType(mode)),
        }
    }
}

/// 1-based identifier of an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeNumber(pub u32);

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl InodeNumber {
    // https://www.kernel.org/doc/html/latest/filesystems/ext4/overview.html#special-inodes
    /// Root directory.
    pub const ROOT: InodeNumber = InodeNumber(2);

    fn zero_based(&self, sb: &SuperBlock) -> Result<u32, ExtfsError> {
        if sb.inodes_per_group() == 0 {
            return Err(ExtfsError::InvalidGeometry("inodes_per_group is zero"));
        }
        self.0
            .checked_sub(1)
            .ok_or(ExtfsError::InvalidInodeNumber(self.0))
    }

    /// Get the block group this inode belongs to.
    pub fn resolve_block_group(&self, sb: &SuperBlock) -> Result<BlockGroupNumber, ExtfsError> {
        Ok(BlockGroupNumber(self.zero_based(sb)? / sb.inodes_per_group()))
    }

    /// Slot of this inode within its group's inode table.
    pub fn index_in_table(&self, sb: &SuperBlock) -> Result<u32, ExtfsError> {
        Ok(self.zero_based(sb)? % sb.inodes_per_group())
    }

    /// Absolute device offset of this inode's record.
    pub fn inode_offset<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<u64, ExtfsError> {
        let descriptor = self.resolve_block_group(sb)?.locate_descriptor(sb, device)?;
        let index = self.index_in_table(sb)? as u64;
        descriptor
            .inode_table()
            .checked_mul(sb.block_size())
            .and_then(|table| table.checked_add(index * sb.inode_size() as u64))
            .ok_or(ExtfsError::InvalidGeometry("inode offset overflows"))
    }

    /// Read exactly one inode record.
    pub fn locate_inode_bytes<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<ByteReader<'static>, ExtfsError> {
        let offset = self.inode_offset(sb, device)?;
        trace!("inode {} record at {}", self, offset);
        device.read_reader(offset, sb.inode_size() as usize)
    }

    /// Get Inode for this Inode number.
    pub fn decode_inode<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<INode, ExtfsError> {
        let reader = self.locate_inode_bytes(sb, device)?;
        INode::decode(&reader)
    }
}

/// https://www.kernel.org/doc/html/latest/filesystems/ext4/dynamic.html#index-nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct INode {
    pub(crate) mode: u16,
    pub(crate) uid: u16,
    /// File/directory size in bytes, both halves combined.
    size: u64,
    /// Last access time, in seconds since the epoch.
    pub(crate) atime: u32,
    /// Last inode change time, in seconds since the epoch.
    pub(crate) ctime: u32,
    /// Last data modification time, in seconds since the epoch.
    pub(crate) mtime: u32,
    pub(crate) gid: u16,
    pub(crate) links_count: u16,
    flags: u32,
    block: [u8; INODE_BLOCK_MAP_SIZE], // extent_header + extents
}

impl INode {
    pub fn decode(reader: &ByteReader) -> Result<Self, ExtfsError> {
        let mut block = [0u8; INODE_BLOCK_MAP_SIZE];
        block.copy_from_slice(reader.read_bytes(INODE_BLOCK_MAP_SIZE, BLOCK)?);

        Ok(Self {
            mode: reader.read_u16(MODE)?,
            uid: reader.read_u16(UID)?,
            size: compute_u64(reader.read_u32(SIZE_LO)?, reader.read_u32(SIZE_HIGH)?),
            atime: reader.read_u32(ATIME)?,
            ctime: reader.read_u32(CTIME)?,
            mtime: reader.read_u32(MTIME)?,
            gid: reader.read_u16(GID)?,
            links_count: reader.read_u16(LINKS_COUNT)?,
            flags: reader.read_u32(FLAGS)?,
            block,
        })
    }

    pub fn mode(&self) -> u16 {
        self.mode
    }

    /// Get file/directory/symlink size.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Raw block map / extent tree area.
    pub fn block_map(&self) -> &[u8] {
        &self.block
    }

    pub fn file_type(&self) -> Result<FileType, ExtfsError> {
        FileType::from_mode(self.mode)
    }

    /// Check whether it's a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & INODE_MODE_TYPE_MASK == INODE_MODE_DIR
    }

    /// Check whether it's a regular file.
    pub fn is_regular(&self) -> bool {
        self.mode & INODE_MODE_TYPE_MASK == INODE_MODE_REG
    }

    /// Check whether extents is used
    pub fn uses_extents(&self) -> bool {
        self.flags & INODE_FLAG_EXTENTS != 0
    }

    fn block_reader(&self) -> ByteReader<'_> {
        ByteReader::from_buffer(&self.block, 0)
    }

    pub fn extent_header(&self) -> Result<ExtentHeader, ExtfsError> {
        ExtentHeader::decode(&self.block_reader())
    }

    /// Number of extent records, not bytes or blocks.
    pub fn data_block_count(&self) -> Result<u16, ExtfsError> {
        Ok(self.extent_header()?.entries())
    }

    /// Iterate the leaf extents mapping this inode's data.
    pub fn extents(&self) -> Result<Extents<'_>, ExtfsError> {
        Extents::new(self.block_reader())
    }

    /// Read the whole run described by extent `extent_index`.
    pub fn read_data_block<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        extent_index: u16,
        device: &D,
    ) -> Result<Vec<u8>, ExtfsError> {
        let reader = self.block_reader();
        let eh = ExtentHeader::decode(&reader)?;
        if extent_index >= eh.entries() {
            return Err(ExtfsError::ExtentIndexOutOfRange {
                index: extent_index,
                entries: eh.entries(),
            });
        }

        let extent = Extent::decode(&reader, extent_index)?;
        let len = extent.checked_len()? as u64;
        let overflow = || ExtfsError::InvalidGeometry("extent run overflows");
        let offset = extent
            .start_block()
            .checked_mul(sb.block_size())
            .ok_or_else(overflow)?;
        let size = usize::try_from(len * sb.block_size()).map_err(|_| overflow())?;

        Ok(device.read_reader(offset, size)?.into_vec())
    }

    /// Returns an iterator over the entries within a directory.
    pub fn read_dir<'a, D: BlockSource + ?Sized>(
        &self,
        sb: &'a SuperBlock,
        device: &'a D,
    ) -> Result<ReadDir<'a, D>, ExtfsError> {
        ReadDir::new(self.clone(), sb, device)
    }

    /// Collect every directory entry up to the first unused record.
    pub fn list_directory_entries<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<Vec<DirectoryEntry>, ExtfsError> {
        self.read_dir(sb, device)?.collect()
    }

    /// Search the directory entries for `name`.
    pub fn find_child<D: BlockSource + ?Sized>(
        &self,
        name: &str,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<Option<DirectoryEntry>, ExtfsError> {
        for entry in self.read_dir(sb, device)? {
            let entry = entry?;
            if entry.name() == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub fn resolve_child<D: BlockSource + ?Sized>(
        &self,
        name: &str,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<InodeNumber, ExtfsError> {
        match self.find_child(name, sb, device)? {
            Some(entry) => {
                debug!("resolved {:?} to inode {}", name, entry.inode());
                Ok(entry.inode())
            }
            None => Err(ExtfsError::NameNotFound(name.to_string())),
        }
    }

    /// Read the entire contents into a bytes vector, truncated to the inode size.
    pub fn read_bytes<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<Vec<u8>, ExtfsError> {
        let mut data = Vec::new();
        let mut f = self.open(sb, device)?;
        std::io::Read::read_to_end(&mut f, &mut data)?;
        Ok(data)
    }

    /// Open the inode's data for streaming reads.
    pub fn open<'a, D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &'a D,
    ) -> Result<File<'a, D>, ExtfsError> {
        let extents = self.extents()?.collect::<Result<Vec<_>, _>>()?;
        for extent in &extents {
            extent.checked_len()?;
        }
        Ok(File::new(device, extents, self.size, sb.block_size()))
    }
}
