use super::{
    constants::{
        FEATURE_INCOMPAT_64BIT, FEATURE_INCOMPAT_EXTENTS, FEATURE_INCOMPAT_FILETYPE,
        GOOD_OLD_INODE_SIZE, GOOD_OLD_REV, GROUP_DESC_SIZE_32, GROUP_DESC_SIZE_64, MAX_LOG_BLOCK_SIZE, SUPER_BLOCK_MAGIC,
        SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE,
    },
    device::BlockSource,
    errors::ExtfsError,
    reader::ByteReader,
    utils::{compute_u64, trim_nul},
};

// Field offsets within the superblock.
const INODES_COUNT: usize = 0x0;
const BLOCKS_COUNT_LO: usize = 0x4;
const FIRST_DATA_BLOCK: usize = 0x14;
const LOG_BLOCK_SIZE: usize = 0x18;
const BLOCKS_PER_GROUP: usize = 0x20;
const INODES_PER_GROUP: usize = 0x28;
const MAGIC: usize = 0x38;
const REV_LEVEL: usize = 0x4C;
const INODE_SIZE: usize = 0x58;
const FEATURE_COMPAT: usize = 0x5C;
const FEATURE_INCOMPAT: usize = 0x60;
const FEATURE_RO_COMPAT: usize = 0x64;
const VOLUME_NAME: usize = 0x78;
const DESC_SIZE: usize = 0xFE;
const BLOCKS_COUNT_HI: usize = 0x150;

/// Filesystem-wide geometry.
///
/// https://www.kernel.org/doc/html/latest/filesystems/ext4/globals.html#super-block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub(crate) magic: u16,
    pub(crate) log_block_size: u32,
    pub(crate) block_size: u64,
    pub(crate) blocks_per_group: u32,
    pub(crate) inodes_per_group: u32,
    pub(crate) inode_size: u16,

    pub(crate) inodes_count: u32,
    pub(crate) blocks_count: u64,
    pub(crate) first_data_block: u32,
    pub(crate) rev_level: u32,
    pub(crate) feature_compat: u32,
    pub(crate) feature_incompat: u32,
    pub(crate) feature_ro_compat: u32,
    pub(crate) volume_name: String,
    pub(crate) desc_size: u16,
}

impl SuperBlock {
    /// Decode the superblock from a reader positioned at its first byte.
    ///
    /// Only the magic number is validated; feature flags are left to callers.
    pub fn decode(reader: &ByteReader) -> Result<Self, ExtfsError> {
        let magic = reader.read_u16(MAGIC)?;
        if magic != SUPER_BLOCK_MAGIC {
            return Err(ExtfsError::InvalidSignature(magic));
        }

        let log_block_size = reader.read_u32(LOG_BLOCK_SIZE)?;
        if log_block_size > MAX_LOG_BLOCK_SIZE {
            let shift = log_block_size.saturating_add(10);
            return Err(ExtfsError::UnsupportedBlockSize(
                1u64.checked_shl(shift).unwrap_or(u64::MAX),
            ));
        }

        Ok(Self {
            magic,
            log_block_size,
            block_size: 1024 << log_block_size,
            blocks_per_group: reader.read_u32(BLOCKS_PER_GROUP)?,
            inodes_per_group: reader.read_u32(INODES_PER_GROUP)?,
            inode_size: reader.read_u16(INODE_SIZE)?,
            inodes_count: reader.read_u32(INODES_COUNT)?,
            blocks_count: compute_u64(
                reader.read_u32(BLOCKS_COUNT_LO)?,
                reader.read_u32(BLOCKS_COUNT_HI)?,
            ),
            first_data_block: reader.read_u32(FIRST_DATA_BLOCK)?,
            rev_level: reader.read_u32(REV_LEVEL)?,
            feature_compat: reader.read_u32(FEATURE_COMPAT)?,
            feature_incompat: reader.read_u32(FEATURE_INCOMPAT)?,
            feature_ro_compat: reader.read_u32(FEATURE_RO_COMPAT)?,
            volume_name: trim_nul(reader.read_bytes(16, VOLUME_NAME)?),
            desc_size: reader.read_u16(DESC_SIZE)?,
        })
    }

    /// Read and decode the superblock at its fixed device offset.
    pub fn from_device<D: BlockSource + ?Sized>(device: &D) -> Result<Self, ExtfsError> {
        let reader = device.read_reader(SUPER_BLOCK_OFFSET, SUPER_BLOCK_SIZE)?;
        Self::decode(&reader)
    }

    pub fn magic(&self) -> u16 {
        self.magic
    }

    // Get size of single block.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn blocks_per_group(&self) -> u32 {
        self.blocks_per_group
    }

    pub fn inodes_per_group(&self) -> u32 {
        self.inodes_per_group
    }

    /// Size of one inode table record in bytes.
    pub fn inode_size(&self) -> u16 {
        if self.rev_level == GOOD_OLD_REV {
            GOOD_OLD_INODE_SIZE
        } else {
            self.inode_size
        }
    }

    pub fn inodes_count(&self) -> u32 {
        self.inodes_count
    }

    /// Get total block count.
    pub fn block_count(&self) -> u64 {
        self.blocks_count
    }

    pub fn first_data_block(&self) -> u32 {
        self.first_data_block
    }

    pub fn rev_level(&self) -> u32 {
        self.rev_level
    }

    pub fn feature_compat(&self) -> u32 {
        self.feature_compat
    }

    pub fn feature_incompat(&self) -> u32 {
        self.feature_incompat
    }

    pub fn feature_ro_compat(&self) -> u32 {
        self.feature_ro_compat
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    /// Check whether it supports 64bit.
    pub fn feature_incompat_64bit(&self) -> bool {
        (self.feature_incompat & FEATURE_INCOMPAT_64BIT) != 0
    }

    /// Check whether dir entry supports filetype.
    pub fn feature_incompat_filetype(&self) -> bool {
        (self.feature_incompat & FEATURE_INCOMPAT_FILETYPE) != 0
    }

    /// Check whether the filesystem uses extents.
    pub fn feature_incompat_extents(&self) -> bool {
        (self.feature_incompat & FEATURE_INCOMPAT_EXTENTS) != 0
    }

    /// Byte stride of the group descriptor table.
    pub fn descriptor_size(&self) -> u64 {
        if !self.feature_incompat_64bit() {
            GROUP_DESC_SIZE_32
        } else if (self.desc_size as u64) >= GROUP_DESC_SIZE_64 {
            self.desc_size as u64
        } else {
            GROUP_DESC_SIZE_64
        }
    }

    /// Get block group count, when the superblock records enough to know it.
    pub fn block_group_count(&self) -> Option<u32> {
        if self.blocks_count == 0 || self.blocks_per_group == 0 {
            return None;
        }
        let first = self.first_data_block as u64;
        let groups = self
            .blocks_count
            .saturating_sub(first)
            .div_ceil(self.blocks_per_group as u64);
        u32::try_from(groups).ok()
    }

    #[cfg(test)]
    pub(crate) fn synthetic(block_size: u64, inodes_per_group: u32, inode_size: u16) -> Self {
        Self {
            magic: SUPER_BLOCK_MAGIC,
            log_block_size: (block_size / 1024).trailing_zeros(),
            block_size,
            blocks_per_group: 8 * block_size as u32,
            inodes_per_group,
            inode_size,
            inodes_count: 0,
            blocks_count: 0,
            first_data_block: 0,
            rev_level: 1,
            feature_compat: 0,
            feature_ro_compat: 0,
            feature_incompat: FEATURE_INCOMPAT_FILETYPE
                | FEATURE_INCOMPAT_EXTENTS
                | FEATURE_INCOMPAT_64BIT,
            volume_name: String::new(),
            desc_size: GROUP_DESC_SIZE_64 as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::SuperBlock;
    use crate::{errors::ExtfsError, reader::ByteReader};

    fn raw_superblock(log_block_size: u32, magic: u16) -> Vec<u8> {
        let mut raw = vec![0u8; 1024];
        raw[0x0..0x4].copy_from_slice(&64u32.to_le_bytes());
        raw[0x4..0x8].copy_from_slice(&8192u32.to_le_bytes());
        raw[0x18..0x1C].copy_from_slice(&log_block_size.to_le_bytes());
        raw[0x20..0x24].copy_from_slice(&32768u32.to_le_bytes());
        raw[0x28..0x2C].copy_from_slice(&32u32.to_le_bytes());
        raw[0x38..0x3A].copy_from_slice(&magic.to_le_bytes());
        raw[0x4C..0x50].copy_from_slice(&1u32.to_le_bytes());
        raw[0x58..0x5A].copy_from_slice(&256u16.to_le_bytes());
        raw[0x60..0x64].copy_from_slice(&0x2C2u32.to_le_bytes());
        raw[0x78..0x7E].copy_from_slice(b"rootfs");
        raw[0xFE..0x100].copy_from_slice(&64u16.to_le_bytes());
        raw
    }

    #[test]
    fn test_super_block() {
        let raw = raw_superblock(2, 0xEF53);
        let sb = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap();
        assert_eq!(sb.magic(), 0xEF53);
        assert_eq!(sb.block_size(), 4096);
        assert_eq!(sb.blocks_per_group(), 32768);
        assert_eq!(sb.inodes_per_group(), 32);
        assert_eq!(sb.inode_size(), 256);
        assert_eq!(sb.inodes_count(), 64);
        assert_eq!(sb.block_count(), 8192);
        assert_eq!(sb.volume_name(), "rootfs");
        assert!(sb.feature_incompat_64bit());
        assert!(sb.feature_incompat_extents());
        assert!(sb.feature_incompat_filetype());
        assert_eq!(sb.descriptor_size(), 64);
        assert_eq!(sb.block_group_count(), Some(1));
    }

    #[test]
    fn test_invalid_magic() {
        let raw = raw_superblock(2, 0x1234);
        let err = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap_err();
        assert!(matches!(err, ExtfsError::InvalidSignature(0x1234)));
    }

    #[test]
    fn test_absurd_block_size() {
        let raw = raw_superblock(40, 0xEF53);
        let err = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap_err();
        assert!(matches!(err, ExtfsError::UnsupportedBlockSize(_)));
    }

    #[test]
    fn test_block_size_above_64k_rejected() {
        let raw = raw_superblock(6, 0xEF53);
        let sb = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap();
        assert_eq!(sb.block_size(), 65536);

        for log in [7, 16] {
            let raw = raw_superblock(log, 0xEF53);
            let err = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap_err();
            assert!(matches!(err, ExtfsError::UnsupportedBlockSize(size) if size == 1024 << log));
        }
    }

    #[test]
    fn test_revision_zero_inode_size() {
        let mut raw = raw_superblock(2, 0xEF53);
        raw[0x4C..0x50].copy_from_slice(&0u32.to_le_bytes());
        raw[0x58..0x5A].copy_from_slice(&0u16.to_le_bytes());
        let sb = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap();
        assert_eq!(sb.rev_level(), 0);
        assert_eq!(sb.inode_size(), 128);
    }

    #[test]
    fn test_truncated_superblock() {
        let raw = raw_superblock(2, 0xEF53);
        let err = SuperBlock::decode(&ByteReader::from_buffer(&raw[..0x100], 0)).unwrap_err();
        assert!(matches!(err, ExtfsError::OutOfBounds { .. }));
    }

    #[test]
    fn test_descriptor_size_without_64bit() {
        let mut sb = SuperBlock::synthetic(4096, 32, 256);
        sb.feature_incompat = 0x42;
        assert_eq!(sb.descriptor_size(), 32);
        sb.feature_incompat |= 0x80;
        sb.desc_size = 0;
        assert_eq!(sb.descriptor_size(), 64);
    }

    #[test]
    fn test_from_device() {
        let mut image = vec![0u8; 4096];
        image[1024..2048].copy_from_slice(&raw_superblock(1, 0xEF53));
        let sb = SuperBlock::from_device(&image).unwrap();
        assert_eq!(sb.block_size(), 2048);
    }

    proptest! {
        #[test]
        fn block_size_is_power_of_two_and_decode_is_idempotent(log in 1u32..=6) {
            let raw = raw_superblock(log, 0xEF53);
            let first = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap();
            let second = SuperBlock::decode(&ByteReader::from_buffer(&raw, 0)).unwrap();
            prop_assert!(first.block_size().is_power_of_two());
            prop_assert!(first.block_size() >= 2048);
            prop_assert_eq!(first.block_size(), 1u64 << (10 + log));
            prop_assert_eq!(first, second);
        }
    }
}
