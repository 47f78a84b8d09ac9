use std::fmt;

use log::trace;
use serde::Deserialize;

use super::{
    codec::Record,
    constants::{GROUP_DESC_SIZE_32, GROUP_DESC_SIZE_64, MIN_BLOCK_SIZE},
    device::BlockSource,
    errors::ExtfsError,
    reader::ByteReader,
    superblock::SuperBlock,
    utils::compute_u64,
};

#[derive(Deserialize, Debug, Default, Clone)]
#[allow(dead_code)]
pub struct BlockGroupDescriptor32 {
    block_bitmap_lo: u32,
    inode_bitmap_lo: u32,
    inode_table_lo: u32,
    free_blocks_count_lo: u16,
    free_inodes_count_lo: u16,
    used_dirs_count_lo: u16,
    flags: u16,
    exclude_bitmap_lo: u32,
    block_bitmap_csum_lo: u16,
    inode_bitmap_csum_lo: u16,
    itable_unused_lo: u16,
    checksum: u16,
}

impl Record for BlockGroupDescriptor32 {
    const SIZE: usize = GROUP_DESC_SIZE_32 as usize;
}

/// Upper halves, present only with the 64bit feature and s_desc_size > 32.
#[derive(Deserialize, Debug, Default, Clone)]
#[allow(dead_code)]
pub struct BlockGroupDescriptorHi {
    block_bitmap_hi: u32,
    inode_bitmap_hi: u32,
    inode_table_hi: u32,
    free_blocks_count_hi: u16,
    free_inodes_count_hi: u16,
    used_dirs_count_hi: u16,
    itable_unused_hi: u16,
    exclude_bitmap_hi: u32,
    block_bitmap_csum_hi: u16,
    inode_bitmap_csum_hi: u16,
    reserved: u32,
}

impl Record for BlockGroupDescriptorHi {
    const SIZE: usize = (GROUP_DESC_SIZE_64 - GROUP_DESC_SIZE_32) as usize;
}

/// https://www.kernel.org/doc/html/latest/filesystems/ext4/globals.html#block-group-descriptors
#[derive(Debug, Default, Clone)]
pub struct BlockGroupDescriptor {
    descriptor32: BlockGroupDescriptor32,
    hi: BlockGroupDescriptorHi,
}

impl BlockGroupDescriptor {
    /// Decode one descriptor; `desc_size` below 64 means the upper halves are absent.
    pub fn decode(reader: &ByteReader, desc_size: u64) -> Result<Self, ExtfsError> {
        let descriptor32 = reader.decode_record::<BlockGroupDescriptor32>(0)?;
        let hi = if desc_size >= GROUP_DESC_SIZE_64 {
            reader.decode_record::<BlockGroupDescriptorHi>(BlockGroupDescriptor32::SIZE)?
        } else {
            BlockGroupDescriptorHi::default()
        };

        Ok(Self { descriptor32, hi })
    }

    /// get location of block bitmap
    pub fn block_bitmap(&self) -> u64 {
        compute_u64(self.descriptor32.block_bitmap_lo, self.hi.block_bitmap_hi)
    }

    /// get location of inode bitmap
    pub fn inode_bitmap(&self) -> u64 {
        compute_u64(self.descriptor32.inode_bitmap_lo, self.hi.inode_bitmap_hi)
    }

    /// get location of inode table
    pub fn inode_table(&self) -> u64 {
        compute_u64(self.descriptor32.inode_table_lo, self.hi.inode_table_hi)
    }
}

/// Index of a block group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockGroupNumber(pub u32);

impl fmt::Display for BlockGroupNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BlockGroupNumber {
    /// Device offset of this group's descriptor.
    ///
    /// The table starts one block in, right after the block holding the
    /// superblock. That only holds for blocks of 2 KiB and up.
    pub fn descriptor_offset(&self, sb: &SuperBlock) -> Result<u64, ExtfsError> {
        let block_size = sb.block_size();
        if block_size < MIN_BLOCK_SIZE {
            return Err(ExtfsError::UnsupportedBlockSize(block_size));
        }
        if let Some(count) = sb.block_group_count() {
            if self.0 >= count {
                return Err(ExtfsError::BlockGroupOutOfRange {
                    group: self.0,
                    count,
                });
            }
        }

        let table_start = block_size;
        (self.0 as u64)
            .checked_mul(sb.descriptor_size())
            .and_then(|rel| rel.checked_add(table_start))
            .ok_or(ExtfsError::InvalidGeometry("group descriptor offset overflows"))
    }

    /// Read and decode this group's descriptor.
    pub fn locate_descriptor<D: BlockSource + ?Sized>(
        &self,
        sb: &SuperBlock,
        device: &D,
    ) -> Result<BlockGroupDescriptor, ExtfsError> {
        let offset = self.descriptor_offset(sb)?;
        let desc_size = sb.descriptor_size();
        let read_size = desc_size.min(GROUP_DESC_SIZE_64) as usize;
        let reader = device.read_reader(offset, read_size)?;
        let bgd = BlockGroupDescriptor::decode(&reader, desc_size)?;
        trace!(
            "block group {} descriptor at {}: inode_table={}",
            self,
            offset,
            bgd.inode_table()
        );
        Ok(bgd)
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockGroupDescriptor, BlockGroupNumber};
    use crate::{errors::ExtfsError, reader::ByteReader, superblock::SuperBlock};

    fn raw_descriptor(inode_table_lo: u32, inode_table_hi: u32) -> Vec<u8> {
        let mut raw = vec![0u8; 64];
        raw[0x0..0x4].copy_from_slice(&3u32.to_le_bytes());
        raw[0x4..0x8].copy_from_slice(&4u32.to_le_bytes());
        raw[0x8..0xC].copy_from_slice(&inode_table_lo.to_le_bytes());
        raw[0x28..0x2C].copy_from_slice(&inode_table_hi.to_le_bytes());
        raw
    }

    #[test]
    fn test_block_group_descriptor() {
        let raw = raw_descriptor(5, 1);
        let bgd = BlockGroupDescriptor::decode(&ByteReader::from_buffer(&raw, 0), 64).unwrap();
        assert_eq!(bgd.block_bitmap(), 3);
        assert_eq!(bgd.inode_bitmap(), 4);
        assert_eq!(bgd.inode_table(), (1u64 << 32) + 5);

        // 32-byte descriptors have no upper half
        let bgd = BlockGroupDescriptor::decode(&ByteReader::from_buffer(&raw[..32], 0), 32).unwrap();
        assert_eq!(bgd.inode_table(), 5);
    }

    #[test]
    fn test_locate_descriptor() {
        let sb = SuperBlock::synthetic(4096, 32, 256);
        let mut image = vec![0u8; 3 * 4096];
        image[4096..4160].copy_from_slice(&raw_descriptor(10, 0));
        image[4160..4224].copy_from_slice(&raw_descriptor(20, 0));

        assert_eq!(BlockGroupNumber(1).descriptor_offset(&sb).unwrap(), 4096 + 64);
        let bgd = BlockGroupNumber(0).locate_descriptor(&sb, &image).unwrap();
        assert_eq!(bgd.inode_table(), 10);
        let bgd = BlockGroupNumber(1).locate_descriptor(&sb, &image).unwrap();
        assert_eq!(bgd.inode_table(), 20);
    }

    #[test]
    fn test_1024_block_size_unsupported() {
        let sb = SuperBlock::synthetic(1024, 32, 256);
        let image = vec![0u8; 8192];
        let err = BlockGroupNumber(0).locate_descriptor(&sb, &image).unwrap_err();
        assert!(matches!(err, ExtfsError::UnsupportedBlockSize(1024)));
    }

    #[test]
    fn test_group_out_of_range() {
        let mut sb = SuperBlock::synthetic(4096, 32, 256);
        sb.blocks_count = 100;
        let err = BlockGroupNumber(1).descriptor_offset(&sb).unwrap_err();
        assert!(matches!(
            err,
            ExtfsError::BlockGroupOutOfRange { group: 1, count: 1 }
        ));
    }
}
