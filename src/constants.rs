/// The superblock always starts 1024 bytes into the device.
pub const SUPER_BLOCK_OFFSET: u64 = 1024;
pub const SUPER_BLOCK_SIZE: usize = 1024;

pub const SUPER_BLOCK_MAGIC: u16 = 0xEF53;
pub const EXTENT_HEADER_MAGIC: u16 = 0xF30A;

/// Smallest block size whose group descriptor table starts at block 1.
pub const MIN_BLOCK_SIZE: u64 = 2048;
/// Largest `log_block_size` ext4 mounts: 64 KiB blocks.
pub const MAX_LOG_BLOCK_SIZE: u32 = 6;

/// Revision 0 volumes have fixed 128-byte inodes and no `s_inode_size`.
pub const GOOD_OLD_REV: u32 = 0;
pub const GOOD_OLD_INODE_SIZE: u16 = 128;

// https://www.kernel.org/doc/html/latest/filesystems/ext4/globals.html#block-group-descriptors
pub const GROUP_DESC_SIZE_32: u64 = 32;
pub const GROUP_DESC_SIZE_64: u64 = 64;

/// Directory entries record the file type.
pub const FEATURE_INCOMPAT_FILETYPE: u32 = 0x2;
/// Files in this filesystem use extents.
pub const FEATURE_INCOMPAT_EXTENTS: u32 = 0x40;
/// Enable a filesystem size of 2^64 blocks (INCOMPAT_64BIT).
pub const FEATURE_INCOMPAT_64BIT: u32 = 0x80;

pub const INODE_MODE_TYPE_MASK: u16 = 0xF000;
/// FIFO
pub const INODE_MODE_FIFO: u16 = 0x1000;
/// Character device
pub const INODE_MODE_CHR: u16 = 0x2000;
/// Directory
pub const INODE_MODE_DIR: u16 = 0x4000;
/// Block device
pub const INODE_MODE_BLK: u16 = 0x6000;
/// Regular file
pub const INODE_MODE_REG: u16 = 0x8000;
/// Symbolic link
pub const INODE_MODE_LNK: u16 = 0xA000;
/// Socket
pub const INODE_MODE_SOCK: u16 = 0xC000;

// https://www.kernel.org/doc/html/latest/filesystems/ext4/dynamic.html#i-flags
/// Inode uses extents.
pub const INODE_FLAG_EXTENTS: u32 = 0x8_0000;

/// Size of the block map / extent tree area embedded in an inode.
pub const INODE_BLOCK_MAP_SIZE: usize = 60;

/// Extents longer than this are uninitialized (preallocated, unwritten).
pub const EXTENT_INIT_MAX_LEN: u16 = 32768;

/// A 64 KiB `rec_len` does not fit in 16 bits and is stored as this.
pub const DIR_REC_LEN_MAX: u16 = 65535;

pub const DOT_DIR_NAME: &str = ".";
pub const DOTDOT_DIR_NAME: &str = "..";
