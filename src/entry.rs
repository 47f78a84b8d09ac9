use super::{
    constants::{DIR_REC_LEN_MAX, DOTDOT_DIR_NAME, DOT_DIR_NAME},
    errors::ExtfsError,
    inode::{FileType, InodeNumber},
    reader::ByteReader,
};

const INODE: usize = 0x0;
const REC_LEN: usize = 0x4;
const NAME_LEN: usize = 0x6;
const FILE_TYPE: usize = 0x7;
const NAME: usize = 0x8;

/// Fixed part of a directory entry preceding the name.
pub const DIR_ENTRY_HEADER_SIZE: usize = NAME;

/// Linear (Classic) Directories
///
/// https://www.kernel.org/doc/html/latest/filesystems/ext4/dynamic.html#directory-entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Number of the inode that this directory entry points to.
    inode: InodeNumber,
    /// Length of this directory entry.
    rec_len: u16,
    /// File type code, only meaningful with the filetype feature.
    /// - 0x0 Unknown.
    /// - 0x1 Regular file.
    /// - 0x2 Directory.
    /// - 0x3 Character device file.
    /// - 0x4 Block device file.
    /// - 0x5 FIFO.
    /// - 0x6 Socket.
    /// - 0x7 Symbolic link.
    file_type: u8,
    /// File name, invalid UTF-8 replaced.
    name: String,
}

impl DirectoryEntry {
    /// Decode the record at the start of `reader`.
    pub fn decode(reader: &ByteReader) -> Result<Self, ExtfsError> {
        let inode = reader.read_u32(INODE)?;
        let rec_len = reader.read_u16(REC_LEN)?;
        let name_len = reader.read_u8(NAME_LEN)?;

        if rec_len == 0 {
            return Err(ExtfsError::CorruptDirectory {
                offset: 0,
                reason: "zero record length",
            });
        }
        if (rec_len as usize) < DIR_ENTRY_HEADER_SIZE + name_len as usize {
            return Err(ExtfsError::CorruptDirectory {
                offset: 0,
                reason: "record shorter than its name",
            });
        }

        let name = reader.read_bytes(name_len as usize, NAME)?;
        Ok(Self {
            inode: InodeNumber(inode),
            rec_len,
            file_type: reader.read_u8(FILE_TYPE)?,
            name: String::from_utf8_lossy(name).to_string(),
        })
    }

    pub fn inode(&self) -> InodeNumber {
        self.inode
    }

    /// Raw on-disk record length.
    pub fn rec_len(&self) -> u16 {
        self.rec_len
    }

    /// Distance in bytes to the next record in a block of `block_size` bytes.
    ///
    /// With 64 KiB blocks a record spanning the whole block is stored as 65535.
    pub fn record_len(&self, block_size: u64) -> usize {
        if self.rec_len == DIR_REC_LEN_MAX && block_size == 1 << 16 {
            block_size as usize
        } else {
            self.rec_len as usize
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_file_type(&self) -> u8 {
        self.file_type
    }

    /// File type recorded in the entry itself, if any.
    pub fn file_type_hint(&self) -> Option<FileType> {
        match self.file_type {
            0x1 => Some(FileType::Regular),
            0x2 => Some(FileType::Directory),
            0x3 => Some(FileType::CharacterDevice),
            0x4 => Some(FileType::BlockDevice),
            0x5 => Some(FileType::Fifo),
            0x6 => Some(FileType::Socket),
            0x7 => Some(FileType::SymbolicLink),
            _ => None,
        }
    }

    /// Check whether name of the entry is '.'.
    pub fn is_dot(&self) -> bool {
        self.name == DOT_DIR_NAME
    }

    /// Check whether name of the entry is '..'.
    pub fn is_dotdot(&self) -> bool {
        self.name == DOTDOT_DIR_NAME
    }
}
