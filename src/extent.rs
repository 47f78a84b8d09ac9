use serde::Deserialize;

use super::{
    codec::Record,
    constants::{EXTENT_HEADER_MAGIC, EXTENT_INIT_MAX_LEN},
    errors::ExtfsError,
    reader::ByteReader,
    utils::compute_u64,
};

/// The extent tree header
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentHeader {
    magic: u16,
    /// Number of valid entries following the header.
    pub(crate) entries: u16,
    /// Maximum number of entries that could follow the header.
    max: u16,
    /// Depth of this node in the tree; 0 means the entries are leaf extents.
    pub(crate) depth: u16,
    #[allow(dead_code)]
    generation: u32,
}

impl Record for ExtentHeader {
    const SIZE: usize = 12;
}

impl ExtentHeader {
    /// Decode and validate a leaf node header.
    pub fn decode(reader: &ByteReader) -> Result<Self, ExtfsError> {
        let eh = reader.decode_record::<ExtentHeader>(0)?;
        if eh.magic != EXTENT_HEADER_MAGIC {
            return Err(ExtfsError::CorruptExtentTree(eh.magic));
        }
        // index nodes are not followed
        if eh.depth != 0 {
            return Err(ExtfsError::UnsupportedExtentDepth(eh.depth));
        }

        Ok(eh)
    }

    pub fn entries(&self) -> u16 {
        self.entries
    }

    pub fn max_entries(&self) -> u16 {
        self.max
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }
}

/// Leaf nodes of the extent tree
///
/// https://www.kernel.org/doc/html/latest/filesystems/ext4/dynamic.html#extent-tree
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// First file block number that this extent covers.
    block: u32,
    /// Number of blocks covered by extent.
    pub(crate) len: u16,
    /// Upper 16-bits of the block number to which this extent points.
    start_hi: u16,
    /// Lower 32-bits of the block number to which this extent points.
    start_lo: u32,
}

impl Record for Extent {
    const SIZE: usize = 12;
}

impl Extent {
    /// Decode the `index`-th record following the header.
    pub fn decode(reader: &ByteReader, index: u16) -> Result<Self, ExtfsError> {
        let offset = Extent::SIZE * (index as usize + 1);
        reader.decode_record::<Extent>(offset)
    }

    /// First logical file block covered by this extent.
    pub fn logical_block(&self) -> u32 {
        self.block
    }

    /// Number of blocks in the run.
    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Get location of blocks referenced by the extent.
    pub fn start_block(&self) -> u64 {
        compute_u64(self.start_lo, self.start_hi as u32)
    }

    /// Run length after rejecting runs that do not map initialized data.
    pub fn checked_len(&self) -> Result<u16, ExtfsError> {
        if self.len == 0 || self.len > EXTENT_INIT_MAX_LEN {
            return Err(ExtfsError::UnsupportedExtentLength(self.len));
        }
        Ok(self.len)
    }

    /// Whether logical block `logical` falls inside this run.
    pub fn contains(&self, logical: u64) -> bool {
        let first = self.block as u64;
        logical >= first && logical < first + self.len as u64
    }
}

/// Lazy iterator over the leaf extents of one node.
///
/// Restart by decoding the node again; nothing is read ahead.
#[derive(Debug, Clone)]
pub struct Extents<'a> {
    reader: ByteReader<'a>,
    header: ExtentHeader,
    next: u16,
}

impl<'a> Extents<'a> {
    pub fn new(reader: ByteReader<'a>) -> Result<Self, ExtfsError> {
        let header = ExtentHeader::decode(&reader)?;
        Ok(Self {
            reader,
            header,
            next: 0,
        })
    }

    pub fn header(&self) -> &ExtentHeader {
        &self.header
    }
}

impl Iterator for Extents<'_> {
    type Item = Result<Extent, ExtfsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.header.entries {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(Extent::decode(&self.reader, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.header.entries.saturating_sub(self.next) as usize;
        (0, Some(left))
    }
}
