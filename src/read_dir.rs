use log::trace;

use super::{
    device::BlockSource, entry::DirectoryEntry, errors::ExtfsError, inode::INode,
    reader::ByteReader, superblock::SuperBlock,
};

/// Iterator over the entries of a directory, block by block.
///
/// The scan ends for good at the first record whose inode number is 0, or
/// after the first error.
pub struct ReadDir<'a, D: ?Sized> {
    inode: INode,
    sb: &'a SuperBlock,
    device: &'a D,
    extents: u16,
    next_extent: u16,
    run: Vec<u8>,
    offset: usize,
    done: bool,
}

impl<'a, D: BlockSource + ?Sized> ReadDir<'a, D> {
    pub fn new(inode: INode, sb: &'a SuperBlock, device: &'a D) -> Result<Self, ExtfsError> {
        let extents = inode.data_block_count()?;
        Ok(Self {
            inode,
            sb,
            device,
            extents,
            next_extent: 0,
            run: Vec::new(),
            offset: 0,
            done: false,
        })
    }

    fn next_entry(&mut self) -> Result<Option<DirectoryEntry>, ExtfsError> {
        let offset = self.offset;
        let reader = ByteReader::from_buffer(&self.run, offset);
        if reader.read_u32(0)? == 0 {
            return Ok(None);
        }

        let entry = DirectoryEntry::decode(&reader).map_err(|e| match e {
            ExtfsError::CorruptDirectory { reason, .. } => {
                ExtfsError::CorruptDirectory { offset, reason }
            }
            other => other,
        })?;

        // records never straddle a block boundary
        let block_size = self.sb.block_size() as usize;
        let block_end = (offset / block_size + 1) * block_size;
        let next = offset + entry.record_len(self.sb.block_size());
        if next > block_end {
            return Err(ExtfsError::CorruptDirectory {
                offset,
                reason: "record overruns its block",
            });
        }

        trace!(
            "dir entry at {}: inode={} name={:?}",
            offset,
            entry.inode(),
            entry.name()
        );
        self.offset = next;
        Ok(Some(entry))
    }
}

impl<D: BlockSource + ?Sized> Iterator for ReadDir<'_, D> {
    type Item = Result<DirectoryEntry, ExtfsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            // reach the end of the run, load the next extent
            if self.offset >= self.run.len() {
                if self.next_extent >= self.extents {
                    self.done = true;
                    return None;
                }
                match self
                    .inode
                    .read_data_block(self.sb, self.next_extent, self.device)
                {
                    Ok(run) => {
                        self.run = run;
                        self.offset = 0;
                        self.next_extent += 1;
                        continue;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            return match self.next_entry() {
                Ok(Some(entry)) => Some(Ok(entry)),
                Ok(None) => {
                    self.done = true;
                    None
                }
                Err(e) => {
                    self.done = true;
                    Some(Err(e))
                }
            };
        }
    }
}
