use std::{
    cmp,
    io::{Error, ErrorKind, Read, Seek, SeekFrom},
};

use super::{device::BlockSource, extent::Extent};

/// Read-only handle on a file's data, mapped through its extents.
///
/// Logical blocks without an extent read back as zeros.
pub struct File<'a, D: ?Sized> {
    device: &'a D,
    extents: Vec<Extent>,
    len: u64,
    current: u64,

    block_size: u64,
}

impl<'a, D: BlockSource + ?Sized> File<'a, D> {
    pub(crate) fn new(device: &'a D, mut extents: Vec<Extent>, len: u64, block_size: u64) -> Self {
        extents.sort_by_key(|e| e.logical_block());
        Self {
            device,
            extents,
            len,
            current: 0,
            block_size,
        }
    }

    /// File size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset the next read starts from.
    pub fn position(&self) -> u64 {
        self.current
    }
}

impl<D: BlockSource + ?Sized> Read for File<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() || self.current >= self.len {
            return Ok(0);
        }

        let logical = self.current / self.block_size;
        let want = cmp::min(self.len - self.current, buf.len() as u64);

        let n = match self.extents.iter().find(|e| e.contains(logical)) {
            Some(e) => {
                let run_start = e.logical_block() as u64 * self.block_size;
                let run_end = run_start + e.len() as u64 * self.block_size;
                let n = cmp::min(want, run_end - self.current) as usize;
                let pos = e
                    .start_block()
                    .checked_mul(self.block_size)
                    .and_then(|start| start.checked_add(self.current - run_start))
                    .ok_or_else(|| {
                        Error::new(
                            ErrorKind::InvalidData,
                            format!("extent at block {} overflows device offset", e.start_block()),
                        )
                    })?;
                self.device.read_exact_at(pos, &mut buf[..n])?;
                n
            }
            // hole: zero-fill up to the next mapped run
            None => {
                let next_run = self
                    .extents
                    .iter()
                    .map(|e| e.logical_block() as u64 * self.block_size)
                    .find(|&start| start > self.current)
                    .unwrap_or(u64::MAX);
                let n = cmp::min(want, next_run - self.current) as usize;
                buf[..n].fill(0);
                n
            }
        };

        self.current += n as u64;
        Ok(n)
    }
}

impl<D: BlockSource + ?Sized> Seek for File<'_, D> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.len.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.current.checked_add_signed(offset),
        };

        self.current = target.ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        Ok(self.current)
    }
}
