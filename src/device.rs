use std::io::{self, ErrorKind};

use log::trace;

use super::{errors::ExtfsError, reader::ByteReader};

/// Byte-addressed source of filesystem data with pread semantics.
///
/// Implementations never share a seek position, so a `&self` read at one
/// offset does not disturb a read at another.
pub trait BlockSource {
    /// Fill `buf` with the bytes starting at device offset `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Read `size` bytes at `offset` into a freshly owned [`ByteReader`].
    fn read_reader(&self, offset: u64, size: usize) -> Result<ByteReader<'static>, ExtfsError> {
        trace!("pread offset={} size={}", offset, size);
        let mut buf = vec![0; size];
        self.read_exact_at(offset, &mut buf)
            .map_err(|source| ExtfsError::DeviceRead {
                offset,
                size,
                source,
            })?;
        Ok(ByteReader::from_owned(buf))
    }
}

impl BlockSource for [u8] {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "offset overflows usize"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!(
                        "read of {} bytes at {} past end of {} byte image",
                        buf.len(),
                        offset,
                        self.len()
                    ),
                )
            })?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

impl BlockSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_exact_at(offset, buf)
    }
}

#[cfg(unix)]
impl BlockSource for std::fs::File {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }
}

impl<T: BlockSource + ?Sized> BlockSource for &T {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact_at(offset, buf)
    }
}
