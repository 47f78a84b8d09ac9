use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};

use super::{codec::Record, errors::ExtfsError};

/// A bounded view over a byte buffer, offset by `base`.
///
/// Every read addresses `buffer[base + offset..base + offset + len]` and fails
/// with [`ExtfsError::OutOfBounds`] instead of slicing past the end.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: Cow<'a, [u8]>,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Wrap a buffer that is already in memory.
    pub fn from_buffer(buffer: &'a [u8], base: usize) -> Self {
        Self {
            buffer: Cow::Borrowed(buffer),
            base,
        }
    }

    /// Take ownership of a freshly read buffer.
    pub fn from_owned(buffer: Vec<u8>) -> ByteReader<'static> {
        ByteReader {
            buffer: Cow::Owned(buffer),
            base: 0,
        }
    }

    /// Number of bytes addressable through this view.
    pub fn len(&self) -> usize {
        self.buffer.len().saturating_sub(self.base)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, len: usize, offset: usize) -> Result<&[u8], ExtfsError> {
        let out_of_bounds = || ExtfsError::OutOfBounds {
            offset: self.base.saturating_add(offset),
            len,
            available: self.buffer.len(),
        };
        let start = self.base.checked_add(offset).ok_or_else(out_of_bounds)?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.buffer.len() {
            return Err(out_of_bounds());
        }
        Ok(&self.buffer[start..end])
    }

    /// Read a little-endian unsigned integer of `width` bytes (1..=8).
    pub fn read_uint(&self, width: usize, offset: usize) -> Result<u64, ExtfsError> {
        if width == 0 || width > 8 {
            return Err(ExtfsError::OutOfBounds {
                offset: self.base.saturating_add(offset),
                len: width,
                available: self.buffer.len(),
            });
        }
        Ok(LittleEndian::read_uint(self.slice(width, offset)?, width))
    }

    /// Borrow `count` raw bytes starting at `offset`.
    pub fn read_bytes(&self, count: usize, offset: usize) -> Result<&[u8], ExtfsError> {
        self.slice(count, offset)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ExtfsError> {
        Ok(self.slice(1, offset)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, ExtfsError> {
        Ok(LittleEndian::read_u16(self.slice(2, offset)?))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, ExtfsError> {
        Ok(LittleEndian::read_u32(self.slice(4, offset)?))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, ExtfsError> {
        Ok(LittleEndian::read_u64(self.slice(8, offset)?))
    }

    /// Decode a fixed-layout record starting at `offset`.
    pub fn decode_record<T: Record>(&self, offset: usize) -> Result<T, ExtfsError> {
        T::decode_bytes(self.slice(T::SIZE, offset)?)
    }

    /// Give up the view and keep the addressable bytes, copying only if borrowed.
    pub fn into_vec(self) -> Vec<u8> {
        let mut buffer = self.buffer.into_owned();
        let base = self.base.min(buffer.len());
        buffer.drain(..base);
        buffer
    }

    /// A view of the same buffer starting `offset` bytes further in.
    pub fn sub_reader(&self, offset: usize) -> Result<ByteReader<'_>, ExtfsError> {
        let base = self.base.checked_add(offset).ok_or(ExtfsError::OutOfBounds {
            offset: usize::MAX,
            len: 0,
            available: self.buffer.len(),
        })?;
        if base > self.buffer.len() {
            return Err(ExtfsError::OutOfBounds {
                offset: base,
                len: 0,
                available: self.buffer.len(),
            });
        }
        Ok(ByteReader {
            buffer: Cow::Borrowed(&*self.buffer),
            base,
        })
    }
}
