//! Binary buffer reader with cursor tracking.

use std::str;

use crate::{zigzag_decode, BufferError};

/// A bounds-checked reader over a byte slice.
///
/// Every read returns [`BufferError`] rather than panicking when the input
/// ends early, so decoders can reject truncated buffers cleanly.
///
/// # Example
///
/// ```
/// use ydoc_buffers::Reader;
///
/// let data = [0x01, 0xac, 0x02];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8().unwrap(), 0x01);
/// assert_eq!(reader.try_vu64().unwrap(), 300);
/// assert!(reader.try_u8().is_err());
/// ```
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.uint8.len().saturating_sub(self.x)
    }

    /// `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Checks that `n` more bytes are available from the current cursor.
    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        if n > self.size() {
            Err(BufferError::EndOfBuffer)
        } else {
            Ok(())
        }
    }

    /// Peeks at the current byte without advancing.
    pub fn try_peek(&self) -> Result<u8, BufferError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    /// Reads an unsigned LEB128 varint.
    pub fn try_vu64(&mut self) -> Result<u64, BufferError> {
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.try_u8()?;
            let part = (byte & 0x7f) as u64;
            if shift == 63 && part > 1 {
                return Err(BufferError::VarintOverflow);
            }
            result |= part << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(BufferError::VarintOverflow);
            }
        }
    }

    /// Reads a zig-zag encoded signed varint.
    #[inline]
    pub fn try_vi64(&mut self) -> Result<i64, BufferError> {
        self.try_vu64().map(zigzag_decode)
    }

    /// Reads a 64-bit little-endian float.
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        let bytes = self.try_buf(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(arr))
    }

    /// Reads `size` raw bytes and advances the cursor.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let x = self.x;
        let end = x + size;
        let bin = &self.uint8[x..end];
        self.x = end;
        Ok(bin)
    }

    /// Reads a varint length prefix followed by that many UTF-8 bytes.
    pub fn try_utf8(&mut self) -> Result<&'a str, BufferError> {
        let len = self.try_vu64()?;
        let len = usize::try_from(len).map_err(|_| BufferError::EndOfBuffer)?;
        let bytes = self.try_buf(len)?;
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }
}
