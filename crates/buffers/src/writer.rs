//! Binary buffer writer with auto-growing capacity.

use crate::zigzag_encode;

/// Appends encoded values to a growable byte buffer.
///
/// Multi-byte integers are written as LEB128 varints, floats as
/// little-endian IEEE 754.
///
/// # Example
///
/// ```
/// use ydoc_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.vu64(300);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0xac, 0x02]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::with_alloc_size(64)
    }

    /// Creates a writer with `alloc_size` bytes reserved up front.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(alloc_size),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Takes the written bytes, leaving the writer empty.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.uint8)
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    /// Writes a boolean as a single `0`/`1` byte.
    #[inline]
    pub fn bool(&mut self, val: bool) {
        self.uint8.push(val as u8);
    }

    /// Writes an unsigned LEB128 varint.
    pub fn vu64(&mut self, mut val: u64) {
        while val >= 0x80 {
            self.uint8.push((val as u8 & 0x7f) | 0x80);
            val >>= 7;
        }
        self.uint8.push(val as u8);
    }

    /// Writes a signed integer as a zig-zag LEB128 varint.
    #[inline]
    pub fn vi64(&mut self, val: i64) {
        self.vu64(zigzag_encode(val));
    }

    /// Writes a 64-bit floating point number (little-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_le_bytes());
    }

    /// Writes raw bytes.
    #[inline]
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes a varint byte length followed by the UTF-8 bytes of `s`.
    ///
    /// Returns the number of payload bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.vu64(s.len() as u64);
        self.buf(s.as_bytes());
        s.len()
    }
}
