//! Bounds-checked little-endian field access over in-memory images
//!
//! Both images are held as plain byte buffers. Every header field is read
//! through [`ImageBytes`] so that a truncated or corrupted file surfaces as
//! `None` (and from there as a parse error) instead of a panic.

use byteorder::{ByteOrder, LittleEndian};

/// Little-endian accessors for a byte buffer.
pub(crate) trait ImageBytes {
    /// Returns `len` bytes starting at `offset`, or `None` if any of them lie
    /// outside the buffer.
    fn bytes_at(&self, offset: usize, len: usize) -> Option<&[u8]>;

    #[inline]
    fn u16_at(&self, offset: usize) -> Option<u16> {
        self.bytes_at(offset, 2).map(LittleEndian::read_u16)
    }

    #[inline]
    fn u32_at(&self, offset: usize) -> Option<u32> {
        self.bytes_at(offset, 4).map(LittleEndian::read_u32)
    }

    #[inline]
    fn u64_at(&self, offset: usize) -> Option<u64> {
        self.bytes_at(offset, 8).map(LittleEndian::read_u64)
    }

    /// Reads the NUL-terminated byte string starting at `offset`, without the
    /// terminator.
    fn cstr_at(&self, offset: usize) -> Option<&[u8]>;
}

impl ImageBytes for [u8] {
    #[inline]
    fn bytes_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }

    fn cstr_at(&self, offset: usize) -> Option<&[u8]> {
        let tail = self.get(offset..)?;
        let len = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..len])
    }
}

/// Writers used by the PE patcher. The caller has already validated the
/// offsets against the header view, so these index directly.
pub(crate) trait ImageBytesMut {
    fn put_u16(&mut self, offset: usize, value: u16);
    fn put_u32(&mut self, offset: usize, value: u32);
}

impl ImageBytesMut for [u8] {
    #[inline]
    fn put_u16(&mut self, offset: usize, value: u16) {
        LittleEndian::write_u16(&mut self[offset..offset + 2], value);
    }

    #[inline]
    fn put_u32(&mut self, offset: usize, value: u32) {
        LittleEndian::write_u32(&mut self[offset..offset + 4], value);
    }
}

/// Converts a 64-bit file quantity into a buffer index.
#[inline]
pub(crate) fn to_usize(value: u64) -> Option<usize> {
    usize::try_from(value).ok()
}
