//! Bounds-checked little-endian reads and the matching write helpers.

use tracing::warn;

use crate::error::DecodeError;

/// Read cursor over a byte slice. All reads are little-endian.
#[derive(Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a cursor positioned at an absolute offset.
    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current byte position.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Read a slice of `n` bytes without copying.
    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let data = self.data;
        let start = self.pos;
        let slice = start
            .checked_add(n)
            .and_then(|end| data.get(start..end))
            .ok_or(DecodeError::Truncated {
                offset: start,
                needed: n,
                available: data.len().saturating_sub(start),
            })?;
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-size block.
    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Skip `n` bytes that the format expects to be zero.
    ///
    /// In strict mode a non-zero byte is an error; otherwise it is logged and
    /// dropped, since re-encoding always writes zeros.
    pub(crate) fn skip_zeros(&mut self, n: usize, strict: bool) -> Result<(), DecodeError> {
        let start = self.pos;
        let bytes = self.read_bytes(n)?;
        if let Some(idx) = bytes.iter().position(|&b| b != 0) {
            let offset = start + idx;
            if strict {
                return Err(DecodeError::NonZeroPadding { offset });
            }
            warn!(offset, "non-zero padding byte will not survive re-encoding");
        }
        Ok(())
    }
}

/// Round `len` up to the next multiple of 4.
pub(crate) const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Append a little-endian i32.
pub(crate) fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian u32.
pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append `n` zero bytes.
pub(crate) fn put_zeros(out: &mut Vec<u8>, n: usize) {
    out.resize(out.len() + n, 0);
}

/// Overwrite a little-endian i32 at `offset`.
///
/// The caller guarantees `offset + 4 <= buf.len()`.
pub(crate) fn write_i32_at(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let data = [0x01, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
        let mut reader = ByteReader::at(&data, 0);
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), u32::MAX);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_truncated_read() {
        let data = [0u8; 6];
        let mut reader = ByteReader::at(&data, 4);
        let err = reader.read_i32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 4,
                needed: 4,
                available: 2
            }
        );
        // A failed read does not advance.
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_read_past_end_offset() {
        let data = [0u8; 4];
        let mut reader = ByteReader::at(&data, 10);
        assert!(matches!(
            reader.read_bytes(1),
            Err(DecodeError::Truncated { available: 0, .. })
        ));
    }

    #[test]
    fn test_skip_zeros() {
        let data = [0, 0, 7, 0];
        assert!(ByteReader::at(&data, 0).skip_zeros(4, false).is_ok());
        assert_eq!(
            ByteReader::at(&data, 0).skip_zeros(4, true),
            Err(DecodeError::NonZeroPadding { offset: 2 })
        );
        assert!(ByteReader::at(&data, 0).skip_zeros(2, true).is_ok());
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(9), 12);
    }

    #[test]
    fn test_writers() {
        let mut out = Vec::new();
        put_i32(&mut out, -1);
        put_u32(&mut out, 0x20);
        put_zeros(&mut out, 2);
        assert_eq!(out, [0xff, 0xff, 0xff, 0xff, 0x20, 0, 0, 0, 0, 0]);

        write_i32_at(&mut out, 4, 7);
        assert_eq!(&out[4..8], &[7, 0, 0, 0]);
    }
}
