//! Container header parsing and building.
//!
//! This module handles the parts of a VTA buffer outside the element records:
//! - The fixed 72-byte header (opaque, copied verbatim)
//! - The template reference block that follows it
//! - Locating the template array, whose offset is not stored

pub mod locate;
pub mod template_ref;

pub use locate::{ArraySearch, find_template_array};
pub use template_ref::{
    GUID_LEN, GUID_SEPARATOR, TemplateReference, parse_template_references,
    serialize_template_references,
};

use crate::cursor::ByteReader;
use crate::error::DecodeError;

/// Length of the fixed header.
pub const HEADER_LEN: usize = 72;

/// Offset of the template reference block.
pub const TEMPLATE_REFS_OFFSET: usize = HEADER_LEN;

/// Copy the fixed header out of a buffer.
pub fn read_fixed_header(data: &[u8]) -> Result<[u8; HEADER_LEN], DecodeError> {
    ByteReader::at(data, 0).read_array::<HEADER_LEN>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_fixed_header() {
        let data: Vec<u8> = (0..80).collect();
        let header = read_fixed_header(&data).unwrap();
        assert_eq!(header[0], 0);
        assert_eq!(header[71], 71);
    }

    #[test]
    fn test_short_header() {
        let err = read_fixed_header(&[0u8; 40]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 0,
                needed: 72,
                available: 40
            }
        );
    }
}
