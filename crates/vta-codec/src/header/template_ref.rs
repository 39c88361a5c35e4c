//! Template reference block.
//!
//! The block starts with an `i32` count. Each reference is laid out as:
//!
//! | Field | Size | Notes |
//! |-------|------|-------|
//! | name length | 4 | byte length, no terminator counted |
//! | name | `align4(len)` | terminator and padding only when `len % 4 != 0` |
//! | separator | 4 | always `20 00 00 00` |
//! | guid | 36 | 32 ASCII bytes, terminator, 3 bytes padding |
//! | padding | 1..=12 | brings the reference to a multiple of 12 |

use tracing::{trace, warn};

use crate::cursor::{ByteReader, align4, put_i32, put_u32, put_zeros};
use crate::error::{DecodeError, HeaderError};
use crate::options::{ParseOptions, SanityLimits};

/// Length of a template guid in bytes.
pub const GUID_LEN: usize = 32;

/// Separator written between a template name and its guid.
pub const GUID_SEPARATOR: u32 = 0x20;

/// Bytes occupied by the guid, its terminator and alignment.
const GUID_FIELD_LEN: usize = align4(GUID_LEN + 1);

/// A reusable document included by the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemplateReference {
    /// Template name as written in the source document.
    pub name: String,
    /// 32-character ASCII guid.
    pub guid: String,
}

impl TemplateReference {
    /// Create a template reference, validating the guid.
    pub fn new(name: impl Into<String>, guid: impl Into<String>) -> Result<Self, HeaderError> {
        let reference = Self {
            name: name.into(),
            guid: guid.into(),
        };
        reference.validate()?;
        Ok(reference)
    }

    /// Check that the guid is exactly 32 ASCII bytes.
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.guid.len() != GUID_LEN || !self.guid.is_ascii() {
            return Err(HeaderError::guid_length(self.guid.clone()));
        }
        Ok(())
    }

    /// Decode the guid as 16 raw bytes, if it is valid hex.
    #[must_use]
    pub fn guid_bytes(&self) -> Option<[u8; 16]> {
        let mut out = [0u8; 16];
        hex::decode_to_slice(&self.guid, &mut out).ok()?;
        Some(out)
    }

    /// Size of the reference before the 12-byte padding.
    fn unpadded_len(&self) -> usize {
        4 + align4(self.name.len()) + 4 + GUID_FIELD_LEN
    }

    /// Encoded size of this reference, including its 12-byte padding.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let size = self.unpadded_len();
        size + twelve_byte_padding(size)
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let name = self.name.as_bytes();
        put_i32(out, name.len() as i32);
        out.extend_from_slice(name);
        put_zeros(out, align4(name.len()) - name.len());
        put_u32(out, GUID_SEPARATOR);
        out.extend_from_slice(self.guid.as_bytes());
        put_zeros(out, GUID_FIELD_LEN - GUID_LEN);
        put_zeros(out, twelve_byte_padding(self.unpadded_len()));
    }
}

/// Padding applied after a reference. Always at least one byte.
const fn twelve_byte_padding(size: usize) -> usize {
    12 - size % 12
}

/// Parse the template reference block starting at `start`.
///
/// Returns the references and the offset just past the block.
pub fn parse_template_references(
    data: &[u8],
    start: usize,
    options: &ParseOptions,
) -> Result<(Vec<TemplateReference>, usize), HeaderError> {
    let mut reader = ByteReader::at(data, start);
    let count = reader.read_i32()?;
    if count < 0 {
        return Err(DecodeError::implausible("template reference count", start, count).into());
    }

    // The count is untrusted; let the vector grow as references decode.
    let mut refs = Vec::new();
    for _ in 0..count {
        refs.push(read_reference(&mut reader, options)?);
    }

    trace!(count, end = reader.position(), "parsed template references");
    Ok((refs, reader.position()))
}

fn read_reference(
    reader: &mut ByteReader<'_>,
    options: &ParseOptions,
) -> Result<TemplateReference, HeaderError> {
    let entry_start = reader.position();

    let name_len = reader.read_i32()?;
    if name_len < 0 || name_len as u32 > options.limits.max_string_len {
        return Err(DecodeError::implausible("template name length", entry_start, name_len).into());
    }
    let name_len = name_len as usize;
    let name_bytes = reader.read_bytes(name_len)?;
    let name = String::from_utf8(name_bytes.to_vec())
        .map_err(|_| DecodeError::InvalidString { offset: entry_start + 4 })?;
    reader.skip_zeros(align4(name_len) - name_len, options.strict)?;

    let separator_offset = reader.position();
    let separator = reader.read_u32()?;
    if separator != GUID_SEPARATOR {
        if options.strict {
            return Err(HeaderError::UnexpectedSeparator {
                offset: separator_offset,
                found: separator,
            });
        }
        warn!(
            offset = separator_offset,
            found = separator,
            "unexpected template reference separator"
        );
    }

    let guid_offset = reader.position();
    let guid_bytes = reader.read_bytes(GUID_LEN)?;
    if !guid_bytes.is_ascii() {
        return Err(DecodeError::InvalidString { offset: guid_offset }.into());
    }
    let guid = String::from_utf8(guid_bytes.to_vec())
        .map_err(|_| DecodeError::InvalidString { offset: guid_offset })?;
    reader.skip_zeros(GUID_FIELD_LEN - GUID_LEN, options.strict)?;

    let size = reader.position() - entry_start;
    reader.skip_zeros(twelve_byte_padding(size), options.strict)?;

    Ok(TemplateReference { name, guid })
}

/// Encode a template reference block.
///
/// Fails if any guid is not exactly 32 ASCII bytes, or if a name is longer
/// than the default [`SanityLimits`] allow. Error offsets are relative to the
/// block.
pub fn serialize_template_references(refs: &[TemplateReference]) -> Result<Vec<u8>, HeaderError> {
    encode_template_references(refs, 0, &SanityLimits::default())
}

/// Encode a template reference block that will be placed at `base`.
pub(crate) fn encode_template_references(
    refs: &[TemplateReference],
    base: usize,
    limits: &SanityLimits,
) -> Result<Vec<u8>, HeaderError> {
    let len = 4 + refs.iter().map(TemplateReference::encoded_len).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    put_i32(&mut out, refs.len() as i32);
    for reference in refs {
        reference.validate()?;
        if reference.name.len() > limits.max_string_len as usize {
            return Err(DecodeError::implausible(
                "template name length",
                base + out.len(),
                reference.name.len() as i64,
            )
            .into());
        }
        reference.encode_into(&mut out);
    }
    Ok(out)
}
