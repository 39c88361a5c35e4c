//! Element array blocks.
//!
//! An element array is `i32 count`, an opaque type descriptor, then `count`
//! records back to back. Records carry their own padding, so nothing is
//! inserted between them.

use std::fmt;

use tracing::{debug, trace};

use crate::cursor::{ByteReader, put_i32};
use crate::error::{DecodeError, HeaderError};
use crate::options::{ParseOptions, SanityLimits};
use crate::record::{ElementRecord, RecordSpan};

/// Which of the two element arrays a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ArrayKind {
    /// Visual elements of the document tree.
    Visual,
    /// Template asset instances.
    Template,
}

impl ArrayKind {
    /// Both kinds, in buffer order.
    pub const ALL: [ArrayKind; 2] = [ArrayKind::Visual, ArrayKind::Template];

    /// Length of this array's type descriptor.
    #[must_use]
    pub const fn descriptor_len(self) -> usize {
        match self {
            Self::Visual => 40,
            Self::Template => 12,
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visual => write!(f, "visual"),
            Self::Template => write!(f, "template"),
        }
    }
}

/// One element array with its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementArray {
    pub kind: ArrayKind,
    /// Opaque descriptor copied from the source asset.
    pub type_descriptor: Vec<u8>,
    pub records: Vec<ElementRecord>,
}

impl ElementArray {
    /// Create an empty array with the given descriptor.
    pub fn new(kind: ArrayKind, type_descriptor: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            type_descriptor: type_descriptor.into(),
            records: Vec::new(),
        }
    }

    /// Add records.
    #[must_use]
    pub fn with_records(mut self, records: Vec<ElementRecord>) -> Self {
        self.records = records;
        self
    }

    /// Encoded size of the block.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 + self.type_descriptor.len()
            + self
                .records
                .iter()
                .map(ElementRecord::encoded_len)
                .sum::<usize>()
    }

    /// Check the descriptor length against the array kind.
    pub fn validate(&self) -> Result<(), HeaderError> {
        let expected = self.kind.descriptor_len();
        if self.type_descriptor.len() != expected {
            return Err(HeaderError::DescriptorLength {
                array: self.kind,
                expected,
                actual: self.type_descriptor.len(),
            });
        }
        Ok(())
    }

    /// Append the encoded block to `out`, checking records against the
    /// default [`SanityLimits`].
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), HeaderError> {
        self.encode_into_with_limits(out, &SanityLimits::default())
    }

    /// Append the encoded block to `out`.
    ///
    /// Fails without writing anything if the descriptor has the wrong length
    /// or a record would not decode again under `limits`. Record errors carry
    /// the offsets the record would have had in `out`.
    pub fn encode_into_with_limits(
        &self,
        out: &mut Vec<u8>,
        limits: &SanityLimits,
    ) -> Result<(), HeaderError> {
        self.validate()?;
        let mut offset = out.len() + 4 + self.type_descriptor.len();
        for (index, record) in self.records.iter().enumerate() {
            record
                .validate_at(offset, limits)
                .map_err(|source| HeaderError::Record {
                    array: self.kind,
                    index,
                    offset,
                    source,
                })?;
            offset += record.encoded_len();
        }
        out.extend(serialize_array(&self.records, &self.type_descriptor));
        Ok(())
    }
}

/// Offsets observed while decoding one array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLayout {
    /// Offset of the count field.
    pub offset: usize,
    /// Span of every record, in order.
    pub records: Vec<RecordSpan>,
    /// Offset just past the last record.
    pub end: usize,
}

/// Encode an array block: count, descriptor verbatim, records concatenated.
///
/// No limits are checked; [`ElementArray::encode_into`] does.
#[must_use]
pub fn serialize_array(records: &[ElementRecord], type_descriptor: &[u8]) -> Vec<u8> {
    let len = 4 + type_descriptor.len()
        + records
            .iter()
            .map(ElementRecord::encoded_len)
            .sum::<usize>();
    let mut out = Vec::with_capacity(len);
    put_i32(&mut out, records.len() as i32);
    out.extend_from_slice(type_descriptor);
    for record in records {
        record.encode_into(&mut out);
    }
    out
}

/// Records decoded before an array stopped decoding.
///
/// Records before the failure point are complete and usable; `error` holds
/// the failure, if any.
#[derive(Debug, Clone)]
pub struct PartialDecode {
    pub kind: ArrayKind,
    /// Count declared in the block, if it could be read.
    pub declared_count: Option<i32>,
    pub type_descriptor: Vec<u8>,
    pub records: Vec<ElementRecord>,
    pub spans: Vec<RecordSpan>,
    /// Offset just past the last decoded byte.
    pub end: usize,
    pub error: Option<HeaderError>,
}

impl PartialDecode {
    /// Whether every declared record decoded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Decode as much of an array block as possible.
pub fn decode_records_partial(
    data: &[u8],
    offset: usize,
    kind: ArrayKind,
    options: &ParseOptions,
) -> PartialDecode {
    let mut partial = PartialDecode {
        kind,
        declared_count: None,
        type_descriptor: Vec::new(),
        records: Vec::new(),
        spans: Vec::new(),
        end: offset,
        error: None,
    };

    let mut reader = ByteReader::at(data, offset);
    let count = match reader.read_i32() {
        Ok(count) => count,
        Err(err) => {
            partial.error = Some(err.into());
            return partial;
        }
    };
    partial.declared_count = Some(count);
    if count < 0 {
        partial.error = Some(DecodeError::implausible("element count", offset, count).into());
        return partial;
    }
    match reader.read_bytes(kind.descriptor_len()) {
        Ok(descriptor) => partial.type_descriptor = descriptor.to_vec(),
        Err(err) => {
            partial.error = Some(err.into());
            return partial;
        }
    }

    let mut pos = reader.position();
    partial.end = pos;
    for index in 0..count as usize {
        match ElementRecord::decode(data, pos, options) {
            Ok((record, len)) => {
                trace!(array = %kind, index, offset = pos, len, "decoded array record");
                partial.records.push(record);
                partial.spans.push(RecordSpan { offset: pos, len });
                pos += len;
                partial.end = pos;
            }
            Err(source) => {
                partial.error = Some(HeaderError::Record {
                    array: kind,
                    index,
                    offset: pos,
                    source,
                });
                break;
            }
        }
    }
    partial
}

/// Decode a complete array block starting at `offset`.
pub fn decode_array(
    data: &[u8],
    offset: usize,
    kind: ArrayKind,
    options: &ParseOptions,
) -> Result<(ElementArray, ArrayLayout), HeaderError> {
    let partial = decode_records_partial(data, offset, kind, options);
    if let Some(err) = partial.error {
        return Err(err);
    }
    debug!(
        array = %kind,
        offset,
        count = partial.records.len(),
        end = partial.end,
        "decoded element array"
    );
    Ok((
        ElementArray {
            kind,
            type_descriptor: partial.type_descriptor,
            records: partial.records,
        },
        ArrayLayout {
            offset,
            records: partial.spans,
            end: partial.end,
        },
    ))
}
