//! Error types for VTA decoding, building and patching.
//!
//! Each layer has its own error enum:
//! - [`DecodeError`]: low-level byte reads and record decoding
//! - [`HeaderError`]: container header, template references, array location
//! - [`PatchError`]: in-place patches, reordering and string array splices
//!
//! [`VtaError`] combines them for callers that do not care which layer failed.

use thiserror::Error;

use crate::array::ArrayKind;

/// Errors raised while decoding bytes into records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A field extends past the end of the buffer.
    #[error("truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A count or length is outside the configured sanity bounds.
    #[error("implausible {field} at offset {offset}: {value}")]
    ImplausibleLength {
        field: &'static str,
        offset: usize,
        value: i64,
    },

    /// String bytes are not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidString { offset: usize },

    /// A terminator or padding byte is non-zero (strict mode only).
    #[error("non-zero padding byte at offset {offset}")]
    NonZeroPadding { offset: usize },
}

impl DecodeError {
    /// Create an ImplausibleLength error.
    pub fn implausible(field: &'static str, offset: usize, value: impl Into<i64>) -> Self {
        Self::ImplausibleLength {
            field,
            offset,
            value: value.into(),
        }
    }
}

/// Errors raised while parsing or serializing the container structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Byte-level failure outside of any element record.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The template array signature was not found within the scan window.
    #[error("template array not found within {window} bytes of offset {search_start}")]
    TemplateArrayNotFound { search_start: usize, window: usize },

    /// A template reference guid is not exactly 32 ASCII bytes.
    #[error("template guid must be 32 ASCII bytes, got {len}: {guid:?}")]
    GuidLengthInvariant { guid: String, len: usize },

    /// The separator before a template guid is not `20 00 00 00` (strict mode only).
    #[error("unexpected template reference separator {found:#010x} at offset {offset}")]
    UnexpectedSeparator { offset: usize, found: u32 },

    /// An array's type descriptor has the wrong length for its kind.
    #[error("{array} type descriptor must be {expected} bytes, got {actual}")]
    DescriptorLength {
        array: ArrayKind,
        expected: usize,
        actual: usize,
    },

    /// A record inside one of the element arrays failed to decode.
    #[error("{array} record {index} at offset {offset}: {source}")]
    Record {
        array: ArrayKind,
        index: usize,
        offset: usize,
        #[source]
        source: DecodeError,
    },
}

impl HeaderError {
    /// Create a GuidLengthInvariant error.
    pub fn guid_length(guid: impl Into<String>) -> Self {
        let guid = guid.into();
        Self::GuidLengthInvariant {
            len: guid.len(),
            guid,
        }
    }
}

/// Errors raised by the patchers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// No record with this id could be located.
    #[error("record {id} not found")]
    RecordNotFound { id: i32 },

    /// The replacement encodes to a different length than the original span.
    #[error(
        "record {id} size changed: original={original}, new={new}; \
         in-place patching requires same-size records, rebuild the asset instead"
    )]
    SizeChanged { id: i32, original: usize, new: usize },

    /// The buffer structure could not be parsed.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// A located record or string array failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Combined error type for VTA operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VtaError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Result type for VTA operations.
pub type Result<T> = std::result::Result<T, VtaError>;
