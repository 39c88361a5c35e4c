//! Element record decoding and encoding.
//!
//! An element record describes one node of the UI tree (or one template
//! asset). Records are variable-length and stored back to back.
//!
//! # Record Structure
//!
//! | Offset | Field              | Type            | Notes                           |
//! |--------|--------------------|-----------------|---------------------------------|
//! | 0      | id                 | i32             | Unique within the asset         |
//! | 4      | order_in_document  | i32             | Sibling position                |
//! | 8      | parent_id          | i32             | 0 = root                        |
//! | 12     | rule_index         | u32             | `0xFFFFFFFF` = no rule (-1)     |
//! | 16     | opaque_a           | 20 bytes        | Preserved verbatim              |
//! | 36     | classes            | string array    | Padded entries                  |
//! | ..     | stylesheet_paths   | string array    | Padded entries                  |
//! | ..     | opaque_b           | 16 bytes        | Preserved verbatim              |
//! | ..     | type_name          | string          | Padded                          |
//! | ..     | name               | string          | Unpadded, ends the record       |

mod strings;

pub use strings::{
    encode_string_array, padded_string_len, string_array_len, terminal_string_len,
};

use tracing::trace;

use crate::cursor::{ByteReader, put_i32, put_u32};
use crate::error::DecodeError;
use crate::options::{ParseOptions, SanityLimits};

use strings::{
    check_string, check_string_array, read_string, read_string_array, write_string,
    write_string_array,
};

/// Length of the first opaque region.
pub const OPAQUE_A_LEN: usize = 20;

/// Length of the second opaque region.
pub const OPAQUE_B_LEN: usize = 16;

/// Offset of the `classes` array from the start of a record.
pub const CLASSES_OFFSET: usize = 16 + OPAQUE_A_LEN;

/// `rule_index` value meaning "no style rule".
pub const NO_RULE: i32 = -1;

/// On-disk encoding of [`NO_RULE`].
pub const RULE_SENTINEL: u32 = 0xFFFF_FFFF;

/// Byte range of a record inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    /// Absolute offset of the record's first byte.
    pub offset: usize,
    /// Encoded length in bytes.
    pub len: usize,
}

impl RecordSpan {
    /// Offset one past the record's last byte.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// The two string arrays carried by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StringArrayField {
    /// Style class list.
    Classes,
    /// Stylesheet asset paths.
    StylesheetPaths,
}

impl StringArrayField {
    fn count_label(self) -> &'static str {
        match self {
            Self::Classes => "classes count",
            Self::StylesheetPaths => "stylesheet paths count",
        }
    }

    fn entry_label(self) -> &'static str {
        match self {
            Self::Classes => "class length",
            Self::StylesheetPaths => "stylesheet path length",
        }
    }
}

impl std::fmt::Display for StringArrayField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classes => write!(f, "classes"),
            Self::StylesheetPaths => write!(f, "stylesheet paths"),
        }
    }
}

/// One decoded element record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementRecord {
    /// Identity of the record, used to target patches.
    pub id: i32,
    /// Position among siblings.
    pub order_in_document: i32,
    /// Containing element id, or 0 for a root.
    pub parent_id: i32,
    /// Style rule index, [`NO_RULE`] when unset.
    pub rule_index: i32,
    pub opaque_a: [u8; OPAQUE_A_LEN],
    /// Style classes, order preserved, duplicates allowed.
    pub classes: Vec<String>,
    /// Stylesheet paths, encoded like `classes`.
    pub stylesheet_paths: Vec<String>,
    pub opaque_b: [u8; OPAQUE_B_LEN],
    /// Element kind.
    pub type_name: String,
    /// User-visible name.
    pub name: String,
}

impl ElementRecord {
    /// Create a root record with no rule, no classes and zeroed opaque regions.
    pub fn new(id: i32, type_name: impl Into<String>) -> Self {
        Self {
            id,
            order_in_document: 0,
            parent_id: 0,
            rule_index: NO_RULE,
            opaque_a: [0; OPAQUE_A_LEN],
            classes: Vec::new(),
            stylesheet_paths: Vec::new(),
            opaque_b: [0; OPAQUE_B_LEN],
            type_name: type_name.into(),
            name: String::new(),
        }
    }

    /// Set the sibling position.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order_in_document = order;
        self
    }

    /// Set the parent id.
    #[must_use]
    pub fn with_parent(mut self, parent_id: i32) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the style rule index.
    #[must_use]
    pub fn with_rule_index(mut self, rule_index: i32) -> Self {
        self.rule_index = rule_index;
        self
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the class list.
    #[must_use]
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stylesheet paths.
    #[must_use]
    pub fn with_stylesheet_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stylesheet_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the first opaque region.
    #[must_use]
    pub fn with_opaque_a(mut self, bytes: [u8; OPAQUE_A_LEN]) -> Self {
        self.opaque_a = bytes;
        self
    }

    /// Set the second opaque region.
    #[must_use]
    pub fn with_opaque_b(mut self, bytes: [u8; OPAQUE_B_LEN]) -> Self {
        self.opaque_b = bytes;
        self
    }

    /// Whether the record references a style rule.
    #[must_use]
    pub fn has_rule(&self) -> bool {
        self.rule_index != NO_RULE
    }

    /// Borrow one of the string arrays.
    #[must_use]
    pub fn string_array(&self, field: StringArrayField) -> &[String] {
        match field {
            StringArrayField::Classes => &self.classes,
            StringArrayField::StylesheetPaths => &self.stylesheet_paths,
        }
    }

    /// Mutably borrow one of the string arrays.
    pub fn string_array_mut(&mut self, field: StringArrayField) -> &mut Vec<String> {
        match field {
            StringArrayField::Classes => &mut self.classes,
            StringArrayField::StylesheetPaths => &mut self.stylesheet_paths,
        }
    }

    /// Decode a record starting at `offset`.
    ///
    /// Returns the record and the number of bytes it occupies.
    pub fn decode(
        data: &[u8],
        offset: usize,
        options: &ParseOptions,
    ) -> Result<(Self, usize), DecodeError> {
        let mut reader = ByteReader::at(data, offset);

        let id = reader.read_i32()?;
        let order_in_document = reader.read_i32()?;
        let parent_id = reader.read_i32()?;
        let rule_index = match reader.read_u32()? {
            RULE_SENTINEL => NO_RULE,
            raw => raw as i32,
        };
        let opaque_a = reader.read_array::<OPAQUE_A_LEN>()?;

        let classes = read_field_array(&mut reader, StringArrayField::Classes, options)?;
        let stylesheet_paths =
            read_field_array(&mut reader, StringArrayField::StylesheetPaths, options)?;

        let opaque_b = reader.read_array::<OPAQUE_B_LEN>()?;
        let type_name = read_string(&mut reader, "type name length", true, options)?;
        let name = read_string(&mut reader, "name length", false, options)?;

        let len = reader.position() - offset;
        trace!(id, offset, len, type_name = %type_name, "decoded record");

        Ok((
            Self {
                id,
                order_in_document,
                parent_id,
                rule_index,
                opaque_a,
                classes,
                stylesheet_paths,
                opaque_b,
                type_name,
                name,
            },
            len,
        ))
    }

    /// Check that every count and length stays within `limits`, so the
    /// encoded record decodes again under the same limits.
    pub fn validate(&self, limits: &SanityLimits) -> Result<(), DecodeError> {
        self.validate_at(0, limits)
    }

    /// Like [`validate`](Self::validate), with error offsets relative to a
    /// record written at `offset`.
    pub(crate) fn validate_at(&self, offset: usize, limits: &SanityLimits) -> Result<(), DecodeError> {
        let mut pos = offset + CLASSES_OFFSET;
        check_field_array(&self.classes, StringArrayField::Classes, pos, limits)?;
        pos += string_array_len(&self.classes);
        check_field_array(
            &self.stylesheet_paths,
            StringArrayField::StylesheetPaths,
            pos,
            limits,
        )?;
        pos += string_array_len(&self.stylesheet_paths) + OPAQUE_B_LEN;
        check_string(&self.type_name, "type name length", pos, limits)?;
        pos += padded_string_len(self.type_name.len());
        check_string(&self.name, "name length", pos, limits)
    }

    /// Encoded size in bytes, without materializing the bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        CLASSES_OFFSET
            + string_array_len(&self.classes)
            + string_array_len(&self.stylesheet_paths)
            + OPAQUE_B_LEN
            + padded_string_len(self.type_name.len())
            + terminal_string_len(self.name.len())
    }

    /// Encode the record.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Append the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        put_i32(out, self.id);
        put_i32(out, self.order_in_document);
        put_i32(out, self.parent_id);
        if self.rule_index == NO_RULE {
            put_u32(out, RULE_SENTINEL);
        } else {
            put_i32(out, self.rule_index);
        }
        out.extend_from_slice(&self.opaque_a);
        write_string_array(out, &self.classes);
        write_string_array(out, &self.stylesheet_paths);
        out.extend_from_slice(&self.opaque_b);
        write_string(out, &self.type_name, true);
        write_string(out, &self.name, false);
    }
}

/// Read one of the record's string arrays at the reader's position.
pub(crate) fn read_field_array(
    reader: &mut ByteReader<'_>,
    field: StringArrayField,
    options: &ParseOptions,
) -> Result<Vec<String>, DecodeError> {
    read_string_array(reader, field.count_label(), field.entry_label(), options)
}

/// Check one of the record's string arrays before it is written at `offset`.
pub(crate) fn check_field_array(
    items: &[String],
    field: StringArrayField,
    offset: usize,
    limits: &SanityLimits,
) -> Result<(), DecodeError> {
    check_string_array(items, field.count_label(), field.entry_label(), offset, limits)
}
