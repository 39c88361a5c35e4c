//! Length-prefixed string encoding used inside element records.
//!
//! Every string is `i32 byte_len`, the UTF-8 bytes and one zero terminator.
//! All strings except the record's final `name` are then zero-padded to a
//! multiple of 4. Padded strings always start 4-aligned relative to their
//! record, so their encoded size depends only on the byte length.

use crate::cursor::{ByteReader, align4, put_i32, put_zeros};
use crate::error::DecodeError;
use crate::options::{ParseOptions, SanityLimits};

/// Encoded size of a padded string with `byte_len` bytes of text.
#[must_use]
pub const fn padded_string_len(byte_len: usize) -> usize {
    align4(4 + byte_len + 1)
}

/// Encoded size of the unpadded terminal string.
#[must_use]
pub const fn terminal_string_len(byte_len: usize) -> usize {
    4 + byte_len + 1
}

/// Encoded size of a string array (count + padded entries).
#[must_use]
pub fn string_array_len(items: &[String]) -> usize {
    4 + items
        .iter()
        .map(|item| padded_string_len(item.len()))
        .sum::<usize>()
}

/// Encode a string array on its own, as it appears inside a record.
#[must_use]
pub fn encode_string_array(items: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(string_array_len(items));
    write_string_array(&mut out, items);
    out
}

pub(crate) fn write_string(out: &mut Vec<u8>, value: &str, padded: bool) {
    put_i32(out, value.len() as i32);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    if padded {
        put_zeros(out, padded_string_len(value.len()) - terminal_string_len(value.len()));
    }
}

pub(crate) fn write_string_array(out: &mut Vec<u8>, items: &[String]) {
    put_i32(out, items.len() as i32);
    for item in items {
        write_string(out, item, true);
    }
}

/// Check a string that will be written at `offset` against `limits`.
pub(crate) fn check_string(
    value: &str,
    field: &'static str,
    offset: usize,
    limits: &SanityLimits,
) -> Result<(), DecodeError> {
    if value.len() > limits.max_string_len as usize {
        return Err(DecodeError::implausible(field, offset, value.len() as i64));
    }
    Ok(())
}

/// Check a string array that will be written at `offset` against `limits`.
///
/// Reports the same field and offset that decoding the written bytes would.
pub(crate) fn check_string_array(
    items: &[String],
    count_field: &'static str,
    entry_field: &'static str,
    offset: usize,
    limits: &SanityLimits,
) -> Result<(), DecodeError> {
    if items.len() > limits.max_array_len as usize {
        return Err(DecodeError::implausible(count_field, offset, items.len() as i64));
    }
    let mut pos = offset + 4;
    for item in items {
        check_string(item, entry_field, pos, limits)?;
        pos += padded_string_len(item.len());
    }
    Ok(())
}

pub(crate) fn read_string(
    reader: &mut ByteReader<'_>,
    field: &'static str,
    padded: bool,
    options: &ParseOptions,
) -> Result<String, DecodeError> {
    let offset = reader.position();
    let len = reader.read_i32()?;
    if len < 0 || len as u32 > options.limits.max_string_len {
        return Err(DecodeError::implausible(field, offset, len));
    }
    let len = len as usize;
    let bytes = reader.read_bytes(len)?;
    let tail = if padded {
        padded_string_len(len) - 4 - len
    } else {
        1
    };
    reader.skip_zeros(tail, options.strict)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidString { offset: offset + 4 })
}

pub(crate) fn read_string_array(
    reader: &mut ByteReader<'_>,
    count_field: &'static str,
    entry_field: &'static str,
    options: &ParseOptions,
) -> Result<Vec<String>, DecodeError> {
    let offset = reader.position();
    let count = reader.read_i32()?;
    if count < 0 || count as u32 > options.limits.max_array_len {
        return Err(DecodeError::implausible(count_field, offset, count));
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(read_string(reader, entry_field, true, options)?);
    }
    Ok(items)
}
