//! Template array location.
//!
//! The start of the template array is not stored anywhere in the asset. It
//! is found by scanning forward from the end of the visual array for a
//! plausible count followed by the all-zero 12-byte type descriptor.
//!
//! The signature is a structural coincidence, not a unique marker. A visual
//! record whose trailing bytes happen to look like `[1, 99]` + 12 zeros would
//! be accepted; callers that need certainty should check the result (for
//! example with `cross_check` against the host's field view).

use tracing::debug;

use crate::error::HeaderError;

/// Largest count accepted by the signature (exclusive).
const MAX_SIGNATURE_COUNT: i32 = 100;

/// Length of the zeroed template type descriptor.
const ZERO_DESCRIPTOR_LEN: usize = 12;

/// Outcome of a template array search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySearch {
    /// Signature found; `offset` is the position of the count field.
    Found { offset: usize, count: i32 },
    /// No signature within the window.
    NotFound { search_start: usize, window: usize },
}

impl ArraySearch {
    /// Offset of the located array, if any.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Found { offset, .. } => Some(*offset),
            Self::NotFound { .. } => None,
        }
    }

    /// Convert into a result, mapping `NotFound` to
    /// [`HeaderError::TemplateArrayNotFound`].
    pub fn into_result(self) -> Result<usize, HeaderError> {
        match self {
            Self::Found { offset, .. } => Ok(offset),
            Self::NotFound {
                search_start,
                window,
            } => Err(HeaderError::TemplateArrayNotFound {
                search_start,
                window,
            }),
        }
    }
}

/// Scan for the template array signature.
///
/// Candidates are checked at `start`, `start + 4`, ... while the candidate
/// is inside the window and 16 bytes fit in the buffer.
#[must_use]
pub fn find_template_array(data: &[u8], start: usize, window: usize) -> ArraySearch {
    let limit = start.saturating_add(window);
    let mut pos = start;
    while pos < limit && pos + 4 + ZERO_DESCRIPTOR_LEN <= data.len() {
        let count = i32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        if count > 0
            && count < MAX_SIGNATURE_COUNT
            && data[pos + 4..pos + 4 + ZERO_DESCRIPTOR_LEN]
                .iter()
                .all(|&b| b == 0)
        {
            debug!(offset = pos, count, skipped = pos - start, "located template array");
            return ArraySearch::Found { offset: pos, count };
        }
        pos += 4;
    }

    debug!(search_start = start, window, "template array signature not found");
    ArraySearch::NotFound {
        search_start: start,
        window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(count: i32) -> Vec<u8> {
        let mut out = count.to_le_bytes().to_vec();
        out.extend([0u8; 12]);
        out
    }

    #[test]
    fn test_found_at_start() {
        let mut data = signature(3);
        data.extend([9; 8]);
        assert_eq!(
            find_template_array(&data, 0, 1000),
            ArraySearch::Found {
                offset: 0,
                count: 3
            }
        );
    }

    #[test]
    fn test_skips_in_four_byte_steps() {
        let mut data = vec![0xee; 8];
        data.extend(signature(1));
        assert_eq!(find_template_array(&data, 0, 1000).offset(), Some(8));

        // Unaligned signatures are not seen.
        let mut data = vec![0xee; 6];
        data.extend(signature(1));
        data.extend([0xee; 2]);
        assert_eq!(find_template_array(&data, 0, 1000).offset(), None);
    }

    #[test]
    fn test_count_bounds() {
        for count in [0, 100, -1] {
            let data = signature(count);
            assert!(
                find_template_array(&data, 0, 1000).offset().is_none(),
                "count {count}"
            );
        }
        assert_eq!(find_template_array(&signature(99), 0, 1000).offset(), Some(0));
    }

    #[test]
    fn test_window_bounds_search() {
        let mut data = vec![0xee; 32];
        data.extend(signature(2));
        assert_eq!(find_template_array(&data, 0, 32).offset(), None);
        assert_eq!(find_template_array(&data, 0, 33).offset(), Some(32));
    }

    #[test]
    fn test_not_found_error() {
        let err = find_template_array(&[0xee; 64], 8, 100)
            .into_result()
            .unwrap_err();
        assert_eq!(
            err,
            HeaderError::TemplateArrayNotFound {
                search_start: 8,
                window: 100
            }
        );
    }

    #[test]
    fn test_short_tail_is_not_read() {
        // Count matches but only 11 zero bytes remain.
        let mut data = 5i32.to_le_bytes().to_vec();
        data.extend([0u8; 11]);
        assert_eq!(find_template_array(&data, 0, 1000).offset(), None);
    }
}
