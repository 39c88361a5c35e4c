//! Replacing a record's string array inside a larger buffer.
//!
//! Unlike [`patch`](crate::patch), these operations may change the record's
//! length. The bytes after the array shift by the size difference.

use tracing::{debug, info};

use crate::cursor::ByteReader;
use crate::error::{DecodeError, PatchError};
use crate::index::RecordIndex;
use crate::options::ParseOptions;
use crate::record::{
    CLASSES_OFFSET, StringArrayField, check_field_array, encode_string_array, read_field_array,
};

/// A string array as found in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringArraySpan {
    /// Offset of the count field.
    pub offset: usize,
    /// Encoded length, count included.
    pub len: usize,
    pub items: Vec<String>,
}

fn read_array_at(
    buffer: &[u8],
    offset: usize,
    field: StringArrayField,
    options: &ParseOptions,
) -> Result<StringArraySpan, DecodeError> {
    let mut reader = ByteReader::at(buffer, offset);
    let items = read_field_array(&mut reader, field, options)?;
    Ok(StringArraySpan {
        offset,
        len: reader.position() - offset,
        items,
    })
}

/// Locate and decode one string array of the record at `record_offset`.
pub fn string_array_span(
    buffer: &[u8],
    record_offset: usize,
    field: StringArrayField,
    options: &ParseOptions,
) -> Result<StringArraySpan, DecodeError> {
    let classes = read_array_at(
        buffer,
        record_offset + CLASSES_OFFSET,
        StringArrayField::Classes,
        options,
    )?;
    match field {
        StringArrayField::Classes => Ok(classes),
        StringArrayField::StylesheetPaths => read_array_at(
            buffer,
            classes.offset + classes.len,
            StringArrayField::StylesheetPaths,
            options,
        ),
    }
}

/// Replace one string array of the record at `record_offset`.
///
/// Returns the new buffer; its length differs from `buffer` by the change in
/// encoded array size.
pub fn replace_string_array(
    buffer: &[u8],
    record_offset: usize,
    field: StringArrayField,
    items: &[String],
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    let old = string_array_span(buffer, record_offset, field, options)?;
    check_field_array(items, field, old.offset, &options.limits)?;

    let encoded = encode_string_array(items);
    let mut out = Vec::with_capacity(buffer.len() - old.len + encoded.len());
    out.extend_from_slice(&buffer[..old.offset]);
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&buffer[old.offset + old.len..]);

    debug!(
        field = %field,
        offset = old.offset,
        old_len = old.len,
        new_len = encoded.len(),
        "spliced string array"
    );
    Ok(out)
}

/// Replace one string array of the record with `id`.
pub fn set_string_array(
    buffer: &[u8],
    id: i32,
    field: StringArrayField,
    items: &[String],
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    let index = RecordIndex::resolve(buffer, [id], options);
    let offset = index.locate(id)?.span.offset;
    replace_string_array(buffer, offset, field, items, options)
}

/// Replace the class list of the record with `id`.
pub fn set_classes(
    buffer: &[u8],
    id: i32,
    classes: &[String],
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    set_string_array(buffer, id, StringArrayField::Classes, classes, options)
}

/// Exchange the class lists of two records.
///
/// The record at the higher offset is patched first. The lower record is
/// then located again in the new buffer before it is patched.
pub fn swap_classes(
    buffer: &[u8],
    first: i32,
    second: i32,
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    if first == second {
        return Ok(buffer.to_vec());
    }

    let index = RecordIndex::resolve(buffer, [first, second], options);
    let first_offset = index.locate(first)?.span.offset;
    let second_offset = index.locate(second)?.span.offset;

    let field = StringArrayField::Classes;
    let first_classes = string_array_span(buffer, first_offset, field, options)?.items;
    let second_classes = string_array_span(buffer, second_offset, field, options)?.items;

    let (high_offset, high_classes, low_id, low_classes) = if first_offset > second_offset {
        (first_offset, &first_classes, second, &second_classes)
    } else {
        (second_offset, &second_classes, first, &first_classes)
    };

    let patched = replace_string_array(buffer, high_offset, field, low_classes, options)?;

    let index = RecordIndex::resolve(&patched, [low_id], options);
    let low_offset = index.locate(low_id)?.span.offset;
    let out = replace_string_array(&patched, low_offset, field, high_classes, options)?;

    info!(
        first,
        second,
        delta = out.len() as i64 - buffer.len() as i64,
        "swapped class lists"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{ArrayKind, ElementArray};
    use crate::asset::{VisualTreeAsset, build};
    use crate::header::HEADER_LEN;
    use crate::record::{ElementRecord, string_array_len};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn sample() -> Vec<u8> {
        let visual = ElementArray::new(ArrayKind::Visual, vec![0; 40]).with_records(vec![
            ElementRecord::new(10, "Label")
                .with_classes(["base"])
                .with_stylesheet_paths(["Assets/a.uss"])
                .with_name("A"),
            ElementRecord::new(20, "Label").with_parent(10).with_name("B"),
        ]);
        let template = ElementArray::new(ArrayKind::Template, vec![0; 12])
            .with_records(vec![ElementRecord::new(30, "TemplateContainer").with_classes(["row"])]);
        build(&[0; HEADER_LEN], &[], &visual, &template).unwrap()
    }

    fn parse(data: &[u8]) -> VisualTreeAsset {
        VisualTreeAsset::parse(data, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_span_of_each_field() {
        let data = sample();
        let asset = parse(&data);
        let offset = asset.layout.visual.records[0].offset;

        let classes = string_array_span(&data, offset, StringArrayField::Classes, &ParseOptions::default()).unwrap();
        assert_eq!(classes.offset, offset + CLASSES_OFFSET);
        assert_eq!(classes.items, ["base"]);
        assert_eq!(classes.len, 16);

        let paths =
            string_array_span(&data, offset, StringArrayField::StylesheetPaths, &ParseOptions::default()).unwrap();
        assert_eq!(paths.offset, classes.offset + 16);
        assert_eq!(paths.items, ["Assets/a.uss"]);
    }

    #[test]
    fn test_set_classes_shifts_following_records() {
        let data = sample();
        let out = set_classes(&data, 10, &strings(&["base", "extra-wide"]), &ParseOptions::default()).unwrap();
        assert_eq!(out.len(), data.len() + 16);

        let asset = parse(&out);
        let record = asset.find(10).unwrap().1;
        assert_eq!(record.classes, ["base", "extra-wide"]);
        assert_eq!(record.stylesheet_paths, ["Assets/a.uss"]);
        assert_eq!(asset.find(20).unwrap().1.name, "B");
        assert_eq!(asset.find(30).unwrap().1.classes, ["row"]);
    }

    #[test]
    fn test_set_stylesheet_paths() {
        let out = set_string_array(
            &sample(),
            10,
            StringArrayField::StylesheetPaths,
            &[],
            &ParseOptions::default(),
        )
        .unwrap();
        let asset = parse(&out);
        let record = asset.find(10).unwrap().1;
        assert!(record.stylesheet_paths.is_empty());
        assert_eq!(record.classes, ["base"]);
    }

    #[test]
    fn test_swap_classes() {
        let data = sample();
        let out = swap_classes(&data, 10, 20, &ParseOptions::default()).unwrap();

        // The higher record alone grows by exactly the class list difference.
        let delta = string_array_len(&strings(&["base"])) - string_array_len(&[]);
        assert_eq!(delta, 12);
        let high = parse(&data).layout.visual.records[1].offset;
        let step = replace_string_array(
            &data,
            high,
            StringArrayField::Classes,
            &strings(&["base"]),
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(step.len(), data.len() + delta);

        assert_eq!(out.len(), data.len());

        let asset = parse(&out);
        assert!(asset.find(10).unwrap().1.classes.is_empty());
        assert_eq!(asset.find(20).unwrap().1.classes, ["base"]);
    }

    #[test]
    fn test_swap_same_id_is_noop() {
        let data = sample();
        assert_eq!(swap_classes(&data, 10, 10, &ParseOptions::default()).unwrap(), data);
    }

    #[test]
    fn test_swap_missing_record() {
        let err = swap_classes(&sample(), 10, 99, &ParseOptions::default()).unwrap_err();
        assert_eq!(err, PatchError::RecordNotFound { id: 99 });
    }

    #[test]
    fn test_replacement_limits() {
        let many: Vec<String> = (0..101).map(|i| i.to_string()).collect();
        let err = set_classes(&sample(), 10, &many, &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PatchError::Decode(DecodeError::ImplausibleLength { value: 101, .. })
        ));
    }
}
