//! Integration tests for lossless parse and rebuild.
//!
//! These tests build realistic documents, parse them back and check that an
//! unmodified asset re-encodes to exactly the input bytes.

use proptest::prelude::*;
use vta_codec::{
    ArrayKind, DecodeError, ElementArray, ElementRecord, HEADER_LEN, HeaderError, ParseOptions,
    TemplateReference, VisualTreeAsset, build, decode_records_partial,
};

fn header() -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..8].copy_from_slice(b"\x01\x00\x00\x00VTA\x00");
    header[40..44].copy_from_slice(&0x0bad_f00du32.to_le_bytes());
    header
}

fn template_refs() -> Vec<TemplateReference> {
    vec![
        TemplateReference::new("AttributeRow", "6f2c1d0b8e3a4f5c9d7e1a2b3c4d5e6f").unwrap(),
        TemplateReference::new("Tile", "00112233445566778899aabbccddeeff").unwrap(),
        TemplateReference::new("PlayerPortraitLarge", "abcdefabcdefabcdefabcdefabcdefab").unwrap(),
    ]
}

/// A small attributes panel: a root, a header label and two rows.
fn document() -> (ElementArray, ElementArray) {
    let mut descriptor = vec![0u8; 40];
    descriptor[..4].copy_from_slice(&[1, 0, 0, 0]);
    descriptor[20..24].copy_from_slice(&[0x10, 0, 0, 0]);

    let visual = ElementArray::new(ArrayKind::Visual, descriptor).with_records(vec![
        ElementRecord::new(-753_365_010, "UnityEngine.UIElements.VisualElement")
            .with_classes(["attributes-panel", "base"])
            .with_stylesheet_paths(["Assets/UI/Styles/Attributes.uss"])
            .with_name("AttributesPanel"),
        ElementRecord::new(1_752_032_402, "UnityEngine.UIElements.Label")
            .with_parent(-753_365_010)
            .with_rule_index(3)
            .with_classes(["header"])
            .with_opaque_a([0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 2, 0, 0, 0])
            .with_name("Title"),
        ElementRecord::new(11, "UnityEngine.UIElements.VisualElement")
            .with_parent(-753_365_010)
            .with_order(1)
            .with_classes(["row", "row", "row--even"])
            .with_name(""),
        ElementRecord::new(12, "UnityEngine.UIElements.VisualElement")
            .with_parent(-753_365_010)
            .with_order(2)
            .with_classes(["row"])
            .with_opaque_b([1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0])
            .with_name("Row2"),
    ]);

    let template = ElementArray::new(ArrayKind::Template, vec![0; 12]).with_records(vec![
        ElementRecord::new(21, "UnityEngine.UIElements.TemplateContainer")
            .with_parent(11)
            .with_name("AttributeRow"),
        ElementRecord::new(22, "UnityEngine.UIElements.TemplateContainer")
            .with_parent(12)
            .with_classes(["tile"])
            .with_name("Tile"),
    ]);
    (visual, template)
}

fn document_bytes() -> Vec<u8> {
    let (visual, template) = document();
    build(&header(), &template_refs(), &visual, &template).unwrap()
}

#[test]
fn test_parse_then_rebuild_is_identity() {
    let bytes = document_bytes();
    let asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default().strict()).unwrap();

    assert_eq!(asset.header, header());
    assert_eq!(asset.template_refs, template_refs());
    assert_eq!(asset.visual.records.len(), 4);
    assert_eq!(asset.template.records.len(), 2);
    assert_eq!(asset.to_bytes().unwrap(), bytes);
}

#[test]
fn test_decoded_fields() {
    let asset = VisualTreeAsset::parse(&document_bytes(), &ParseOptions::default()).unwrap();
    let (kind, title) = asset.find(1_752_032_402).unwrap();
    assert_eq!(kind, ArrayKind::Visual);
    assert_eq!(title.parent_id, -753_365_010);
    assert_eq!(title.rule_index, 3);
    assert_eq!(title.opaque_a[12..16], [0xff; 4]);

    let row = asset.find(11).unwrap().1;
    assert_eq!(row.classes, ["row", "row", "row--even"]);
    assert_eq!(row.name, "");
    assert!(!row.has_rule());
}

#[test]
fn test_engine_metadata_survives() {
    let (visual, template) = document();
    let mut bytes = build(&header(), &template_refs(), &visual, &template).unwrap();
    let template_start = bytes.len() - template.encoded_len();
    let gap = [0xff, 0xff, 0xff, 0xff, 0x7f, 0, 0, 0];
    bytes.splice(template_start..template_start, gap);
    bytes.extend(b"\x02\x00\x00\x00trailing engine data");

    let asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default()).unwrap();
    assert_eq!(asset.gap, gap);
    assert_eq!(asset.trailing, b"\x02\x00\x00\x00trailing engine data");
    assert_eq!(asset.to_bytes().unwrap(), bytes);
}

#[test]
fn test_rebuild_after_growth() {
    let bytes = document_bytes();
    let mut asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default()).unwrap();

    asset.find_mut(12).unwrap().classes.push("row--highlighted".to_string());
    asset.visual.records.push(
        ElementRecord::new(13, "UnityEngine.UIElements.Label")
            .with_parent(-753_365_010)
            .with_order(3)
            .with_name("Footer"),
    );
    assert!(asset.needs_rebuild());

    let rebuilt = asset.to_bytes().unwrap();
    let reparsed = VisualTreeAsset::parse(&rebuilt, &ParseOptions::default()).unwrap();
    assert_eq!(reparsed.visual.records.len(), 5);
    assert_eq!(reparsed.find(12).unwrap().1.classes, ["row", "row--highlighted"]);
    assert_eq!(reparsed.find(13).unwrap().1.name, "Footer");
    assert_eq!(reparsed.template, asset.template);
}

#[test]
fn test_malformed_class_count_rejected() {
    let bytes = document_bytes();
    let asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default()).unwrap();
    let span = asset.layout.visual.records[2];

    let mut corrupt = bytes.clone();
    let count_at = span.offset + 36;
    corrupt[count_at..count_at + 4].copy_from_slice(&5000i32.to_le_bytes());

    let err = VisualTreeAsset::parse(&corrupt, &ParseOptions::default()).unwrap_err();
    assert_eq!(
        err,
        HeaderError::Record {
            array: ArrayKind::Visual,
            index: 2,
            offset: span.offset,
            source: DecodeError::ImplausibleLength {
                field: "classes count",
                offset: count_at,
                value: 5000,
            },
        }
    );

    // Earlier records are still available for diagnostics.
    let partial = decode_records_partial(
        &corrupt,
        asset.layout.visual.offset,
        ArrayKind::Visual,
        &ParseOptions::default(),
    );
    assert_eq!(partial.records.len(), 2);
    assert_eq!(partial.records[1].name, "Title");
}

#[test]
fn test_truncated_buffer() {
    let bytes = document_bytes();
    for len in [HEADER_LEN - 1, HEADER_LEN + 10, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            VisualTreeAsset::parse(&bytes[..len], &ParseOptions::default()).is_err(),
            "len {len}"
        );
    }
}

#[test]
fn test_strict_mode_rejects_dirty_padding() {
    let bytes = document_bytes();
    let asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default()).unwrap();
    // "header" is 6 bytes: terminator at +10, padding at +11.
    let class_entry = asset.layout.visual.records[1].offset + 40;
    let mut dirty = bytes.clone();
    dirty[class_entry + 11] = 0x55;

    let lenient = VisualTreeAsset::parse(&dirty, &ParseOptions::default()).unwrap();
    assert_eq!(lenient.find(1_752_032_402).unwrap().1.classes, ["header"]);
    assert_eq!(lenient.to_bytes().unwrap(), bytes);

    let err = VisualTreeAsset::parse(&dirty, &ParseOptions::default().strict()).unwrap_err();
    assert!(matches!(
        err,
        HeaderError::Record {
            source: DecodeError::NonZeroPadding { .. },
            ..
        }
    ));
}

#[test]
fn test_scan_window_limits_search() {
    let (visual, template) = document();
    let mut bytes = build(&header(), &template_refs(), &visual, &template).unwrap();
    let template_start = bytes.len() - template.encoded_len();
    bytes.splice(template_start..template_start, [0xee; 64]);

    let err = VisualTreeAsset::parse(&bytes, &ParseOptions::default().with_scan_window(64)).unwrap_err();
    assert_eq!(
        err,
        HeaderError::TemplateArrayNotFound {
            search_start: template_start,
            window: 64,
        }
    );
    assert!(VisualTreeAsset::parse(&bytes, &ParseOptions::default().with_scan_window(68)).is_ok());
}

fn arb_record() -> impl Strategy<Value = ElementRecord> {
    (
        1i32..1_000_000,
        0i32..50,
        0i32..1_000_000,
        prop_oneof![Just(-1), 0i32..200],
        prop::collection::vec("[a-z][a-z0-9-]{0,15}", 0..4),
        prop::collection::vec("Assets/[A-Za-z]{1,12}\\.uss", 0..2),
        "[A-Za-z.]{1,40}",
        "[A-Za-z0-9]{0,16}",
    )
        .prop_map(|(id, order, parent, rule, classes, paths, type_name, name)| {
            ElementRecord::new(id, type_name)
                .with_order(order)
                .with_parent(parent)
                .with_rule_index(rule)
                .with_classes(classes)
                .with_stylesheet_paths(paths)
                .with_name(name)
        })
}

proptest! {
    #[test]
    fn rebuilt_assets_parse_back(
        visual in prop::collection::vec(arb_record(), 0..8),
        template in prop::collection::vec(arb_record(), 1..4),
    ) {
        let visual = ElementArray::new(ArrayKind::Visual, vec![0x33; 40]).with_records(visual);
        let template = ElementArray::new(ArrayKind::Template, vec![0; 12]).with_records(template);
        let bytes = build(&header(), &template_refs(), &visual, &template).unwrap();

        let asset = VisualTreeAsset::parse(&bytes, &ParseOptions::default()).unwrap();
        prop_assert_eq!(&asset.visual, &visual);
        prop_assert_eq!(&asset.template, &template);
        prop_assert!(asset.gap.is_empty());
        prop_assert_eq!(asset.to_bytes().unwrap(), bytes);
    }
}
