//! Visual Tree Asset (VTA) binary reader, writer and patcher.
//!
//! A VTA is a game engine's serialized UI document: a tree of visual elements
//! plus references to reusable templates. This crate decodes the binary form
//! into records, re-encodes it byte-for-byte, and mutates it either in place
//! (same-size patches, order rewrites) or by splicing and full rebuilds.
//!
//! # Features
//!
//! - Lossless parse: unknown header, gap and trailing bytes are preserved
//! - Same-size in-place patching driven by an id index built once per buffer
//! - `order_in_document` rewrites from an external ordering
//! - Class list and stylesheet path replacement with byte splicing
//! - Optional `serde` support for records, options and field views
//!
//! # Example
//!
//! ```
//! use vta_codec::{
//!     ArrayKind, ElementArray, ElementRecord, PatchBatch, ParseOptions, VisualTreeAsset,
//!     apply_patches, build,
//! };
//!
//! let visual = ElementArray::new(ArrayKind::Visual, vec![0; 40]).with_records(vec![
//!     ElementRecord::new(1, "VisualElement").with_name("root"),
//!     ElementRecord::new(2, "Label").with_parent(1).with_classes(["title"]),
//! ]);
//! let template = ElementArray::new(ArrayKind::Template, vec![0; 12])
//!     .with_records(vec![ElementRecord::new(3, "TemplateContainer")]);
//! let bytes = build(&[0; 72], &[], &visual, &template).unwrap();
//!
//! let options = ParseOptions::default();
//! let asset = VisualTreeAsset::parse(&bytes, &options).unwrap();
//! assert_eq!(asset.to_bytes().unwrap(), bytes);
//!
//! // Same-size edit written over the original record.
//! let mut root = asset.find(1).unwrap().1.clone();
//! root.name = "ROOT".to_string();
//! let patched = apply_patches(&bytes, &PatchBatch::new().with(root), &options).unwrap();
//! assert_eq!(patched.len(), bytes.len());
//! ```

mod cursor;
mod error;

pub mod array;
pub mod asset;
pub mod header;
pub mod index;
pub mod options;
pub mod patch;
pub mod provider;
pub mod record;
pub mod reorder;
pub mod splice;

pub use array::{
    ArrayKind, ArrayLayout, ElementArray, PartialDecode, decode_array, decode_records_partial,
    serialize_array,
};
pub use asset::{AssetLayout, VisualTreeAsset, build, build_with_limits};
pub use error::{DecodeError, HeaderError, PatchError, Result, VtaError};
pub use header::{
    ArraySearch, GUID_LEN, HEADER_LEN, TemplateReference, find_template_array,
    parse_template_references, serialize_template_references,
};
pub use index::{IndexEntry, RecordIndex, find_record_offset};
pub use options::{DEFAULT_SCAN_WINDOW, ParseOptions, SanityLimits};
pub use patch::{PatchBatch, apply_patches, apply_patches_in_place, apply_with_index};
pub use provider::{
    CrossCheckReport, FieldRecord, FieldView, MemorySegment, Mismatch, SegmentProvider,
    cross_check, rewrite_segment,
};
pub use record::{ElementRecord, NO_RULE, RecordSpan, StringArrayField};
pub use reorder::{apply_order_in_place, flatten_hierarchy, reorder};
pub use splice::{
    StringArraySpan, replace_string_array, set_classes, set_string_array, string_array_span,
    swap_classes,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
