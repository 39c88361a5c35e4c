//! Host segment interface and cross-validation.
//!
//! The codec never opens container files. A host library hands it the raw
//! bytes of one asset object through [`SegmentProvider`], optionally along
//! with its own parse of the id/order/parent fields, which
//! [`cross_check`] compares against the codec's decode.

use std::fmt;

use tracing::{debug, warn};

use crate::array::ArrayKind;
use crate::asset::VisualTreeAsset;

/// The identity fields of one record as the host parsed them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldRecord {
    pub id: i32,
    pub order_in_document: i32,
    pub parent_id: i32,
}

/// The host's view of both element arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FieldView {
    pub visual: Vec<FieldRecord>,
    pub template: Vec<FieldRecord>,
}

impl FieldView {
    /// Build the view the host would report for a decoded asset.
    #[must_use]
    pub fn from_asset(asset: &VisualTreeAsset) -> Self {
        let fields = |kind: ArrayKind| -> Vec<FieldRecord> {
            asset
                .array(kind)
                .records
                .iter()
                .map(|r| FieldRecord {
                    id: r.id,
                    order_in_document: r.order_in_document,
                    parent_id: r.parent_id,
                })
                .collect()
        };
        Self {
            visual: fields(ArrayKind::Visual),
            template: fields(ArrayKind::Template),
        }
    }

    /// Records of one array.
    #[must_use]
    pub fn array(&self, kind: ArrayKind) -> &[FieldRecord] {
        match kind {
            ArrayKind::Visual => &self.visual,
            ArrayKind::Template => &self.template,
        }
    }
}

/// Access to one asset object's bytes inside a host container.
pub trait SegmentProvider {
    /// Current raw bytes of the object.
    fn raw_bytes(&self) -> &[u8];

    /// Replace the object's raw bytes.
    fn set_raw_bytes(&mut self, bytes: Vec<u8>);

    /// The host's own parse of the identity fields, if it has one.
    fn field_view(&self) -> Option<&FieldView> {
        None
    }
}

/// A segment held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySegment {
    bytes: Vec<u8>,
    view: Option<FieldView>,
}

impl MemorySegment {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            view: None,
        }
    }

    /// Attach a field view.
    #[must_use]
    pub fn with_field_view(mut self, view: FieldView) -> Self {
        self.view = Some(view);
        self
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl SegmentProvider for MemorySegment {
    fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn set_raw_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }

    fn field_view(&self) -> Option<&FieldView> {
        self.view.as_ref()
    }
}

/// Transform a segment's bytes and store the result.
///
/// The segment is only written when `transform` succeeds. Returns the new
/// length.
pub fn rewrite_segment<P, F, E>(provider: &mut P, transform: F) -> Result<usize, E>
where
    P: SegmentProvider + ?Sized,
    F: FnOnce(&[u8]) -> Result<Vec<u8>, E>,
{
    let before = provider.raw_bytes().len();
    let bytes = transform(provider.raw_bytes())?;
    let after = bytes.len();
    provider.set_raw_bytes(bytes);
    debug!(before, after, "rewrote segment");
    Ok(after)
}

/// One disagreement between the decoded asset and a field view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The arrays hold different numbers of records.
    Count {
        array: ArrayKind,
        decoded: usize,
        expected: usize,
    },
    /// A field differs for the record at `index`.
    Field {
        array: ArrayKind,
        index: usize,
        field: &'static str,
        decoded: i32,
        expected: i32,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count {
                array,
                decoded,
                expected,
            } => write!(f, "{array} array: decoded {decoded} records, expected {expected}"),
            Self::Field {
                array,
                index,
                field,
                decoded,
                expected,
            } => write!(
                f,
                "{array} record {index}: {field} decoded {decoded}, expected {expected}"
            ),
        }
    }
}

/// Result of [`cross_check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCheckReport {
    /// Number of record pairs compared.
    pub compared: usize,
    pub mismatches: Vec<Mismatch>,
}

impl CrossCheckReport {
    /// Whether the decode agrees with the view everywhere.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compare decoded records with a host field view, record by record.
#[must_use]
pub fn cross_check(asset: &VisualTreeAsset, view: &FieldView) -> CrossCheckReport {
    let mut report = CrossCheckReport::default();
    for kind in ArrayKind::ALL {
        let decoded = &asset.array(kind).records;
        let expected = view.array(kind);
        if decoded.len() != expected.len() {
            report.mismatches.push(Mismatch::Count {
                array: kind,
                decoded: decoded.len(),
                expected: expected.len(),
            });
        }
        for (index, (record, fields)) in decoded.iter().zip(expected).enumerate() {
            report.compared += 1;
            let pairs = [
                ("id", record.id, fields.id),
                ("order_in_document", record.order_in_document, fields.order_in_document),
                ("parent_id", record.parent_id, fields.parent_id),
            ];
            for (field, got, want) in pairs {
                if got != want {
                    report.mismatches.push(Mismatch::Field {
                        array: kind,
                        index,
                        field,
                        decoded: got,
                        expected: want,
                    });
                }
            }
        }
    }
    if !report.is_clean() {
        warn!(
            mismatches = report.mismatches.len(),
            compared = report.compared,
            "decoded records disagree with field view"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ElementArray;
    use crate::asset::build;
    use crate::error::PatchError;
    use crate::header::HEADER_LEN;
    use crate::options::ParseOptions;
    use crate::patch::{PatchBatch, apply_patches};
    use crate::record::ElementRecord;

    fn sample() -> Vec<u8> {
        let visual = ElementArray::new(ArrayKind::Visual, vec![0; 40]).with_records(vec![
            ElementRecord::new(1, "VisualElement").with_name("root"),
            ElementRecord::new(2, "Label").with_parent(1).with_order(1),
        ]);
        let template = ElementArray::new(ArrayKind::Template, vec![0; 12])
            .with_records(vec![ElementRecord::new(3, "TemplateContainer").with_parent(1)]);
        build(&[0; HEADER_LEN], &[], &visual, &template).unwrap()
    }

    #[test]
    fn test_cross_check_clean() {
        let asset = VisualTreeAsset::parse(&sample(), &ParseOptions::default()).unwrap();
        let report = cross_check(&asset, &FieldView::from_asset(&asset));
        assert!(report.is_clean());
        assert_eq!(report.compared, 3);
    }

    #[test]
    fn test_cross_check_reports_differences() {
        let asset = VisualTreeAsset::parse(&sample(), &ParseOptions::default()).unwrap();
        let mut view = FieldView::from_asset(&asset);
        view.visual[1].order_in_document = 7;
        view.template.push(FieldRecord {
            id: 4,
            order_in_document: 0,
            parent_id: 1,
        });

        let report = cross_check(&asset, &view);
        assert_eq!(
            report.mismatches,
            [
                Mismatch::Field {
                    array: ArrayKind::Visual,
                    index: 1,
                    field: "order_in_document",
                    decoded: 1,
                    expected: 7,
                },
                Mismatch::Count {
                    array: ArrayKind::Template,
                    decoded: 1,
                    expected: 2,
                },
            ]
        );
        assert_eq!(
            report.mismatches[1].to_string(),
            "template array: decoded 1 records, expected 2"
        );
    }

    #[test]
    fn test_rewrite_segment() {
        let mut segment = MemorySegment::new(sample());
        let batch = PatchBatch::new().with(ElementRecord::new(1, "VisualElement").with_name("ROOT"));

        let len = rewrite_segment(&mut segment, |bytes| {
            apply_patches(bytes, &batch, &ParseOptions::default())
        })
        .unwrap();
        assert_eq!(len, sample().len());

        let asset = VisualTreeAsset::parse(segment.raw_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(asset.visual.records[0].name, "ROOT");
    }

    #[test]
    fn test_rewrite_segment_failure_keeps_bytes() {
        let original = sample();
        let mut segment = MemorySegment::new(original.clone());
        let batch = PatchBatch::new().with(ElementRecord::new(9, "Label"));

        let err = rewrite_segment(&mut segment, |bytes| {
            apply_patches(bytes, &batch, &ParseOptions::default())
        })
        .unwrap_err();
        assert_eq!(err, PatchError::RecordNotFound { id: 9 });
        assert_eq!(segment.into_bytes(), original);
    }

    #[test]
    fn test_field_view_default() {
        let segment = MemorySegment::new(vec![1, 2, 3]);
        assert!(segment.field_view().is_none());
        let segment = segment.with_field_view(FieldView::default());
        assert!(segment.field_view().is_some());
    }
}
