//! Record lookup by id.
//!
//! A [`RecordIndex`] maps every record id to the span it occupies in one
//! buffer. It is built once and shared by all patches applied to that
//! buffer, instead of scanning the buffer again for each id.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::array::ArrayKind;
use crate::asset::VisualTreeAsset;
use crate::error::{HeaderError, PatchError};
use crate::options::{ParseOptions, SanityLimits};
use crate::record::{ElementRecord, RecordSpan};

/// Where one record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Owning array; `None` when the entry came from a byte scan.
    pub array: Option<ArrayKind>,
    pub span: RecordSpan,
}

/// Map from record id to its location in a buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIndex {
    entries: BTreeMap<i32, IndexEntry>,
}

impl RecordIndex {
    /// Index every record of a parsed asset using its recorded layout.
    ///
    /// If an id occurs twice, the first occurrence in buffer order wins.
    #[must_use]
    pub fn from_asset(asset: &VisualTreeAsset) -> Self {
        let mut entries = BTreeMap::new();
        for kind in ArrayKind::ALL {
            let records = &asset.array(kind).records;
            let spans = &asset.layout.array(kind).records;
            for (record, span) in records.iter().zip(spans) {
                if entries.contains_key(&record.id) {
                    warn!(id = record.id, array = %kind, offset = span.offset, "duplicate record id ignored");
                    continue;
                }
                entries.insert(
                    record.id,
                    IndexEntry {
                        array: Some(kind),
                        span: *span,
                    },
                );
            }
        }
        debug!(records = entries.len(), "built record index from layout");
        Self { entries }
    }

    /// Parse `data` and index it.
    pub fn build(data: &[u8], options: &ParseOptions) -> Result<Self, HeaderError> {
        Ok(Self::from_asset(&VisualTreeAsset::parse(data, options)?))
    }

    /// Locate the given ids by byte search.
    ///
    /// Used for buffers whose structure cannot be walked. A hit is kept only
    /// if a full record decodes there; ids that cannot be found are absent
    /// from the index.
    #[must_use]
    pub fn scan<I>(data: &[u8], ids: I, options: &ParseOptions) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let mut entries = BTreeMap::new();
        for id in ids {
            if entries.contains_key(&id) {
                continue;
            }
            if let Some(entry) = scan_one(data, id, options) {
                entries.insert(id, entry);
            } else {
                debug!(id, "record not found by scan");
            }
        }
        debug!(records = entries.len(), "built record index by scan");
        Self { entries }
    }

    /// Index `data` structurally, falling back to a scan for `ids` when the
    /// structure cannot be parsed.
    pub fn resolve<I>(data: &[u8], ids: I, options: &ParseOptions) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        match Self::build(data, options) {
            Ok(index) => index,
            Err(err) => {
                warn!(error = %err, "structural parse failed, locating records by scan");
                Self::scan(data, ids, options)
            }
        }
    }

    /// Look up an id.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<&IndexEntry> {
        self.entries.get(&id)
    }

    /// Look up an id, failing with [`PatchError::RecordNotFound`].
    pub fn locate(&self, id: i32) -> Result<&IndexEntry, PatchError> {
        self.get(id).ok_or(PatchError::RecordNotFound { id })
    }

    /// Whether an id is indexed.
    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &IndexEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}

fn scan_one(data: &[u8], id: i32, options: &ParseOptions) -> Option<IndexEntry> {
    let mut start = 0;
    while let Some(offset) = find_record_offset(data, id, start, &options.limits) {
        if let Ok((_, len)) = ElementRecord::decode(data, offset, options) {
            return Some(IndexEntry {
                array: None,
                span: RecordSpan { offset, len },
            });
        }
        start = offset + 4;
    }
    None
}

/// Find the first plausible record with `id` at or after `start`.
///
/// A match of the id's little-endian bytes is accepted when the two fields
/// after it fit in the buffer and the first of them is a plausible
/// `order_in_document`. Otherwise the search continues 4 bytes later.
#[must_use]
pub fn find_record_offset(data: &[u8], id: i32, start: usize, limits: &SanityLimits) -> Option<usize> {
    let needle = id.to_le_bytes();
    let mut pos = start;
    while pos + 4 <= data.len() {
        let hit = pos + data[pos..].windows(4).position(|w| w == needle)?;
        if hit + 12 <= data.len() {
            let order = i32::from_le_bytes([data[hit + 4], data[hit + 5], data[hit + 6], data[hit + 7]]);
            if limits.plausible_order(order) {
                return Some(hit);
            }
        }
        pos = hit + 4;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ElementArray;
    use crate::asset::build;
    use crate::header::{HEADER_LEN, TemplateReference};

    fn sample() -> Vec<u8> {
        let visual = ElementArray::new(ArrayKind::Visual, vec![0; 40]).with_records(vec![
            ElementRecord::new(10, "VisualElement").with_name("root"),
            ElementRecord::new(20, "Label").with_parent(10).with_order(1),
            ElementRecord::new(10, "Label").with_parent(10).with_order(2),
        ]);
        let template = ElementArray::new(ArrayKind::Template, vec![0; 12])
            .with_records(vec![ElementRecord::new(30, "TemplateContainer")]);
        let refs = vec![TemplateReference::new("Row", "0".repeat(32)).unwrap()];
        build(&[0; HEADER_LEN], &refs, &visual, &template).unwrap()
    }

    #[test]
    fn test_index_from_structure() {
        let data = sample();
        let asset = VisualTreeAsset::parse(&data, &ParseOptions::default()).unwrap();
        let index = RecordIndex::from_asset(&asset);

        assert_eq!(index.len(), 3);
        let entry = index.get(20).unwrap();
        assert_eq!(entry.array, Some(ArrayKind::Visual));
        assert_eq!(entry.span, asset.layout.visual.records[1]);

        // First of the two id-10 records wins.
        assert_eq!(index.get(10).unwrap().span, asset.layout.visual.records[0]);
        assert_eq!(index.get(30).unwrap().array, Some(ArrayKind::Template));
        assert_eq!(index.iter().map(|(id, _)| id).collect::<Vec<_>>(), [10, 20, 30]);
    }

    #[test]
    fn test_locate_missing() {
        let index = RecordIndex::build(&sample(), &ParseOptions::default()).unwrap();
        assert_eq!(index.locate(99), Err(PatchError::RecordNotFound { id: 99 }));
        assert!(index.locate(30).is_ok());
    }

    #[test]
    fn test_scan_matches_structure() {
        let data = sample();
        let structural = RecordIndex::build(&data, &ParseOptions::default()).unwrap();
        let scanned = RecordIndex::scan(&data, [20, 30, 99], &ParseOptions::default());

        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned.get(20).unwrap().span, structural.get(20).unwrap().span);
        assert_eq!(scanned.get(30).unwrap().span, structural.get(30).unwrap().span);
        assert_eq!(scanned.get(20).unwrap().array, None);
        assert!(!scanned.contains(99));
    }

    #[test]
    fn test_resolve_falls_back_to_scan() {
        let mut data = sample();
        // Break the header so the structure cannot be walked.
        data[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&(-5i32).to_le_bytes());
        assert!(RecordIndex::build(&data, &ParseOptions::default()).is_err());

        let index = RecordIndex::resolve(&data, [20], &ParseOptions::default());
        assert!(index.contains(20));
    }

    #[test]
    fn test_find_record_offset_skips_implausible_order() {
        let mut data = Vec::new();
        data.extend(7i32.to_le_bytes());
        data.extend(50_000i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());
        data.extend(7i32.to_le_bytes());
        data.extend(3i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());

        let limits = SanityLimits::default();
        assert_eq!(find_record_offset(&data, 7, 0, &limits), Some(12));
        assert_eq!(find_record_offset(&data, 8, 0, &limits), None);
    }

    #[test]
    fn test_find_record_offset_needs_room() {
        let mut data = 7i32.to_le_bytes().to_vec();
        data.extend(1i32.to_le_bytes());
        assert_eq!(find_record_offset(&data, 7, 0, &SanityLimits::default()), None);
        data.extend(0i32.to_le_bytes());
        assert_eq!(find_record_offset(&data, 7, 0, &SanityLimits::default()), Some(0));
    }

    #[test]
    fn test_scan_rejects_hits_that_do_not_decode() {
        // A decoy with a plausible order whose classes count reads as -1.
        let mut data = Vec::new();
        data.extend(42i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());
        data.extend([0xff; 28]);
        let real_offset = data.len();
        data.extend(ElementRecord::new(42, "Label").with_name("x").encode());

        let index = RecordIndex::scan(&data, [42], &ParseOptions::default());
        assert_eq!(index.get(42).unwrap().span.offset, real_offset);
    }
}
