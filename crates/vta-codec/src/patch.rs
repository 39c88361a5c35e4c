//! Same-size record patching.
//!
//! Patches overwrite records at their original offsets and are only valid
//! when the replacement encodes to exactly the original number of bytes.
//! Anything else needs a full rebuild through [`VisualTreeAsset::to_bytes`].
//!
//! [`VisualTreeAsset::to_bytes`]: crate::asset::VisualTreeAsset::to_bytes

use tracing::{debug, info};

use crate::error::PatchError;
use crate::index::RecordIndex;
use crate::options::{ParseOptions, SanityLimits};
use crate::record::ElementRecord;

/// Pending record replacements, keyed by the id of the record they replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchBatch {
    patches: Vec<(i32, ElementRecord)>,
}

impl PatchBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a replacement for the record with `id`.
    ///
    /// A later patch for the same id replaces the earlier one but keeps its
    /// position in the batch.
    pub fn insert(&mut self, id: i32, record: ElementRecord) {
        if let Some(slot) = self.patches.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = record;
        } else {
            self.patches.push((id, record));
        }
    }

    /// Queue a replacement keyed by the record's own id.
    pub fn push(&mut self, record: ElementRecord) {
        self.insert(record.id, record);
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, record: ElementRecord) -> Self {
        self.push(record);
        self
    }

    /// Ids targeted by the batch, in application order.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.patches.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &ElementRecord)> {
        self.patches.iter().map(|(id, record)| (*id, record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

impl FromIterator<ElementRecord> for PatchBatch {
    fn from_iter<T: IntoIterator<Item = ElementRecord>>(iter: T) -> Self {
        let mut batch = Self::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}

/// Apply a batch to a copy of `buffer`.
///
/// Either every patch applies and the patched copy is returned, or an error
/// is returned and the caller's buffer is untouched.
pub fn apply_patches(
    buffer: &[u8],
    batch: &PatchBatch,
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    let index = RecordIndex::resolve(buffer, batch.ids(), options);
    let mut out = buffer.to_vec();
    apply_with_index(&mut out, batch, &index, &options.limits)?;
    Ok(out)
}

/// Apply a batch directly to `buffer`, in batch order.
///
/// Patches written before a failure stay written. The failing record itself
/// is never written. Returns the number of records patched.
pub fn apply_patches_in_place(
    buffer: &mut [u8],
    batch: &PatchBatch,
    options: &ParseOptions,
) -> Result<usize, PatchError> {
    let index = RecordIndex::resolve(buffer, batch.ids(), options);
    apply_with_index(buffer, batch, &index, &options.limits)
}

/// Apply a batch using a prebuilt index for `buffer`.
///
/// The index stays valid across patches since no patch changes a span.
/// Records outside `limits` are rejected before anything is written for them.
pub fn apply_with_index(
    buffer: &mut [u8],
    batch: &PatchBatch,
    index: &RecordIndex,
    limits: &SanityLimits,
) -> Result<usize, PatchError> {
    let mut applied = 0;
    for (id, record) in batch.iter() {
        let span = index.locate(id)?.span;
        record.validate_at(span.offset, limits)?;
        let encoded = record.encode();
        if encoded.len() != span.len {
            return Err(PatchError::SizeChanged {
                id,
                original: span.len,
                new: encoded.len(),
            });
        }
        buffer[span.offset..span.end()].copy_from_slice(&encoded);
        debug!(id, offset = span.offset, len = span.len, "patched record");
        applied += 1;
    }
    info!(applied, "applied record patches");
    Ok(applied)
}
