//! Rewriting `order_in_document` from an external ordering.
//!
//! Only the 4-byte order field of each affected record is written, so the
//! buffer length and every other byte stay the same.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::array::ArrayKind;
use crate::cursor::write_i32_at;
use crate::error::PatchError;
use crate::index::RecordIndex;
use crate::options::ParseOptions;
use crate::record::ElementRecord;

/// Offset of `order_in_document` inside a record.
const ORDER_FIELD_OFFSET: usize = 4;

/// Rank of each id: the position of its first occurrence in `ordering`.
fn ranks(ordering: &[i32]) -> HashMap<i32, i32> {
    let mut ranks = HashMap::with_capacity(ordering.len());
    for (position, id) in ordering.iter().enumerate() {
        ranks.entry(*id).or_insert(position as i32);
    }
    ranks
}

/// Apply an ordering to a copy of `buffer`.
///
/// Every indexed record in `arrays` whose id appears in `ordering` gets its
/// rank written as `order_in_document`. Records from a scan-built index have
/// no known array and are always included.
pub fn reorder(
    buffer: &[u8],
    ordering: &[i32],
    arrays: &[ArrayKind],
    options: &ParseOptions,
) -> Result<Vec<u8>, PatchError> {
    let index = RecordIndex::resolve(buffer, ordering.iter().copied(), options);
    let mut out = buffer.to_vec();
    apply_order_in_place(&mut out, ordering, arrays, &index)?;
    Ok(out)
}

/// Apply an ordering directly to `buffer` using a prebuilt index.
///
/// Returns the number of records whose order field was written.
pub fn apply_order_in_place(
    buffer: &mut [u8],
    ordering: &[i32],
    arrays: &[ArrayKind],
    index: &RecordIndex,
) -> Result<usize, PatchError> {
    let ranks = ranks(ordering);
    let mut written = 0;
    for (id, entry) in index.iter() {
        if !entry.array.is_none_or(|kind| arrays.contains(&kind)) {
            continue;
        }
        let Some(&rank) = ranks.get(&id) else {
            continue;
        };
        let field = entry.span.offset + ORDER_FIELD_OFFSET;
        if field + 4 > buffer.len() {
            return Err(PatchError::RecordNotFound { id });
        }
        write_i32_at(buffer, field, rank);
        debug!(id, rank, offset = entry.span.offset, "rewrote order");
        written += 1;
    }
    info!(written, ordering = ordering.len(), "applied element ordering");
    Ok(written)
}

/// Derive an ordering from parent links.
///
/// Records are walked depth first, parents before children. Roots are
/// records whose parent is 0 or not among `records`. Siblings are visited by
/// their current `order_in_document`, ties keeping input order.
#[must_use]
pub fn flatten_hierarchy(records: &[ElementRecord]) -> Vec<i32> {
    let ids: HashSet<i32> = records.iter().map(|r| r.id).collect();

    let mut children: HashMap<i32, Vec<&ElementRecord>> = HashMap::new();
    let mut roots = Vec::new();
    for record in records {
        if record.parent_id == 0 || record.parent_id == record.id || !ids.contains(&record.parent_id) {
            roots.push(record);
        } else {
            children.entry(record.parent_id).or_default().push(record);
        }
    }
    roots.sort_by_key(|r| r.order_in_document);
    for siblings in children.values_mut() {
        siblings.sort_by_key(|r| r.order_in_document);
    }

    let mut ordering = Vec::with_capacity(records.len());
    let mut visited = HashSet::with_capacity(records.len());
    let mut stack: Vec<&ElementRecord> = roots.into_iter().rev().collect();
    while let Some(record) = stack.pop() {
        if !visited.insert(record.id) {
            continue;
        }
        ordering.push(record.id);
        if let Some(siblings) = children.get(&record.id) {
            stack.extend(siblings.iter().rev());
        }
    }
    ordering
}
