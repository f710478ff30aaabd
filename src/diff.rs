//! Diff computation: preview snapshot -> ordered edit instructions

use crate::model::{DatasetSnapshot, Instruction, InstructionSet, RowDiff};
use std::collections::HashMap;

/// Compute the instruction set transforming `original` into `modified`.
///
/// The walk only iterates `modified`: during a preview the backend returns an
/// annotated view restricted to the displayed rows, not the whole dataset, so
/// rows absent from `modified` are deliberately left alone.
///
/// Precondition: when the resulting set is applied, the target row store must
/// still reflect `original` (same rows, same physical order). Insertion
/// indices are positions in that ordering.
pub fn compute_diff(original: &DatasetSnapshot, modified: &DatasetSnapshot) -> InstructionSet {
    let mut index_by_id: HashMap<i64, usize> = HashMap::with_capacity(original.records.len());
    for (i, row) in original.records.iter().enumerate() {
        let previous = index_by_id.insert(row.id, i);
        debug_assert!(previous.is_none(), "duplicate row id {} in snapshot", row.id);
    }

    build_instructions(modified, |id| index_by_id.get(&id).copied())
}

/// Shared instruction walk, parameterized over the index-by-id lookup so the
/// grid service can run it against the live store.
///
/// Classification per row of `modified`, in order:
/// - row marker `new` -> `Insert` at the running insertion index
/// - row marker `delete` -> `Replace` (soft delete, the row stays visible
///   tagged as deleted)
/// - any cell marker -> `Replace`
/// - no marker -> no instruction
///
/// The insertion index is seeded from the position of the first row known to
/// the lookup and advanced once per row walked, inserted rows included, so
/// later insertions account for earlier ones.
pub(crate) fn build_instructions<F>(modified: &DatasetSnapshot, index_of: F) -> InstructionSet
where
    F: Fn(i64) -> Option<usize>,
{
    let mut instructions = Vec::new();

    let mut next_insertion_index = modified
        .records
        .iter()
        .enumerate()
        .find_map(|(offset, row)| {
            index_of(row.id).map(|index| index.saturating_sub(offset))
        })
        .unwrap_or(0);

    for row in &modified.records {
        if row.has_diff() {
            if row.row_diff == Some(RowDiff::New) {
                instructions.push(Instruction::Insert {
                    row: row.clone(),
                    index: next_insertion_index,
                });
            } else {
                instructions.push(Instruction::Replace { row: row.clone() });
            }
        }

        next_insertion_index += 1;
    }

    InstructionSet {
        instructions,
        metadata: modified.metadata.clone(),
        preview: true,
    }
}
