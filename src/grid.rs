//! Grid service: instruction application with single-pass reverse construction

use crate::diff::build_instructions;
use crate::error::{PrepdiffError, Result};
use crate::model::{
    ColumnMetadata, DatasetMetadata, DatasetSnapshot, Instruction, InstructionSet, SemanticType,
};
use crate::store::RowStore;
use crate::text::escape_regex_except_star;
use log::debug;
use regex::Regex;
use std::collections::HashSet;

/// Column id/name pair returned by column searches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub id: String,
    pub name: String,
}

/// Owns a row store plus the active column metadata and preview flag, and
/// applies instruction sets against them.
///
/// Applying returns the reverse instruction set so a preview can be undone by
/// executing its reverter. Reverse instructions are synthesized in the same
/// pass that applies the forward ones: the reverse of a delete needs the row's
/// position at the moment the delete runs, and the reverse of a replace needs
/// the row content just before it is overwritten. Computing the reverse set
/// up front from the forward set would read stale indices.
pub struct GridService<S: RowStore> {
    store: S,
    columns: Vec<ColumnMetadata>,
    preview: bool,
    focused_column: Option<String>,
}

impl<S: RowStore> GridService<S> {
    pub fn new(store: S, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            store,
            columns,
            preview: false,
            focused_column: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// True while the grid shows transient preview data
    pub fn preview(&self) -> bool {
        self.preview
    }

    /// Column the UI should scroll to, set when an apply introduces new
    /// columns or by the preview workflow
    pub fn focused_column(&self) -> Option<&str> {
        self.focused_column.as_deref()
    }

    pub fn set_focused_column(&mut self, column_id: Option<String>) {
        self.focused_column = column_id;
    }

    /// Copy of the current grid content, captured before a preview starts so
    /// it can be restored later
    pub fn snapshot(&self) -> DatasetSnapshot {
        DatasetSnapshot::new(self.columns.clone(), self.store.rows().to_vec())
    }

    /// Build the instruction set reflecting `data` against the live store.
    ///
    /// Insertion indices are looked up in the store itself, so the store must
    /// not have been mutated since the snapshot `data` was diffed against was
    /// captured.
    pub fn preview_executor(&self, data: &DatasetSnapshot) -> InstructionSet {
        build_instructions(data, |id| self.store.index_by_id(id))
    }

    /// Apply an instruction set and return its reverse. `None` input is a
    /// no-op returning `None`; an empty instruction list still installs the
    /// set's column metadata and preview flag.
    ///
    /// Mutations run inside a single begin/end batch bracket; the bracket is
    /// closed even when an instruction fails.
    pub fn execute(&mut self, executor: Option<InstructionSet>) -> Result<Option<InstructionSet>> {
        let Some(set) = executor else {
            return Ok(None);
        };

        debug!(
            "applying {} instruction(s), preview={}",
            set.len(),
            set.preview
        );

        let mut revert_instructions = Vec::with_capacity(set.len());
        self.store.begin_batch();
        let applied = self.apply_all(&set.instructions, &mut revert_instructions);
        self.store.end_batch();
        applied?;

        let reverter = InstructionSet {
            instructions: revert_instructions,
            metadata: DatasetMetadata {
                columns: self.columns.clone(),
            },
            preview: self.preview,
        };

        if self.columns.len() < set.metadata.columns.len() {
            self.focused_column = last_new_column_id(&self.columns, &set.metadata.columns);
        }
        self.columns = set.metadata.columns;
        self.preview = set.preview;

        Ok(Some(reverter))
    }

    fn apply_all(
        &mut self,
        instructions: &[Instruction],
        revert: &mut Vec<Instruction>,
    ) -> Result<()> {
        for instruction in instructions {
            match instruction {
                Instruction::Insert { row, index } => {
                    // an index at or past the end appends (splice semantics):
                    // earlier instructions in the same set may have shrunk the
                    // store since the index was captured, e.g. a reverter
                    // whose reverse-of-insert delete runs before this
                    let index = (*index).min(self.store.len());
                    self.store.insert_at(index, row.clone())?;
                    revert.push(Instruction::Delete { row: row.clone() });
                }
                Instruction::Delete { row } => {
                    // position captured before the delete, not the index the
                    // forward set may carry
                    let index = self
                        .store
                        .index_by_id(row.id)
                        .ok_or(PrepdiffError::RowNotFound { id: row.id })?;
                    self.store.delete_by_id(row.id)?;
                    revert.push(Instruction::Insert {
                        row: row.clone(),
                        index,
                    });
                }
                Instruction::Replace { row } => {
                    let prior = self
                        .store
                        .get_by_id(row.id)
                        .cloned()
                        .ok_or(PrepdiffError::RowNotFound { id: row.id })?;
                    self.store.update_by_id(row.id, row.clone())?;
                    revert.push(Instruction::Replace { row: prior });
                }
            }
        }
        Ok(())
    }

    /// Non-preview data replacement, keeping the focused-column behavior of
    /// instruction application
    pub fn update_data(&mut self, data: DatasetSnapshot) -> Result<()> {
        if self.columns.len() < data.columns().len() {
            self.focused_column = last_new_column_id(&self.columns, data.columns());
        }
        self.columns = data.metadata.columns;
        self.store.set_rows(data.records)?;
        self.preview = false;
        Ok(())
    }

    /// Column ids/names with at least one cell matching the phrase
    /// (case-insensitive, `*` wildcard). Numeric and boolean columns are
    /// skipped when the phrase cannot possibly match their values.
    pub fn columns_containing(&self, phrase: &str) -> Result<Vec<ColumnRef>> {
        if phrase.is_empty() {
            return Ok(Vec::new());
        }

        let regex = Regex::new(&escape_regex_except_star(&phrase.to_lowercase()))?;
        let can_be_numeric = phrase.replace('*', "").trim().parse::<f64>().is_ok();
        let can_be_boolean = regex.is_match("true") || regex.is_match("false");

        let mut candidates: Vec<&ColumnMetadata> = self
            .columns
            .iter()
            .filter(|col| {
                if col.semantic_type.is_numeric() && !can_be_numeric {
                    return false;
                }
                if col.semantic_type == SemanticType::Boolean && !can_be_boolean {
                    return false;
                }
                true
            })
            .collect();

        let mut results = Vec::new();
        for row in self.store.rows() {
            if candidates.is_empty() {
                break;
            }
            candidates.retain(|col| match row.value(&col.id) {
                Some(value) if regex.is_match(&value.to_lowercase()) => {
                    results.push(ColumnRef {
                        id: col.id.clone(),
                        name: col.name.clone(),
                    });
                    false
                }
                _ => true,
            });
        }
        Ok(results)
    }
}

/// Last column id present in `new_columns` but not in `old_columns`
fn last_new_column_id(
    old_columns: &[ColumnMetadata],
    new_columns: &[ColumnMetadata],
) -> Option<String> {
    let known: HashSet<&str> = old_columns.iter().map(|c| c.id.as_str()).collect();
    new_columns
        .iter()
        .filter(|c| !known.contains(c.id.as_str()))
        .last()
        .map(|c| c.id.clone())
}
