//! Core data model: rows, column metadata, dataset snapshots and edit instructions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Row-level diff marker set by the backend preview endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowDiff {
    New,
    Delete,
}

/// Per-cell diff marker set by the backend preview endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellDiff {
    New,
    Update,
    Delete,
}

/// A single grid row: an identity, optional diff markers and the cell values.
///
/// Rows are value snapshots. The engine never mutates a row it holds; edits
/// replace the whole row in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Stable row identity, unique within a snapshot and surviving
    /// reordering/filtering (distinct from the physical position)
    #[serde(rename = "tdpId")]
    pub id: i64,

    /// Row-level preview marker (`new` = inserted row, `delete` = soft delete)
    #[serde(
        rename = "__tdpRowDiff",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub row_diff: Option<RowDiff>,

    /// Per-column preview markers, keyed by column id
    #[serde(
        rename = "__tdpDiff",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub cell_diffs: IndexMap<String, CellDiff>,

    /// Cell values keyed by column id
    #[serde(flatten)]
    pub values: IndexMap<String, String>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            row_diff: None,
            cell_diffs: IndexMap::new(),
            values: IndexMap::new(),
        }
    }

    pub fn with_value(mut self, col_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(col_id.into(), value.into());
        self
    }

    pub fn with_row_diff(mut self, diff: RowDiff) -> Self {
        self.row_diff = Some(diff);
        self
    }

    pub fn with_cell_diff(mut self, col_id: impl Into<String>, diff: CellDiff) -> Self {
        self.cell_diffs.insert(col_id.into(), diff);
        self
    }

    /// Cell value for a column, `None` when the column is absent from the row
    /// (e.g. removed by a destructive preparation step)
    pub fn value(&self, col_id: &str) -> Option<&str> {
        self.values.get(col_id).map(|v| v.as_str())
    }

    /// True when the row carries any preview marker and needs an instruction
    pub fn has_diff(&self) -> bool {
        self.row_diff.is_some() || !self.cell_diffs.is_empty()
    }
}

/// Semantic column type as reported by the backend inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    #[default]
    String,
    Integer,
    Float,
    Double,
    Boolean,
    #[serde(other)]
    Other,
}

impl SemanticType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Double)
    }
}

/// Column quality descriptor: the literal values considered invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Quality {
    #[serde(rename = "invalidValues", default)]
    pub invalid_values: HashSet<String>,
}

/// Column metadata. Column order is significant for display only, never for
/// diff identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub quality: Quality,
}

impl ColumnMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            semantic_type: SemanticType::String,
            quality: Quality::default(),
        }
    }

    pub fn with_type(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = semantic_type;
        self
    }

    pub fn with_invalid_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quality.invalid_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Ordered column list, the `metadata` part of a snapshot payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DatasetMetadata {
    pub columns: Vec<ColumnMetadata>,
}

/// An ordered set of rows plus column metadata at one point in time.
/// Matches the backend payload shape `{records, metadata: {columns}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DatasetSnapshot {
    pub metadata: DatasetMetadata,
    pub records: Vec<Row>,
}

impl DatasetSnapshot {
    pub fn new(columns: Vec<ColumnMetadata>, records: Vec<Row>) -> Self {
        Self {
            metadata: DatasetMetadata { columns },
            records,
        }
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.metadata.columns
    }
}

/// A single row-level edit against the row store
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Insert `row` at the physical position `index`
    Insert { row: Row, index: usize },
    /// Replace the row identified by `row.id` with `row`
    Replace { row: Row },
    /// Remove the row identified by `row.id`
    Delete { row: Row },
}

/// An ordered sequence of edit instructions plus the column metadata to
/// install and the preview flag to set once applied
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionSet {
    pub instructions: Vec<Instruction>,
    pub metadata: DatasetMetadata,
    pub preview: bool,
}

impl InstructionSet {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
