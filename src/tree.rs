//! Filter tree (de)serialization: the backend query grammar AST

use crate::error::{PrepdiffError, Result};
use crate::filter::{Filter, FilterKind};
use crate::model::ColumnMetadata;
use serde::{Deserialize, Serialize};

/// One node of the backend filter grammar. Leaves serialize to
/// `{"contains": {"field": ..., "value": ...}}` style objects; the only
/// internal node is a binary `and`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterTree {
    Contains {
        field: String,
        value: String,
    },
    Eq {
        field: String,
        value: String,
    },
    Range {
        field: String,
        start: String,
        end: String,
    },
    Invalid {
        field: String,
    },
    Empty {
        field: String,
    },
    Valid {
        field: String,
    },
    And(Box<FilterTree>, Box<FilterTree>),
}

/// Wire wrapper around the tree. An empty filter list serializes to `{}`
/// with no `filter` key at all, which is distinct from an absent payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FilterEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterTree>,
}

/// Fold a filter list into the envelope. Filters combine left to right into
/// nested binary `and` nodes, preserving insertion order: the first two
/// filters pair up first, each later filter wraps the accumulated tree as the
/// left child of a new `and`.
pub fn to_tree(filters: &[Filter]) -> FilterEnvelope {
    let mut accumulated: Option<FilterTree> = None;
    for filter in filters {
        let leaf = filter_to_leaf(filter);
        accumulated = Some(match accumulated {
            Some(tree) => FilterTree::And(Box::new(tree), Box::new(leaf)),
            None => leaf,
        });
    }
    FilterEnvelope {
        filter: accumulated,
    }
}

/// Rebuild the filter list from an envelope.
///
/// Returns `None` when the envelope carries no tree (no filters were ever
/// serialized), as opposed to `Some` of an empty list. Reconstructed filters
/// are read-only; the column display name is resolved against `columns` and
/// left unset when the column no longer exists.
pub fn from_tree(
    envelope: &FilterEnvelope,
    columns: &[ColumnMetadata],
) -> Result<Option<Vec<Filter>>> {
    match &envelope.filter {
        None => Ok(None),
        Some(tree) => {
            let mut filters = Vec::new();
            collect_filters(tree, columns, &mut filters)?;
            Ok(Some(filters))
        }
    }
}

fn collect_filters(
    tree: &FilterTree,
    columns: &[ColumnMetadata],
    out: &mut Vec<Filter>,
) -> Result<()> {
    if let FilterTree::And(left, right) = tree {
        collect_filters(left, columns, out)?;
        collect_filters(right, columns, out)?;
        return Ok(());
    }
    out.push(leaf_to_filter(tree, columns)?);
    Ok(())
}

fn filter_to_leaf(filter: &Filter) -> FilterTree {
    let field = filter.col_id.clone();
    match &filter.kind {
        FilterKind::Contains { phrase, .. } => FilterTree::Contains {
            field,
            value: phrase.clone(),
        },
        FilterKind::Exact { phrase, .. } => FilterTree::Eq {
            field,
            value: phrase.clone(),
        },
        FilterKind::InsideRange { interval } => FilterTree::Range {
            field,
            start: stringify_bound(interval[0]),
            end: stringify_bound(interval[1]),
        },
        FilterKind::InvalidRecords => FilterTree::Invalid { field },
        FilterKind::EmptyRecords => FilterTree::Empty { field },
        FilterKind::ValidRecords => FilterTree::Valid { field },
    }
}

fn leaf_to_filter(leaf: &FilterTree, columns: &[ColumnMetadata]) -> Result<Filter> {
    let (field, kind) = match leaf {
        FilterTree::Contains { field, value } => (
            field,
            FilterKind::Contains {
                phrase: value.clone(),
                case_sensitive: false,
            },
        ),
        FilterTree::Eq { field, value } => (
            field,
            FilterKind::Exact {
                phrase: value.clone(),
                case_sensitive: false,
            },
        ),
        FilterTree::Range { field, start, end } => (
            field,
            FilterKind::InsideRange {
                interval: [parse_bound(start)?, parse_bound(end)?],
            },
        ),
        FilterTree::Invalid { field } => (field, FilterKind::InvalidRecords),
        FilterTree::Empty { field } => (field, FilterKind::EmptyRecords),
        FilterTree::Valid { field } => (field, FilterKind::ValidRecords),
        FilterTree::And(..) => unreachable!("and nodes are handled by collect_filters"),
    };

    let col_name = columns.iter().find(|c| c.id == *field).map(|c| c.name.clone());
    let mut filter = Filter::new(kind, field.clone()).read_only();
    if let Some(name) = col_name {
        filter = filter.with_name(name);
    }
    Ok(filter)
}

/// Range bounds travel as strings in the tree grammar
fn stringify_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn parse_bound(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| PrepdiffError::invalid_filter(format!("Invalid range bound: {:?}", raw)))
}
