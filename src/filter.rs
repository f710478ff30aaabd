//! Column filter model, predicate compiler and filter list management

use crate::error::Result;
use crate::model::ColumnMetadata;
use crate::store::{RowPredicate, RowStore};
use crate::text::{escape_newlines, escape_regex_except_star, format_thousands, unescape_newlines};
use regex::Regex;
use std::fmt;
use std::mem;

/// Callback invoked when a filter is removed from a list, so owners can undo
/// whatever the filter creation set up (e.g. a chart brush selection)
pub type RemoveCallback = Box<dyn Fn(&Filter) + Send + Sync>;

/// Filter variant and its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Substring match, case-insensitive unless `case_sensitive`; the phrase
    /// supports a single `*` wildcard standing for any characters
    Contains { phrase: String, case_sensitive: bool },
    /// Whole-value equality, case-insensitive unless `case_sensitive`
    Exact { phrase: String, case_sensitive: bool },
    /// Numeric half-open interval `[min, max)` on the parsed cell value
    InsideRange { interval: [f64; 2] },
    /// Cell value is one of the column's invalid values
    InvalidRecords,
    /// Cell value is the empty string
    EmptyRecords,
    /// Cell value is non-empty and not one of the column's invalid values
    ValidRecords,
}

impl FilterKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Contains { .. } => "contains",
            Self::Exact { .. } => "exact",
            Self::InsideRange { .. } => "inside_range",
            Self::InvalidRecords => "invalid_records",
            Self::EmptyRecords => "empty_records",
            Self::ValidRecords => "valid_records",
        }
    }
}

/// A user-created column filter: a kind plus the target column, display name,
/// editability and an optional removal callback
pub struct Filter {
    pub kind: FilterKind,
    pub col_id: String,
    /// Denormalized column display name, for UI chips only; unset when the
    /// column no longer exists
    pub col_name: Option<String>,
    /// Deserialized filters are read-only; only freshly created ones are
    /// editable
    pub editable: bool,
    on_remove: Option<RemoveCallback>,
}

impl Filter {
    pub fn new(kind: FilterKind, col_id: impl Into<String>) -> Self {
        Self {
            kind,
            col_id: col_id.into(),
            col_name: None,
            editable: true,
            on_remove: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.col_name = Some(name.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_remove_callback(mut self, callback: RemoveCallback) -> Self {
        self.on_remove = Some(callback);
        self
    }

    /// True when `other` targets the same column with the same filter type
    /// (arguments excluded)
    pub fn same_target(&self, other: &Filter) -> bool {
        self.col_id == other.col_id && mem::discriminant(&self.kind) == mem::discriminant(&other.kind)
    }

    /// Human-readable value for display chips
    pub fn display_value(&self) -> String {
        match &self.kind {
            FilterKind::Contains { phrase, .. } | FilterKind::Exact { phrase, .. } => {
                escape_newlines(phrase)
            }
            FilterKind::InsideRange { interval } => format!(
                "[{} .. {}[",
                format_thousands(interval[0]),
                format_thousands(interval[1])
            ),
            FilterKind::InvalidRecords => "invalid records".to_string(),
            FilterKind::EmptyRecords => "empty records".to_string(),
            FilterKind::ValidRecords => "valid records".to_string(),
        }
    }

    /// Compile the filter into a row predicate.
    ///
    /// `columns` supplies the quality metadata the invalid/valid variants
    /// close over. A column missing from the row at evaluation time is a
    /// normal condition (a destructive step may have removed it) and yields
    /// "no match", never an error.
    pub fn compile(&self, columns: &[ColumnMetadata]) -> Result<RowPredicate> {
        let col_id = self.col_id.clone();

        match &self.kind {
            FilterKind::Contains {
                phrase,
                case_sensitive,
            } => {
                let case_sensitive = *case_sensitive;
                // phrases arrive display-escaped, cell values carry literal
                // newlines
                let phrase = unescape_newlines(phrase);
                let pattern = if case_sensitive {
                    escape_regex_except_star(&phrase)
                } else {
                    escape_regex_except_star(&phrase.to_lowercase())
                };
                let regex = Regex::new(&pattern)?;
                Ok(Box::new(move |row| match row.value(&col_id) {
                    Some(value) if !value.is_empty() => {
                        if case_sensitive {
                            regex.is_match(value)
                        } else {
                            regex.is_match(&value.to_lowercase())
                        }
                    }
                    _ => false,
                }))
            }

            FilterKind::Exact {
                phrase,
                case_sensitive,
            } => {
                let case_sensitive = *case_sensitive;
                let expected = if case_sensitive {
                    unescape_newlines(phrase)
                } else {
                    unescape_newlines(phrase).to_uppercase()
                };
                Ok(Box::new(move |row| match row.value(&col_id) {
                    Some(value) if !value.is_empty() => {
                        if case_sensitive {
                            value == expected
                        } else {
                            value.to_uppercase() == expected
                        }
                    }
                    _ => false,
                }))
            }

            FilterKind::InsideRange { interval } => {
                let [min, max] = *interval;
                Ok(Box::new(move |row| {
                    let Some(value) = row.value(&col_id) else {
                        return false;
                    };
                    match value.trim().parse::<f64>() {
                        Ok(number) => number >= min && number < max,
                        Err(_) => false,
                    }
                }))
            }

            FilterKind::InvalidRecords => {
                let invalid_values = column_invalid_values(columns, &col_id);
                Ok(Box::new(move |row| match row.value(&col_id) {
                    Some(value) => invalid_values.contains(value),
                    None => false,
                }))
            }

            FilterKind::EmptyRecords => Ok(Box::new(move |row| row.value(&col_id) == Some(""))),

            FilterKind::ValidRecords => {
                let invalid_values = column_invalid_values(columns, &col_id);
                Ok(Box::new(move |row| match row.value(&col_id) {
                    Some(value) if !value.is_empty() => !invalid_values.contains(value),
                    _ => false,
                }))
            }
        }
    }

    fn fire_remove(&self) {
        if let Some(callback) = &self.on_remove {
            callback(self);
        }
    }
}

fn column_invalid_values(
    columns: &[ColumnMetadata],
    col_id: &str,
) -> std::collections::HashSet<String> {
    columns
        .iter()
        .find(|c| c.id == col_id)
        .map(|c| c.quality.invalid_values.clone())
        .unwrap_or_default()
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("kind", &self.kind)
            .field("col_id", &self.col_id)
            .field("col_name", &self.col_name)
            .field("editable", &self.editable)
            .field("on_remove", &self.on_remove.as_ref().map(|_| "..."))
            .finish()
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        // removal callbacks are not part of filter identity
        self.kind == other.kind
            && self.col_id == other.col_id
            && self.col_name == other.col_name
            && self.editable == other.editable
    }
}

/// Ordered filter list with implicit AND semantics
#[derive(Debug, Default)]
pub struct FilterList {
    filters: Vec<Filter>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Add a filter. A second filter on the same column with the same type
    /// updates the existing one's arguments; adding an identical filter
    /// removes it instead (toggle).
    pub fn add(&mut self, filter: Filter) {
        match self.filters.iter().position(|f| f.same_target(&filter)) {
            Some(pos) if self.filters[pos].kind == filter.kind => {
                let existing = self.filters.remove(pos);
                existing.fire_remove();
            }
            Some(pos) => {
                self.filters[pos].kind = filter.kind;
            }
            None => self.filters.push(filter),
        }
    }

    /// Remove the filter targeting `col_id` with the given type name,
    /// invoking its removal callback
    pub fn remove(&mut self, col_id: &str, type_name: &str) -> bool {
        match self
            .filters
            .iter()
            .position(|f| f.col_id == col_id && f.kind.type_name() == type_name)
        {
            Some(pos) => {
                let removed = self.filters.remove(pos);
                removed.fire_remove();
                true
            }
            None => false,
        }
    }

    /// Remove every filter, invoking removal callbacks
    pub fn clear(&mut self) {
        for filter in self.filters.drain(..) {
            filter.fire_remove();
        }
    }

    /// Compile every filter, in order
    pub fn compile(&self, columns: &[ColumnMetadata]) -> Result<Vec<RowPredicate>> {
        self.filters.iter().map(|f| f.compile(columns)).collect()
    }

    /// Compile and install the predicates on a row store
    pub fn apply_to_store<S: RowStore>(
        &self,
        store: &mut S,
        columns: &[ColumnMetadata],
    ) -> Result<()> {
        store.set_filters(self.compile(columns)?);
        Ok(())
    }
}

impl From<Vec<Filter>> for FilterList {
    fn from(filters: Vec<Filter>) -> Self {
        Self { filters }
    }
}
