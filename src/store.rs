//! Row store abstraction over the virtualized grid backing store

use crate::error::{PrepdiffError, Result};
use crate::model::Row;
use std::collections::HashMap;

/// Compiled row predicate. The store ANDs an ordered list of these to build
/// its visible-row view.
pub type RowPredicate = Box<dyn Fn(&Row) -> bool + Send + Sync>;

/// The mutation surface the diff/preview engine needs from a grid's backing
/// store. An in-memory implementation is provided for headless use and tests;
/// a real virtualized grid store satisfies the same contract.
///
/// `begin_batch`/`end_batch` bracket a group of mutations so a rendering
/// implementation refreshes once per instruction set, not once per row.
/// Callers must pair them.
pub trait RowStore {
    /// Insert `row` at physical position `index`. Fails when `index` is past
    /// the end or the row id already exists.
    fn insert_at(&mut self, index: usize, row: Row) -> Result<()>;

    /// Remove the row identified by `id`. Fails when the id is unknown.
    fn delete_by_id(&mut self, id: i64) -> Result<()>;

    /// Replace the row identified by `id` in place. Fails when the id is
    /// unknown.
    fn update_by_id(&mut self, id: i64, row: Row) -> Result<()>;

    /// Physical position of the row identified by `id`
    fn index_by_id(&self, id: i64) -> Option<usize>;

    fn get_by_id(&self, id: i64) -> Option<&Row>;

    fn begin_batch(&mut self);

    fn end_batch(&mut self);

    /// Replace the whole row list (the non-preview update path)
    fn set_rows(&mut self, rows: Vec<Row>) -> Result<()>;

    /// Install the ordered predicate list driving the visible-row view.
    /// Predicates combine with logical AND.
    fn set_filters(&mut self, predicates: Vec<RowPredicate>);

    /// All rows in physical order, ignoring filters
    fn rows(&self) -> &[Row];

    /// Rows passing every installed predicate, in physical order
    fn visible_rows(&self) -> Vec<&Row> {
        self.rows().iter().collect()
    }

    fn len(&self) -> usize {
        self.rows().len()
    }

    fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

/// In-memory row store: a row vector plus an id -> index map kept in sync on
/// every mutation
#[derive(Default)]
pub struct InMemoryRowStore {
    rows: Vec<Row>,
    index: HashMap<i64, usize>,
    predicates: Vec<RowPredicate>,
    batch_depth: usize,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Row>) -> Result<Self> {
        let mut store = Self::new();
        store.set_rows(rows)?;
        Ok(store)
    }

    /// Open batch nesting depth, zero outside any bracket
    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, row) in self.rows.iter().enumerate().skip(start) {
            self.index.insert(row.id, i);
        }
    }
}

impl RowStore for InMemoryRowStore {
    fn insert_at(&mut self, index: usize, row: Row) -> Result<()> {
        if index > self.rows.len() {
            return Err(PrepdiffError::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        if self.index.contains_key(&row.id) {
            return Err(PrepdiffError::invalid_input(format!(
                "Duplicate row id: {}",
                row.id
            )));
        }

        self.rows.insert(index, row);
        self.reindex_from(index);
        Ok(())
    }

    fn delete_by_id(&mut self, id: i64) -> Result<()> {
        let index = self
            .index
            .remove(&id)
            .ok_or(PrepdiffError::RowNotFound { id })?;
        self.rows.remove(index);
        self.reindex_from(index);
        Ok(())
    }

    fn update_by_id(&mut self, id: i64, row: Row) -> Result<()> {
        let index = *self
            .index
            .get(&id)
            .ok_or(PrepdiffError::RowNotFound { id })?;

        // the replacement may carry a different id (never the case during
        // previews, but the contract allows it)
        if row.id != id {
            if self.index.contains_key(&row.id) {
                return Err(PrepdiffError::invalid_input(format!(
                    "Duplicate row id: {}",
                    row.id
                )));
            }
            self.index.remove(&id);
            self.index.insert(row.id, index);
        }
        self.rows[index] = row;
        Ok(())
    }

    fn index_by_id(&self, id: i64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn get_by_id(&self, id: i64) -> Option<&Row> {
        self.index.get(&id).map(|&i| &self.rows[i])
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        debug_assert!(self.batch_depth > 0, "unbalanced end_batch");
        self.batch_depth = self.batch_depth.saturating_sub(1);
    }

    fn set_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if index.insert(row.id, i).is_some() {
                return Err(PrepdiffError::invalid_input(format!(
                    "Duplicate row id: {}",
                    row.id
                )));
            }
        }
        self.rows = rows;
        self.index = index;
        Ok(())
    }

    fn set_filters(&mut self, predicates: Vec<RowPredicate>) {
        self.predicates = predicates;
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn visible_rows(&self) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|row| self.predicates.iter().all(|p| p(row)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_ids(ids: &[i64]) -> InMemoryRowStore {
        let rows = ids
            .iter()
            .map(|&id| Row::new(id).with_value("0000", format!("row-{}", id)))
            .collect();
        InMemoryRowStore::with_rows(rows).unwrap()
    }

    fn physical_ids(store: &InMemoryRowStore) -> Vec<i64> {
        store.rows().iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_insert_shifts_following_rows() {
        let mut store = store_with_ids(&[0, 1, 3]);
        store.insert_at(2, Row::new(2)).unwrap();

        assert_eq!(physical_ids(&store), vec![0, 1, 2, 3]);
        assert_eq!(store.index_by_id(3), Some(3));
        assert_eq!(store.index_by_id(2), Some(2));
    }

    #[test]
    fn test_insert_rejects_out_of_bounds_and_duplicates() {
        let mut store = store_with_ids(&[0, 1]);

        let err = store.insert_at(5, Row::new(2)).unwrap_err();
        assert!(matches!(
            err,
            PrepdiffError::IndexOutOfBounds { index: 5, len: 2 }
        ));

        let err = store.insert_at(0, Row::new(1)).unwrap_err();
        assert!(matches!(err, PrepdiffError::InvalidInput { .. }));
        assert_eq!(physical_ids(&store), vec![0, 1]);
    }

    #[test]
    fn test_delete_reindexes() {
        let mut store = store_with_ids(&[0, 1, 2, 3]);
        store.delete_by_id(1).unwrap();

        assert_eq!(physical_ids(&store), vec![0, 2, 3]);
        assert_eq!(store.index_by_id(1), None);
        assert_eq!(store.index_by_id(2), Some(1));

        let err = store.delete_by_id(9).unwrap_err();
        assert!(matches!(err, PrepdiffError::RowNotFound { id: 9 }));
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = store_with_ids(&[0, 1]);
        let replacement = Row::new(1).with_value("0000", "changed");
        store.update_by_id(1, replacement).unwrap();

        assert_eq!(store.get_by_id(1).unwrap().value("0000"), Some("changed"));
        assert_eq!(store.index_by_id(1), Some(1));

        let err = store.update_by_id(7, Row::new(7)).unwrap_err();
        assert!(matches!(err, PrepdiffError::RowNotFound { id: 7 }));
    }

    #[test]
    fn test_batch_bracket_depth() {
        let mut store = store_with_ids(&[0]);
        assert_eq!(store.batch_depth(), 0);
        store.begin_batch();
        assert_eq!(store.batch_depth(), 1);
        store.end_batch();
        assert_eq!(store.batch_depth(), 0);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let rows = vec![
            Row::new(0).with_value("0000", "Jimmy").with_value("0001", "10"),
            Row::new(1).with_value("0000", "Jimmy").with_value("0001", "99"),
            Row::new(2).with_value("0000", "Toto").with_value("0001", "10"),
        ];
        let mut store = InMemoryRowStore::with_rows(rows).unwrap();

        store.set_filters(vec![
            Box::new(|row: &Row| row.value("0000") == Some("Jimmy")),
            Box::new(|row: &Row| row.value("0001") == Some("10")),
        ]);
        let visible: Vec<i64> = store.visible_rows().iter().map(|r| r.id).collect();
        assert_eq!(visible, vec![0]);

        store.set_filters(Vec::new());
        assert_eq!(store.visible_rows().len(), 3);
    }

    #[test]
    fn test_set_rows_rejects_duplicate_ids() {
        let result = InMemoryRowStore::with_rows(vec![Row::new(0), Row::new(0)]);
        assert!(matches!(result, Err(PrepdiffError::InvalidInput { .. })));
    }
}
