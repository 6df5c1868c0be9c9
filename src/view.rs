//! Indexed views over shared tables.
//!
//! An [`IndexedView`] is a read-only projection of a base table through an
//! ordered list of row positions. Positions may repeat and may come in any
//! order, so a single loaded dataset can back many shuffled or split
//! subsets without copying a row.
//!
//! A view never wraps another view. [`IndexedView::new`] only accepts a
//! [`SharedTable`]; selecting from a view goes through
//! [`IndexedView::flatten`], which composes the two index lists against the
//! original base. Code holding a dynamic [`Dataset`] gets the same rule as a
//! runtime check in [`Dataset::make_view`].
//!
//! The class column is a property of the base table: setting it through a
//! view is visible through every other view and holder of that base.
//!
//! # Examples
//!
//! ```
//! use dataview::{Attribute, IndexedView, ReadableTable, Row, Schema, Table, Value};
//!
//! let schema = Schema::new(vec![Attribute::numeric("x")]).unwrap();
//! let rows = (0..5).map(|i| Row::new(vec![Value::Numeric(i as f64)])).collect();
//! let base = Table::from_rows("numbers", schema, rows).unwrap().into_shared();
//!
//! let view = IndexedView::new(base.clone(), "numbers", &[4, 2, 2]).unwrap();
//! assert_eq!(view.len(), 3);
//! assert_eq!(view.value(0, 0).unwrap(), Value::Numeric(4.0));
//!
//! // Selecting from a view flattens onto the original base.
//! let inner = view.flatten(&[2, 0]).unwrap();
//! assert_eq!(inner.indices(), &[2, 4]);
//! ```

use crate::class_index::resolve_class_index;
use crate::column::{Attribute, Value};
use crate::error::{DatasetError, Result};
use crate::helpers::{check_index, check_indices, int_range};
use crate::table::{MutableTable, ReadableTable, Row, SharedTable, Table};
use std::fmt;

/// Zero-copy, index-mapped projection of a shared table.
///
/// Cloning a view copies its index list, so swaps and deletes on the clone
/// do not affect the original; both keep sharing the same base.
#[derive(Clone)]
pub struct IndexedView {
    base: SharedTable,
    reference: String,
    view_to_base: Vec<usize>,
}

impl IndexedView {
    /// Creates a view over `base` exposing the rows at `indices`, in order.
    ///
    /// `reference` names the dataset the base was loaded from and shows up
    /// in error messages.
    pub fn new(base: SharedTable, reference: impl Into<String>, indices: &[i64]) -> Result<Self> {
        let len = base.read().len();
        let view_to_base = check_indices(indices, len)?;
        Ok(IndexedView {
            base,
            reference: reference.into(),
            view_to_base,
        })
    }

    /// Wraps every row of `base` in its original order.
    pub fn full(base: SharedTable, reference: impl Into<String>) -> Self {
        let len = base.read().len();
        IndexedView {
            base,
            reference: reference.into(),
            view_to_base: int_range(0, len),
        }
    }

    /// Resolve `requested` against the column count and make it the class
    /// column of this view and its base.
    pub fn with_class_index(self, requested: i64) -> Result<Self> {
        self.set_class_index(requested)?;
        Ok(self)
    }

    /// Like [`with_class_index`](Self::with_class_index) but in place.
    /// Returns the resolved column index.
    pub fn set_class_index(&self, requested: i64) -> Result<usize> {
        let mut base = self.base.write();
        let resolved = resolve_class_index(requested, base.num_attributes())?;
        base.set_class_index(Some(resolved))?;
        Ok(resolved)
    }

    /// Compose `indices` (positions in this view) with this view's own
    /// index list, giving positions in the base table.
    pub fn flatten_indices(&self, indices: &[i64]) -> Result<Vec<usize>> {
        Ok(check_indices(indices, self.view_to_base.len())?
            .into_iter()
            .map(|i| self.view_to_base[i])
            .collect())
    }

    /// A new view over this view's base exposing `self.row(i)` for every `i`
    /// in `indices`.
    pub fn flatten(&self, indices: &[i64]) -> Result<IndexedView> {
        Ok(IndexedView {
            base: self.base.clone(),
            reference: self.reference.clone(),
            view_to_base: self.flatten_indices(indices)?,
        })
    }

    pub fn base(&self) -> &SharedTable {
        &self.base
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Base-table positions this view exposes, in view order.
    pub fn indices(&self) -> &[usize] {
        &self.view_to_base
    }

    /// `"<reference>:<row count>"`
    pub fn to_reference_string(&self) -> String {
        format!("{}:{}", self.reference, self.view_to_base.len())
    }

    /// Position in the base table of view row `index`.
    pub fn base_index(&self, index: usize) -> Result<usize> {
        self.view_to_base
            .get(index)
            .copied()
            .ok_or_else(|| DatasetError::out_of_range(index, self.view_to_base.len()))
    }

    pub fn first(&self) -> Result<Row> {
        self.row(0)
    }

    pub fn last(&self) -> Result<Row> {
        match self.view_to_base.len() {
            0 => Err(DatasetError::out_of_range(0, 0)),
            n => self.row(n - 1),
        }
    }

    // ==================== Index-list mutators ====================
    //
    // These reorder or shrink the view's own positions. The base table is
    // never touched.

    pub fn swap(&mut self, i: usize, j: usize) -> Result<()> {
        let len = self.view_to_base.len();
        if i >= len {
            return Err(DatasetError::out_of_range(i, len));
        }
        if j >= len {
            return Err(DatasetError::out_of_range(j, len));
        }
        self.view_to_base.swap(i, j);
        Ok(())
    }

    pub fn delete(&mut self, position: usize) -> Result<()> {
        self.base_index(position)?;
        self.view_to_base.remove(position);
        Ok(())
    }

    /// Drop view row `position` and return the row it exposed.
    pub fn remove(&mut self, position: usize) -> Result<Row> {
        let row = self.row(position)?;
        self.view_to_base.remove(position);
        Ok(row)
    }

    pub fn clear(&mut self) {
        self.view_to_base.clear();
    }

    /// Replace the exposed positions; validated against the base row count.
    pub fn set_indices(&mut self, indices: &[i64]) -> Result<()> {
        let len = self.base.read().len();
        self.view_to_base = check_indices(indices, len)?;
        Ok(())
    }

    /// Expose one more base row at the end of the view.
    pub fn add_index(&mut self, index: i64) -> Result<()> {
        let len = self.base.read().len();
        self.view_to_base.push(check_index(index, len)?);
        Ok(())
    }

    /// Copy the rows this view currently exposes, in view order, into a
    /// new table that shares nothing with the base. The class column is
    /// preserved. The copy is not cached or persisted.
    pub fn materialize(&self) -> Result<Table> {
        let base = self.base.read();
        let mut table = base.empty_copy();
        for &index in &self.view_to_base {
            table.push_row_unchecked(base.row(index)?);
        }
        Ok(table)
    }

    fn immutable(&self) -> DatasetError {
        DatasetError::ImmutableView {
            reference: self.reference.clone(),
            rows: self.view_to_base.len(),
        }
    }
}

impl ReadableTable for IndexedView {
    fn relation_name(&self) -> String {
        self.base.read().relation_name()
    }

    fn num_attributes(&self) -> usize {
        self.base.read().num_attributes()
    }

    fn attribute(&self, index: usize) -> Result<Attribute> {
        self.base.read().attribute(index)
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.base.read().attributes()
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.base.read().attribute_index(name)
    }

    fn len(&self) -> usize {
        self.view_to_base.len()
    }

    fn row(&self, index: usize) -> Result<Row> {
        let base_index = self.base_index(index)?;
        self.base.read().row(base_index)
    }

    fn value(&self, row: usize, column: usize) -> Result<Value> {
        let base_index = self.base_index(row)?;
        self.base.read().value(base_index, column)
    }

    fn class_index(&self) -> Option<usize> {
        self.base.read().class_index()
    }
}

impl fmt::Debug for IndexedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IndexedView {{ reference: '{}', rows: {}, base_rows: {} }}",
            self.reference,
            self.view_to_base.len(),
            self.base.read().len()
        )
    }
}

/// A dataset handed to a collaborator: either a whole shared table or an
/// indexed view over one.
///
/// Both variants answer the same read queries and accept the same mutator
/// calls. On a view, mutators that would change the base fail with
/// [`DatasetError::ImmutableView`] and change nothing, while
/// [`delete_row`](Dataset::delete_row), [`swap_rows`](Dataset::swap_rows)
/// and [`clear`](Dataset::clear) act on the view's own index list.
#[derive(Clone, Debug)]
pub enum Dataset {
    Table(SharedTable),
    View(IndexedView),
}

impl Dataset {
    pub fn is_view(&self) -> bool {
        matches!(self, Dataset::View(_))
    }

    pub fn as_view(&self) -> Option<&IndexedView> {
        match self {
            Dataset::View(view) => Some(view),
            Dataset::Table(_) => None,
        }
    }

    /// The table all rows ultimately come from.
    pub fn base(&self) -> &SharedTable {
        match self {
            Dataset::Table(table) => table,
            Dataset::View(view) => view.base(),
        }
    }

    /// Use this dataset as the base of a new view.
    ///
    /// Fails with [`DatasetError::NestedView`] when this is already a view;
    /// use [`flatten`](Self::flatten) for that case.
    pub fn make_view(&self, reference: impl Into<String>, indices: &[i64]) -> Result<IndexedView> {
        match self {
            Dataset::Table(table) => IndexedView::new(table.clone(), reference, indices),
            Dataset::View(view) => Err(DatasetError::NestedView {
                reference: view.reference().to_string(),
            }),
        }
    }

    /// Select `indices` (positions in this dataset) as a view over the
    /// underlying base table. Works for both variants.
    pub fn flatten(&self, indices: &[i64]) -> Result<IndexedView> {
        match self {
            Dataset::Table(table) => {
                let reference = table.read().relation_name();
                IndexedView::new(table.clone(), reference, indices)
            }
            Dataset::View(view) => view.flatten(indices),
        }
    }

    /// Resolve and set the class column; on a view this sets the base's.
    pub fn set_class_index(&self, requested: i64) -> Result<usize> {
        match self {
            Dataset::Table(table) => {
                let mut table = table.write();
                let resolved = resolve_class_index(requested, table.num_attributes())?;
                table.set_class_index(Some(resolved))?;
                Ok(resolved)
            }
            Dataset::View(view) => view.set_class_index(requested),
        }
    }

    /// An independent, freely mutable copy of the rows this dataset exposes.
    pub fn materialize(&self) -> Result<Table> {
        match self {
            Dataset::Table(table) => Ok(table.read().clone()),
            Dataset::View(view) => view.materialize(),
        }
    }

    pub fn append_row(&self, row: Row) -> Result<()> {
        self.base_mut(|table| table.append_row(row))
    }

    pub fn insert_row(&self, index: usize, row: Row) -> Result<()> {
        self.base_mut(|table| table.insert_row(index, row))
    }

    pub fn set_value(&self, row: usize, column: usize, value: Value) -> Result<Value> {
        self.base_mut(|table| table.set_value(row, column, value))
    }

    pub fn add_attribute(&self, attribute: Attribute, position: usize) -> Result<()> {
        self.base_mut(|table| table.add_attribute(attribute, position))
    }

    pub fn delete_attribute(&self, position: usize) -> Result<Attribute> {
        self.base_mut(|table| table.delete_attribute(position))
    }

    pub fn rename_attribute(&self, position: usize, name: &str) -> Result<()> {
        self.base_mut(|table| table.rename_attribute(position, name))
    }

    pub fn replace_attribute(&self, position: usize, attribute: Attribute) -> Result<()> {
        self.base_mut(|table| table.replace_attribute(position, attribute))
    }

    pub fn delete_row(&mut self, index: usize) -> Result<Row> {
        match self {
            Dataset::Table(table) => table.write().delete_row(index),
            Dataset::View(view) => view.remove(index),
        }
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        match self {
            Dataset::Table(table) => table.write().swap_rows(i, j),
            Dataset::View(view) => view.swap(i, j),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Dataset::Table(table) => table.write().clear_rows(),
            Dataset::View(view) => view.clear(),
        }
    }

    fn base_mut<T>(&self, op: impl FnOnce(&mut Table) -> Result<T>) -> Result<T> {
        match self {
            Dataset::Table(table) => op(&mut table.write()),
            Dataset::View(view) => Err(view.immutable()),
        }
    }
}

impl ReadableTable for Dataset {
    fn relation_name(&self) -> String {
        match self {
            Dataset::Table(table) => table.relation_name(),
            Dataset::View(view) => view.relation_name(),
        }
    }

    fn num_attributes(&self) -> usize {
        match self {
            Dataset::Table(table) => table.num_attributes(),
            Dataset::View(view) => view.num_attributes(),
        }
    }

    fn attribute(&self, index: usize) -> Result<Attribute> {
        match self {
            Dataset::Table(table) => table.attribute(index),
            Dataset::View(view) => view.attribute(index),
        }
    }

    fn len(&self) -> usize {
        match self {
            Dataset::Table(table) => table.len(),
            Dataset::View(view) => view.len(),
        }
    }

    fn row(&self, index: usize) -> Result<Row> {
        match self {
            Dataset::Table(table) => table.row(index),
            Dataset::View(view) => view.row(index),
        }
    }

    fn value(&self, row: usize, column: usize) -> Result<Value> {
        match self {
            Dataset::Table(table) => table.value(row, column),
            Dataset::View(view) => view.value(row, column),
        }
    }

    fn class_index(&self) -> Option<usize> {
        self.base().class_index()
    }
}

impl From<SharedTable> for Dataset {
    fn from(table: SharedTable) -> Self {
        Dataset::Table(table)
    }
}

impl From<Table> for Dataset {
    fn from(table: Table) -> Self {
        Dataset::Table(table.into_shared())
    }
}

impl From<IndexedView> for Dataset {
    fn from(view: IndexedView) -> Self {
        Dataset::View(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::weather;

    fn weather_view(indices: &[i64]) -> (SharedTable, IndexedView) {
        let base = weather().into_shared();
        let view = IndexedView::new(base.clone(), "weather.arff", indices).unwrap();
        (base, view)
    }

    #[test]
    fn test_view_rows_map_to_base() {
        let (base, view) = weather_view(&[1, 0, 4, 3]);
        assert_eq!(view.len(), 4);
        assert_eq!(view.row(0).unwrap(), base.row(1).unwrap());
        assert_eq!(view.value(1, 1).unwrap(), Value::Numeric(85.0));
        assert_eq!(view.value(2, 1).unwrap(), Value::Numeric(68.0));
        assert_eq!(view.value(3, 1).unwrap(), Value::Numeric(70.0));
        assert!(view.row(4).is_err());
    }

    #[test]
    fn test_weather_scenario() {
        let (base, mut v1) = weather_view(&[1, 0, 4, 3]);
        assert_eq!(v1.row(0).unwrap(), base.row(1).unwrap());

        v1.swap(0, 1).unwrap();
        assert_eq!(v1.row(0).unwrap(), base.row(0).unwrap());

        v1.delete(0).unwrap();
        assert_eq!(v1.len(), 3);
        assert_eq!(base.len(), 5);
    }

    #[test]
    fn test_construction_checks_bounds() {
        let base = weather().into_shared();
        for bad in [&[5i64][..], &[-1], &[0, 1, 99]] {
            let err = IndexedView::new(base.clone(), "weather.arff", bad).unwrap_err();
            assert!(matches!(err, DatasetError::IndexOutOfRange { .. }));
        }
        let empty = IndexedView::new(base, "weather.arff", &[]).unwrap();
        assert!(empty.is_empty());
        assert!(empty.last().is_err());
    }

    #[test]
    fn test_duplicates_and_order_are_kept() {
        let (base, view) = weather_view(&[2, 2, 0]);
        assert_eq!(view.row(0).unwrap(), base.row(2).unwrap());
        assert_eq!(view.row(1).unwrap(), base.row(2).unwrap());
        assert_eq!(view.last().unwrap(), base.row(0).unwrap());
    }

    #[test]
    fn test_flatten_law() {
        let outer: &[i64] = &[4, 3, 1, 1, 0];
        let inner: &[i64] = &[2, 0, 4, 3];
        let (base, view) = weather_view(outer);

        let flat = view.flatten(inner).unwrap();
        let direct: Vec<i64> = inner.iter().map(|&i| outer[i as usize]).collect();
        let expected = IndexedView::new(base.clone(), "weather.arff", &direct).unwrap();

        assert_eq!(flat.len(), expected.len());
        for i in 0..flat.len() {
            assert_eq!(flat.row(i).unwrap(), expected.row(i).unwrap());
        }
        assert!(std::sync::Arc::ptr_eq(flat.base(), &base));
    }

    #[test]
    fn test_flatten_checks_against_view_length() {
        let (_, view) = weather_view(&[0, 1]);
        // 3 is a valid base row but not a valid position in the view.
        assert!(matches!(
            view.flatten(&[3]),
            Err(DatasetError::IndexOutOfRange { index: 3, len: 2 })
        ));
    }

    #[test]
    fn test_nested_view_rejected() {
        let (base, v1) = weather_view(&[1, 0, 4, 3]);
        let dataset = Dataset::from(v1);

        let err = dataset.make_view("weather.arff", &[0, 1]).unwrap_err();
        assert!(matches!(err, DatasetError::NestedView { .. }));

        let flat = dataset.flatten(&[0, 1]).unwrap();
        assert_eq!(flat.indices(), &[1, 0]);
        assert!(std::sync::Arc::ptr_eq(flat.base(), &base));
    }

    #[test]
    fn test_structural_mutation_through_view_fails() {
        let (base, v1) = weather_view(&[1, 0, 4, 3]);
        let before_rows: Vec<Row> = base.iter_rows().collect();
        let dataset = Dataset::View(v1);

        let row = base.row(0).unwrap();
        let attempts = vec![
            dataset.append_row(row.clone()).map(|_| ()),
            dataset.insert_row(0, row).map(|_| ()),
            dataset.rename_attribute(0, "renamed").map(|_| ()),
            dataset.delete_attribute(0).map(|_| ()),
            dataset.add_attribute(Attribute::numeric("extra"), 0).map(|_| ()),
            dataset.set_value(0, 1, Value::Numeric(0.0)).map(|_| ()),
            dataset
                .replace_attribute(1, Attribute::numeric("temp"))
                .map(|_| ()),
        ];
        for attempt in attempts {
            match attempt {
                Err(DatasetError::ImmutableView { reference, rows }) => {
                    assert_eq!(reference, "weather.arff");
                    assert_eq!(rows, 4);
                }
                other => panic!("expected ImmutableView, got {:?}", other),
            }
        }

        assert_eq!(dataset.as_view().unwrap().indices(), &[1, 0, 4, 3]);
        assert_eq!(base.iter_rows().collect::<Vec<_>>(), before_rows);
        assert_eq!(base.attribute(0).unwrap().name(), "outlook");
        assert_eq!(base.num_attributes(), 5);
    }

    #[test]
    fn test_dataset_view_row_ops_touch_only_indices() {
        let (base, v1) = weather_view(&[1, 0, 4, 3]);
        let mut dataset = Dataset::View(v1);

        dataset.swap_rows(0, 3).unwrap();
        let removed = dataset.delete_row(0).unwrap();
        assert_eq!(removed, base.row(3).unwrap());
        assert_eq!(dataset.len(), 3);

        dataset.clear();
        assert!(dataset.is_empty());
        assert_eq!(base.len(), 5);
    }

    #[test]
    fn test_dataset_table_is_mutable() {
        let mut dataset = Dataset::from(weather());
        dataset.rename_attribute(1, "temp").unwrap();
        assert_eq!(dataset.attribute_index("temp"), Some(1));
        dataset.delete_row(0).unwrap();
        assert_eq!(dataset.len(), 4);

        dataset.clear();
        assert!(dataset.is_empty());
        assert_eq!(dataset.num_attributes(), 5);
    }

    #[test]
    fn test_view_inherits_base_class() {
        let base = weather().into_shared();
        base.write().set_class_index(Some(4)).unwrap();
        let view = IndexedView::new(base, "weather.arff", &[0, 1]).unwrap();
        assert_eq!(view.class_index(), Some(4));
        assert_eq!(view.num_classes(), 2);
    }

    #[test]
    fn test_class_index_is_shared_between_views() {
        // Setting the class column through one view is visible through
        // every other view over the same base, and through the base itself.
        let base = weather().into_shared();
        let v1 = IndexedView::new(base.clone(), "weather.arff", &[0, 1]).unwrap();
        let v2 = IndexedView::new(base.clone(), "weather.arff", &[2, 3]).unwrap();
        assert_eq!(v2.class_index(), None);

        let v1 = v1.with_class_index(-1).unwrap();
        assert_eq!(v1.class_index(), Some(4));
        assert_eq!(v2.class_index(), Some(4));
        assert_eq!(base.class_index(), Some(4));

        v2.set_class_index(-7).unwrap();
        assert_eq!(v1.class_index(), Some(3));
    }

    #[test]
    fn test_materialize_is_independent() {
        let base = weather().into_shared();
        base.write().set_class_index(Some(4)).unwrap();
        let view = IndexedView::new(base.clone(), "weather.arff", &[3, 1, 1]).unwrap();

        let mut copy = view.materialize().unwrap();
        assert_eq!(copy.len(), 3);
        assert_eq!(copy.class_index(), Some(4));
        assert_eq!(copy.row(0).unwrap(), base.row(3).unwrap());
        assert_eq!(copy.row(2).unwrap(), base.row(1).unwrap());

        copy.delete_attribute(0).unwrap();
        copy.append_row(copy.row(0).unwrap()).unwrap();
        assert_eq!(base.num_attributes(), 5);
        assert_eq!(base.len(), 5);
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_index_list_setters_validate_against_base() {
        let (_, mut view) = weather_view(&[0]);
        view.add_index(4).unwrap();
        assert_eq!(view.indices(), &[0, 4]);
        assert!(view.add_index(5).is_err());

        view.set_indices(&[3, 2, 1]).unwrap();
        assert_eq!(view.to_reference_string(), "weather.arff:3");
        assert!(view.set_indices(&[-2]).is_err());
        assert_eq!(view.indices(), &[3, 2, 1]);
    }

    #[test]
    fn test_clone_has_independent_indices() {
        let (base, view) = weather_view(&[0, 1, 2]);
        let mut copy = view.clone();
        copy.delete(0).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(copy.len(), 2);
        assert!(std::sync::Arc::ptr_eq(copy.base(), &base));
    }

    #[test]
    fn test_full_view_and_aggregations() {
        let base = weather().into_shared();
        let full = IndexedView::full(base.clone(), "weather.arff");
        assert_eq!(full.len(), 5);
        assert_eq!(full.sum("temperature").unwrap(), base.sum("temperature").unwrap());

        let subset = full.flatten(&[0, 1]).unwrap();
        assert_eq!(subset.mean("temperature").unwrap(), Some(82.5));
        assert_eq!(subset.column_f64s(4).unwrap(), vec![1.0, 1.0]);
    }
}
