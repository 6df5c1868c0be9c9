//! Tables and the read/write capability traits.
//!
//! A [`Table`] is a relation name, an ordered list of typed columns and an
//! optional class column. Read access goes through [`ReadableTable`], which
//! both tables and indexed views implement; structural changes go through
//! [`MutableTable`], which only owned tables implement.
//!
//! # Examples
//!
//! ```
//! use dataview::{Attribute, MutableTable, ReadableTable, Row, Schema, Table, Value};
//!
//! let schema = Schema::new(vec![
//!     Attribute::numeric("temperature"),
//!     Attribute::nominal("play", vec!["yes", "no"]),
//! ]).unwrap();
//!
//! let mut table = Table::new("weather", schema);
//! table.append_row(Row::new(vec![Value::Numeric(85.0), Value::Nominal(1)])).unwrap();
//! table.set_class_index(Some(1)).unwrap();
//!
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.get_value(0, "temperature").unwrap().as_f64(), Some(85.0));
//! assert_eq!(table.class_attribute().unwrap().name(), "play");
//! ```

use crate::column::{Attribute, AttributeType, Column, Value};
use crate::error::{DatasetError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// A table shared between the cache, views and collaborators.
pub type SharedTable = Arc<RwLock<Table>>;

/// Ordered attribute declarations with unique names.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    /// Creates a schema, rejecting duplicate attribute names.
    pub fn new(attributes: Vec<Attribute>) -> Result<Self> {
        let mut seen = HashSet::new();
        for attr in &attributes {
            if !seen.insert(attr.name()) {
                return Err(DatasetError::invalid_table(format!(
                    "Duplicate attribute name '{}'",
                    attr.name()
                )));
            }
        }
        Ok(Schema { attributes })
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name() == name)
    }
}

/// One row of values, in attribute order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// Read-only access to a table-shaped dataset.
///
/// Everything here is a query; nothing can change row content, the
/// attribute set or attribute order. Views over shared tables implement
/// only this trait.
pub trait ReadableTable {
    fn relation_name(&self) -> String;

    fn num_attributes(&self) -> usize;

    fn attribute(&self, index: usize) -> Result<Attribute>;

    /// Number of rows.
    fn len(&self) -> usize;

    fn row(&self, index: usize) -> Result<Row>;

    fn value(&self, row: usize, column: usize) -> Result<Value>;

    fn class_index(&self) -> Option<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn attributes(&self) -> Vec<Attribute> {
        (0..self.num_attributes())
            .filter_map(|i| self.attribute(i).ok())
            .collect()
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes().iter().position(|a| a.name() == name)
    }

    fn class_attribute(&self) -> Option<Attribute> {
        self.class_index().and_then(|i| self.attribute(i).ok())
    }

    /// Number of labels of a nominal class, 1 for any other class type,
    /// 0 when no class column is set.
    fn num_classes(&self) -> usize {
        match self.class_attribute() {
            Some(attr) => match attr.kind() {
                AttributeType::Nominal(labels) => labels.len(),
                _ => 1,
            },
            None => 0,
        }
    }

    fn iter_rows(&self) -> TableRowIterator<'_, Self>
    where
        Self: Sized,
    {
        TableRowIterator {
            table: self,
            index: 0,
        }
    }

    /// All values of one column as numbers. Nominal values become their
    /// label index; missing and string values become NaN.
    fn column_f64s(&self, column: usize) -> Result<Vec<f64>> {
        if column >= self.num_attributes() {
            return Err(DatasetError::out_of_range(column, self.num_attributes()));
        }
        (0..self.len())
            .map(|row| -> Result<f64> { Ok(self.value(row, column)?.to_f64().unwrap_or(f64::NAN)) })
            .collect()
    }

    /// Sum of all numeric values in a column. Missing values are skipped.
    fn sum(&self, column: &str) -> Result<f64> {
        let col = column_position(self, column)?;
        let mut total = 0.0;
        for row in 0..self.len() {
            if let Some(num) = self.value(row, col)?.as_f64() {
                total += num;
            }
        }
        Ok(total)
    }

    fn count_non_missing(&self, column: &str) -> Result<usize> {
        let col = column_position(self, column)?;
        let mut count = 0;
        for row in 0..self.len() {
            if !self.value(row, col)?.is_missing() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Mean of the numeric values in a column, None if there are none.
    fn mean(&self, column: &str) -> Result<Option<f64>> {
        let col = column_position(self, column)?;
        let mut sum = 0.0;
        let mut count = 0;
        for row in 0..self.len() {
            if let Some(num) = self.value(row, col)?.as_f64() {
                sum += num;
                count += 1;
            }
        }
        if count > 0 {
            Ok(Some(sum / count as f64))
        } else {
            Ok(None)
        }
    }

    fn min(&self, column: &str) -> Result<Option<f64>> {
        let col = column_position(self, column)?;
        let mut min_val: Option<f64> = None;
        for row in 0..self.len() {
            if let Some(num) = self.value(row, col)?.as_f64() {
                min_val = Some(min_val.map_or(num, |m| m.min(num)));
            }
        }
        Ok(min_val)
    }

    fn max(&self, column: &str) -> Result<Option<f64>> {
        let col = column_position(self, column)?;
        let mut max_val: Option<f64> = None;
        for row in 0..self.len() {
            if let Some(num) = self.value(row, col)?.as_f64() {
                max_val = Some(max_val.map_or(num, |m| m.max(num)));
            }
        }
        Ok(max_val)
    }

    /// Export rows as a pretty-printed JSON array of objects keyed by
    /// attribute name. Nominal values are written as their label.
    fn to_json(&self) -> Result<String> {
        let attributes = self.attributes();
        let mut rows = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            let row = self.row(index)?;
            let obj: serde_json::Map<String, serde_json::Value> = attributes
                .iter()
                .zip(row.values())
                .map(|(attr, value)| {
                    let json_val = match value {
                        Value::Numeric(f) => serde_json::Number::from_f64(*f)
                            .map(serde_json::Value::Number)
                            .unwrap_or(serde_json::Value::Null),
                        Value::Nominal(_) => serde_json::Value::String(attr.display_value(value)),
                        Value::Text(s) => serde_json::Value::String(s.clone()),
                        Value::Missing => serde_json::Value::Null,
                    };
                    (attr.name().to_string(), json_val)
                })
                .collect();
            rows.push(serde_json::Value::Object(obj));
        }

        serde_json::to_string_pretty(&rows)
            .map_err(|e| DatasetError::invalid_table(format!("JSON serialization error: {}", e)))
    }
}

fn column_position<T: ReadableTable + ?Sized>(table: &T, column: &str) -> Result<usize> {
    table
        .attribute_index(column)
        .ok_or_else(|| DatasetError::invalid_table(format!("Column '{}' not found", column)))
}

/// Structural and content mutation. Only owned tables implement this.
pub trait MutableTable: ReadableTable {
    fn append_row(&mut self, row: Row) -> Result<()>;

    fn insert_row(&mut self, index: usize, row: Row) -> Result<()>;

    fn delete_row(&mut self, index: usize) -> Result<Row>;

    /// Returns the replaced value.
    fn set_value(&mut self, row: usize, column: usize, value: Value) -> Result<Value>;

    fn swap_rows(&mut self, i: usize, j: usize) -> Result<()>;

    /// Insert a new attribute at `position`; existing rows get a missing value.
    fn add_attribute(&mut self, attribute: Attribute, position: usize) -> Result<()>;

    fn delete_attribute(&mut self, position: usize) -> Result<Attribute>;

    fn rename_attribute(&mut self, position: usize, name: &str) -> Result<()>;

    /// Swap in a new attribute declaration; all its values become missing.
    fn replace_attribute(&mut self, position: usize, attribute: Attribute) -> Result<()>;

    fn set_class_index(&mut self, index: Option<usize>) -> Result<()>;

    fn set_relation_name(&mut self, name: &str);
}

/// Root table owning its data.
#[derive(Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    row_count: usize,
    class_index: Option<usize>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let columns = schema.attributes.into_iter().map(Column::new).collect();
        Table {
            name: name.into(),
            columns,
            row_count: 0,
            class_index: None,
        }
    }

    /// Build a table and fill it with `rows`. No row is kept if any is invalid.
    pub fn from_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let mut table = Table::new(name, schema);
        for (i, row) in rows.iter().enumerate() {
            table.check_row(row).map_err(|e| {
                DatasetError::invalid_table(format!("Row {}: {}", i, e))
            })?;
        }
        for row in rows {
            table.push_row_unchecked(row);
        }
        Ok(table)
    }

    /// Same relation name, attributes and class column, but no rows.
    pub fn empty_copy(&self) -> Table {
        Table {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.attribute().clone()))
                .collect(),
            row_count: 0,
            class_index: self.class_index,
        }
    }

    pub fn into_shared(self) -> SharedTable {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn schema(&self) -> Schema {
        Schema {
            attributes: self.columns.iter().map(|c| c.attribute().clone()).collect(),
        }
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<Value> {
        let col = column_position(self, column)?;
        self.columns[col].get(row).cloned()
    }

    fn check_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::invalid_table(format!(
                "Row has {} values but table '{}' has {} attributes",
                row.len(),
                self.name,
                self.columns.len()
            )));
        }
        for (col, value) in self.columns.iter().zip(row.values()) {
            col.attribute().validate(value)?;
        }
        Ok(())
    }

    /// Drop every row, keeping attributes and class column.
    pub fn clear_rows(&mut self) {
        for col in &mut self.columns {
            col.clear();
        }
        self.row_count = 0;
    }

    pub(crate) fn push_row_unchecked(&mut self, row: Row) {
        for (col, value) in self.columns.iter_mut().zip(row.into_values()) {
            col.push_unchecked(value);
        }
        self.row_count += 1;
    }

    fn check_row_index(&self, index: usize) -> Result<()> {
        if index >= self.row_count {
            return Err(DatasetError::out_of_range(index, self.row_count));
        }
        Ok(())
    }

    fn check_attribute_index(&self, index: usize) -> Result<()> {
        if index >= self.columns.len() {
            return Err(DatasetError::out_of_range(index, self.columns.len()));
        }
        Ok(())
    }

    fn check_unique_name(&self, name: &str, skip: Option<usize>) -> Result<()> {
        let clash = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, c)| Some(i) != skip && c.name() == name);
        if clash {
            return Err(DatasetError::invalid_table(format!(
                "Duplicate attribute name '{}'",
                name
            )));
        }
        Ok(())
    }
}

impl ReadableTable for Table {
    fn relation_name(&self) -> String {
        self.name.clone()
    }

    fn num_attributes(&self) -> usize {
        self.columns.len()
    }

    fn attribute(&self, index: usize) -> Result<Attribute> {
        self.columns
            .get(index)
            .map(|c| c.attribute().clone())
            .ok_or_else(|| DatasetError::out_of_range(index, self.columns.len()))
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.columns.iter().map(|c| c.attribute().clone()).collect()
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    fn len(&self) -> usize {
        self.row_count
    }

    fn row(&self, index: usize) -> Result<Row> {
        self.check_row_index(index)?;
        let values = self
            .columns
            .iter()
            .map(|c| c.get(index).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(values))
    }

    fn value(&self, row: usize, column: usize) -> Result<Value> {
        self.check_attribute_index(column)?;
        self.check_row_index(row)?;
        self.columns[column].get(row).cloned()
    }

    fn class_index(&self) -> Option<usize> {
        self.class_index
    }
}

impl MutableTable for Table {
    fn append_row(&mut self, row: Row) -> Result<()> {
        self.check_row(&row)?;
        self.push_row_unchecked(row);
        Ok(())
    }

    fn insert_row(&mut self, index: usize, row: Row) -> Result<()> {
        if index > self.row_count {
            return Err(DatasetError::out_of_range(index, self.row_count + 1));
        }
        self.check_row(&row)?;
        for (col, value) in self.columns.iter_mut().zip(row.into_values()) {
            col.insert_unchecked(index, value);
        }
        self.row_count += 1;
        Ok(())
    }

    fn delete_row(&mut self, index: usize) -> Result<Row> {
        self.check_row_index(index)?;
        let values = self.columns.iter_mut().map(|c| c.delete(index)).collect();
        self.row_count -= 1;
        Ok(Row::new(values))
    }

    fn set_value(&mut self, row: usize, column: usize, value: Value) -> Result<Value> {
        self.check_attribute_index(column)?;
        self.check_row_index(row)?;
        self.columns[column].set(row, value)
    }

    fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_row_index(i)?;
        self.check_row_index(j)?;
        for col in &mut self.columns {
            col.swap(i, j);
        }
        Ok(())
    }

    fn add_attribute(&mut self, attribute: Attribute, position: usize) -> Result<()> {
        if position > self.columns.len() {
            return Err(DatasetError::out_of_range(position, self.columns.len() + 1));
        }
        self.check_unique_name(attribute.name(), None)?;
        self.columns
            .insert(position, Column::missing(attribute, self.row_count));
        if let Some(class) = self.class_index {
            if class >= position {
                self.class_index = Some(class + 1);
            }
        }
        Ok(())
    }

    fn delete_attribute(&mut self, position: usize) -> Result<Attribute> {
        self.check_attribute_index(position)?;
        match self.class_index {
            Some(class) if class == position => {
                return Err(DatasetError::invalid_table(
                    "Cannot delete the class attribute; unset the class index first",
                ));
            }
            Some(class) if class > position => self.class_index = Some(class - 1),
            _ => {}
        }
        Ok(self.columns.remove(position).attribute().clone())
    }

    fn rename_attribute(&mut self, position: usize, name: &str) -> Result<()> {
        self.check_attribute_index(position)?;
        self.check_unique_name(name, Some(position))?;
        self.columns[position].attribute_mut().set_name(name.to_string());
        Ok(())
    }

    fn replace_attribute(&mut self, position: usize, attribute: Attribute) -> Result<()> {
        self.check_attribute_index(position)?;
        self.check_unique_name(attribute.name(), Some(position))?;
        self.columns[position] = Column::missing(attribute, self.row_count);
        Ok(())
    }

    fn set_class_index(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_attribute_index(i)?;
        }
        self.class_index = index;
        Ok(())
    }

    fn set_relation_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

/// Reading a shared table takes its read lock for the duration of each call.
impl ReadableTable for SharedTable {
    fn relation_name(&self) -> String {
        self.read().relation_name()
    }

    fn num_attributes(&self) -> usize {
        self.read().num_attributes()
    }

    fn attribute(&self, index: usize) -> Result<Attribute> {
        self.read().attribute(index)
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.read().attributes()
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.read().attribute_index(name)
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn row(&self, index: usize) -> Result<Row> {
        self.read().row(index)
    }

    fn value(&self, row: usize, column: usize) -> Result<Value> {
        self.read().value(row, column)
    }

    fn class_index(&self) -> Option<usize> {
        self.read().class_index()
    }
}

pub struct TableRowIterator<'a, T: ReadableTable + ?Sized> {
    table: &'a T,
    index: usize,
}

impl<'a, T: ReadableTable + ?Sized> Iterator for TableRowIterator<'a, T> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.len() {
            None
        } else {
            let result = self.table.row(self.index).ok();
            self.index += 1;
            result
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {}, class: {:?} }}",
            self.name,
            self.columns.len(),
            self.row_count,
            self.class_index
        )
    }
}
