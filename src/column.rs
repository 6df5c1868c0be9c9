//! Attributes, cell values and columnar storage.
//!
//! An [`Attribute`] declares the name and type of one column. Nominal
//! attributes carry their enumerated labels in declaration order, and a
//! nominal [`Value`] stores the index of its label rather than the label
//! itself, so class values compare as plain indices.
//!
//! # Examples
//!
//! ```
//! use dataview::{Attribute, Value};
//!
//! let outlook = Attribute::nominal("outlook", vec!["sunny", "overcast", "rainy"]);
//! assert_eq!(outlook.value_of_label("rainy"), Some(Value::Nominal(2)));
//! assert_eq!(outlook.label(0), Some("sunny"));
//! ```

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute data types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Numeric,
    /// Categorical attribute with its legal labels in declaration order.
    Nominal(Vec<String>),
    String,
}

impl AttributeType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, AttributeType::Numeric)
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self, AttributeType::Nominal(_))
    }
}

/// A named, typed column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    kind: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Attribute {
            name: name.into(),
            kind,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Numeric)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn nominal<S: Into<String>>(name: impl Into<String>, labels: Vec<S>) -> Self {
        Self::new(
            name,
            AttributeType::Nominal(labels.into_iter().map(Into::into).collect()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AttributeType {
        &self.kind
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Declared labels of a nominal attribute; empty for other types.
    pub fn labels(&self) -> &[String] {
        match &self.kind {
            AttributeType::Nominal(labels) => labels,
            _ => &[],
        }
    }

    pub fn num_labels(&self) -> usize {
        self.labels().len()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels().get(index).map(String::as_str)
    }

    pub fn index_of_label(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|l| l == label)
    }

    /// Nominal value for `label`, or None if the label is not declared.
    pub fn value_of_label(&self, label: &str) -> Option<Value> {
        self.index_of_label(label).map(Value::Nominal)
    }

    /// Check that `value` fits this attribute's type.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let ok = match (value, &self.kind) {
            (Value::Missing, _) => true,
            (Value::Numeric(_), AttributeType::Numeric) => true,
            (Value::Text(_), AttributeType::String) => true,
            (Value::Nominal(idx), AttributeType::Nominal(labels)) => *idx < labels.len(),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(DatasetError::invalid_table(format!(
                "Value {:?} does not fit attribute '{}' ({:?})",
                value, self.name, self.kind
            )))
        }
    }

    /// Render a value the way a reader of this attribute expects to see it.
    /// Nominal values become their label.
    pub fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Nominal(idx) => self
                .label(*idx)
                .map(str::to_string)
                .unwrap_or_else(|| idx.to_string()),
            other => other.to_string(),
        }
    }
}

/// One cell of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Missing,
    Numeric(f64),
    /// Index into the attribute's declared labels.
    Nominal(usize),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_nominal(&self) -> Option<usize> {
        match self {
            Value::Nominal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view used by column statistics: numbers as-is, nominal
    /// values as their label index, everything else as None.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Nominal(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "?"),
            Value::Numeric(v) => write!(f, "{}", v),
            Value::Nominal(v) => write!(f, "#{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A column: one attribute plus its values, one per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    attribute: Attribute,
    values: Vec<Value>,
}

impl Column {
    pub fn new(attribute: Attribute) -> Self {
        Column {
            attribute,
            values: Vec::new(),
        }
    }

    /// Column of `len` missing values, used when an attribute is added to a
    /// table that already has rows.
    pub fn missing(attribute: Attribute, len: usize) -> Self {
        Column {
            attribute,
            values: vec![Value::Missing; len],
        }
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub(crate) fn attribute_mut(&mut self) -> &mut Attribute {
        &mut self.attribute
    }

    pub fn name(&self) -> &str {
        self.attribute.name()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| DatasetError::out_of_range(index, self.values.len()))
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<Value> {
        self.attribute.validate(&value)?;
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or_else(|| DatasetError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Values must already be validated by the caller.
    pub(crate) fn insert_unchecked(&mut self, index: usize, value: Value) {
        self.values.insert(index, value);
    }

    pub(crate) fn push_unchecked(&mut self, value: Value) {
        self.values.push(value);
    }

    pub(crate) fn delete(&mut self, index: usize) -> Value {
        self.values.remove(index)
    }

    pub(crate) fn swap(&mut self, i: usize, j: usize) {
        self.values.swap(i, j);
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_lookup() {
        let play = Attribute::nominal("play", vec!["yes", "no"]);
        assert_eq!(play.num_labels(), 2);
        assert_eq!(play.index_of_label("no"), Some(1));
        assert_eq!(play.value_of_label("maybe"), None);
        assert_eq!(play.display_value(&Value::Nominal(0)), "yes");
    }

    #[test]
    fn test_validate_rejects_mismatched_values() {
        let temp = Attribute::numeric("temperature");
        assert!(temp.validate(&Value::Numeric(85.0)).is_ok());
        assert!(temp.validate(&Value::Missing).is_ok());
        assert!(temp.validate(&Value::Text("hot".into())).is_err());

        let play = Attribute::nominal("play", vec!["yes", "no"]);
        assert!(play.validate(&Value::Nominal(1)).is_ok());
        assert!(play.validate(&Value::Nominal(2)).is_err());
    }

    #[test]
    fn test_column_set_returns_old_value() {
        let mut col = Column::missing(Attribute::numeric("x"), 2);
        let old = col.set(1, Value::Numeric(3.5)).unwrap();
        assert!(old.is_missing());
        assert_eq!(col.get(1).unwrap().as_f64(), Some(3.5));
        assert!(col.set(2, Value::Numeric(1.0)).is_err());
    }

    #[test]
    fn test_value_to_f64() {
        assert_eq!(Value::Numeric(2.5).to_f64(), Some(2.5));
        assert_eq!(Value::Nominal(3).to_f64(), Some(3.0));
        assert_eq!(Value::Text("a".into()).to_f64(), None);
        assert_eq!(Value::Missing.to_f64(), None);
    }
}
