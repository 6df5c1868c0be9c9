//! Class labels: assigning them to a table and scoring predictions
//! against them.

use crate::column::{Attribute, Value};
use crate::error::{DatasetError, Result};
use crate::table::{MutableTable, ReadableTable, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Distinct labels in ascending order.
///
/// ```
/// use dataview::categorize;
///
/// assert_eq!(categorize(&["b", "a", "b"]), vec!["a", "b"]);
/// ```
pub fn categorize<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .map(|l| l.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Replace the class attribute of `table` with a nominal attribute named
/// `class` over [`categorize(labels)`](categorize), then give row `i` the
/// label `labels[i]`.
pub fn label_dataset<S: AsRef<str>>(table: &mut Table, labels: &[S]) -> Result<()> {
    if table.len() != labels.len() {
        return Err(DatasetError::invalid_table(format!(
            "Size mismatch, labels: {}, data set: {}",
            labels.len(),
            table.len()
        )));
    }
    let class_index = table
        .class_index()
        .ok_or_else(|| DatasetError::invalid_table("Data set has no class attribute defined"))?;

    let class = Attribute::nominal("class", categorize(labels));
    let values: Vec<Value> = labels
        .iter()
        .map(|l| class.value_of_label(l.as_ref()).unwrap_or(Value::Missing))
        .collect();

    table.replace_attribute(class_index, class)?;
    for (row, value) in values.into_iter().enumerate() {
        table.set_value(row, class_index, value)?;
    }
    Ok(())
}

/// Map class indices back to their category names.
pub fn class_indices_to_names(categories: &[String], indices: &[usize]) -> Result<Vec<String>> {
    indices
        .iter()
        .map(|&i| {
            categories
                .get(i)
                .cloned()
                .ok_or_else(|| DatasetError::out_of_range(i, categories.len()))
        })
        .collect()
}

/// `"Group i"` for every index, for clusterings without meaningful names.
pub fn prettify_class_indices(indices: &[usize]) -> Vec<String> {
    indices.iter().map(|i| format!("Group {}", i)).collect()
}

/// A prediction as a model reports it: a class index or a class label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Index(usize),
    Label(String),
}

/// Class indices for `predictions`. Labels the class attribute does not
/// declare map to None.
pub fn to_class_index_predictions(
    predictions: &[Prediction],
    class_attribute: &Attribute,
) -> Vec<Option<usize>> {
    predictions
        .iter()
        .map(|p| match p {
            Prediction::Index(i) => Some(*i),
            Prediction::Label(label) => class_attribute.index_of_label(label),
        })
        .collect()
}

/// How many of `predictions` equal the class value of the matching row
/// of `table`.
pub fn count_match_predictions<T: ReadableTable + ?Sized>(
    predictions: &[Prediction],
    table: &T,
) -> Result<usize> {
    if predictions.len() != table.len() {
        return Err(DatasetError::invalid_table(format!(
            "Dimension mismatch: {} predictions, {} test set size",
            predictions.len(),
            table.len()
        )));
    }
    let (class_index, class_attribute) = match (table.class_index(), table.class_attribute()) {
        (Some(index), Some(attribute)) => (index, attribute),
        _ => {
            return Err(DatasetError::invalid_table(
                "Test set has no class attribute defined",
            ))
        }
    };

    let predicted = to_class_index_predictions(predictions, &class_attribute);
    let mut correct = 0;
    for (row, prediction) in predicted.into_iter().enumerate() {
        let actual = table.value(row, class_index)?.to_f64().map(|v| v as usize);
        if prediction.is_some() && prediction == actual {
            correct += 1;
        }
    }
    Ok(correct)
}
