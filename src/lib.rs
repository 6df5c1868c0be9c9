//! DataView - Load-Once Dataset Cache with Indexed Views
//!
//! Serves labeled tabular datasets to many concurrent consumers without
//! copying them. A [`DatasetStore`] loads each named dataset from disk at
//! most once into a shared [`DatasetCache`]; consumers then take
//! zero-copy [`IndexedView`]s over the cached table, selecting, reordering
//! or repeating rows by position. Views are read-only: anything that needs
//! to change data works on a [`materialized`](IndexedView::materialize)
//! copy.
//!
//! ```no_run
//! use dataview::{DatasetCache, DatasetStore, ReadableTable, StoreConfig};
//! use std::sync::Arc;
//!
//! let store = DatasetStore::new(StoreConfig::from_env(), Arc::new(DatasetCache::new()));
//! let train = store.view_labeled("weather.arff", &[0, 1, 2, 3], -1)?;
//! let test = store.view("weather.arff", &[4])?;
//! assert!(Arc::ptr_eq(train.base(), test.base()));
//! println!("{} training rows, class {:?}", train.len(), train.class_attribute());
//! # Ok::<(), dataview::DatasetError>(())
//! ```

pub mod arff;
pub mod cache;
pub mod class_index;
pub mod column;
pub mod error;
pub mod helpers;
pub mod labels;
pub mod store;
pub mod table;
pub mod view;

pub use cache::DatasetCache;
pub use class_index::resolve_class_index;
pub use column::{Attribute, AttributeType, Column, Value};
pub use error::{DatasetError, Result};
pub use helpers::{check_index, check_indices, int_range, split};
pub use labels::{
    categorize, class_indices_to_names, count_match_predictions, label_dataset,
    prettify_class_indices, to_class_index_predictions, Prediction,
};
pub use store::{DatasetStore, StoreConfig, DATASET_PATH_VAR, DEFAULT_DATASET_ROOT};
pub use table::{MutableTable, ReadableTable, Row, Schema, SharedTable, Table, TableRowIterator};
pub use view::{Dataset, IndexedView};
