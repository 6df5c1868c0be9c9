//! Named datasets on disk, loaded through the shared cache.
//!
//! A [`DatasetStore`] turns logical names like `"weather.arff"` or
//! `"cached/3f2a1.arff"` into paths under its root directory, decodes them
//! at most once through its [`DatasetCache`], and writes new named tables
//! back to disk.

use crate::arff;
use crate::cache::DatasetCache;
use crate::class_index::resolve_class_index;
use crate::error::{DatasetError, Result};
use crate::table::{MutableTable, ReadableTable, SharedTable};
use crate::view::IndexedView;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Environment variable naming the dataset root directory.
pub const DATASET_PATH_VAR: &str = "DATASET_PATH";

/// Root used when [`DATASET_PATH_VAR`] is not set.
pub const DEFAULT_DATASET_ROOT: &str = "../datasets/";

/// Where datasets live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            root: PathBuf::from(DEFAULT_DATASET_ROOT),
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StoreConfig { root: root.into() }
    }

    /// Read the root from `DATASET_PATH`, falling back to
    /// [`DEFAULT_DATASET_ROOT`].
    ///
    /// A root that does not exist is logged as an error but still
    /// returned; loads will then fail with [`DatasetError::NotFound`].
    pub fn from_env() -> Self {
        Self::from_var(std::env::var_os(DATASET_PATH_VAR))
    }

    fn from_var(value: Option<OsString>) -> Self {
        let config = match value {
            Some(root) if !root.is_empty() => {
                log::info!("Data set root from {}: {:?}", DATASET_PATH_VAR, root);
                StoreConfig::new(root)
            }
            _ => {
                log::info!(
                    "Environment variable '{}' isn't defined. Using {} as default path to data sets",
                    DATASET_PATH_VAR,
                    DEFAULT_DATASET_ROOT
                );
                StoreConfig::default()
            }
        };
        if !config.root.is_dir() {
            log::error!("Data set folder {} doesn't exist", config.root.display());
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    config: StoreConfig,
    cache: Arc<DatasetCache>,
}

impl DatasetStore {
    pub fn new(config: StoreConfig, cache: Arc<DatasetCache>) -> Self {
        DatasetStore { config, cache }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Path of the file backing `name`.
    ///
    /// Names are relative to the root and may not leave it: absolute
    /// names and `..` components fail with [`DatasetError::Config`].
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let inside_root = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside_root {
            return Err(DatasetError::Config {
                path: relative.to_path_buf(),
                reason: format!("data set names must stay under {}", self.config.root.display()),
            });
        }
        Ok(self.config.root.join(relative))
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// The shared table for `name`, decoded from disk on first access.
    ///
    /// Every call for the same name returns the same [`SharedTable`] until
    /// a [`store`](Self::store) under that name replaces it.
    pub fn load(&self, name: &str) -> Result<SharedTable> {
        self.cache.get_or_load(name, || {
            let path = self.resolve(name)?;
            if !path.is_file() {
                return Err(DatasetError::NotFound {
                    name: name.to_string(),
                    path,
                });
            }
            let table = arff::decode(BufReader::new(File::open(&path)?))?;
            log::info!(
                "Loaded data set '{}' from {} ({} rows)",
                name,
                path.display(),
                table.len()
            );
            Ok(table)
        })
    }

    /// [`load`](Self::load), then make the resolved `class_index` the class
    /// column of the shared table. `-1` selects the last attribute.
    pub fn load_labeled(&self, name: &str, class_index: i64) -> Result<SharedTable> {
        let shared = self.load(name)?;
        {
            let mut table = shared.write();
            let resolved = resolve_class_index(class_index, table.num_attributes())?;
            table.set_class_index(Some(resolved))?;
        }
        Ok(shared)
    }

    /// Every row of `name`, as a view referencing the cached table.
    pub fn view_all(&self, name: &str) -> Result<IndexedView> {
        Ok(IndexedView::full(self.load(name)?, name))
    }

    /// The rows of `name` at `indices`, as a view referencing the cached table.
    pub fn view(&self, name: &str, indices: &[i64]) -> Result<IndexedView> {
        IndexedView::new(self.load(name)?, name, indices)
    }

    pub fn view_labeled(&self, name: &str, indices: &[i64], class_index: i64) -> Result<IndexedView> {
        self.view(name, indices)?.with_class_index(class_index)
    }

    /// Write `table` to the file for `name` and make it the cached entry.
    ///
    /// Missing parent directories are created. The table is written to a
    /// temporary file next to the target and renamed over it only once
    /// fully written, so a failed store leaves the previous file intact.
    /// Later loads of `name` return this exact instance.
    pub fn store(&self, table: SharedTable, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        self.cache.insert_with(name, table, |table| {
            let parent = prepare_parent(&path)?;
            let mut staged = NamedTempFile::new_in(&parent)?;
            arff::encode(&*table.read(), BufWriter::new(staged.as_file_mut()))?;
            staged.persist(&path).map_err(|e| DatasetError::Io(e.error))?;
            log::debug!("Wrote data set '{}' to {}", name, path.display());
            Ok(())
        })
    }

    /// Store `table` under a fresh `cached/<id>.arff` name and return it.
    pub fn store_unique(&self, table: SharedTable) -> Result<String> {
        let name = loop {
            let id = Uuid::new_v4().simple().to_string();
            let candidate = format!("cached/{}.arff", &id[..5]);
            if !self.is_cached(&candidate) && !self.resolve(&candidate)?.exists() {
                break candidate;
            }
        };
        self.store(table, &name)?;
        Ok(name)
    }
}

/// Create the directories above `path` and return the innermost one.
/// Fails if any of them exists but is not a directory.
fn prepare_parent(path: &Path) -> Result<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(PathBuf::from(".")),
    };
    if let Some(blocker) = parent.ancestors().find(|p| p.exists() && !p.is_dir()) {
        return Err(DatasetError::Config {
            path: path.to_path_buf(),
            reason: format!("{} is not a directory", blocker.display()),
        });
    }
    fs::create_dir_all(parent)?;
    Ok(parent.to_path_buf())
}
