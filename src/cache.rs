//! Process-wide, load-once dataset cache.
//!
//! Maps a logical dataset name to the one shared table loaded for it. Each
//! name gets its own slot lock, so two threads asking for the same name
//! run the loader once between them while loads of different names proceed
//! in parallel. Entries are never evicted; memory grows with the number of
//! distinct names loaded over the life of the process.
//!
//! The cache is an ordinary value. Create one at startup, wrap it in an
//! [`Arc`] and hand it to every [`DatasetStore`](crate::DatasetStore) that
//! should share it; tests build a fresh one each.

use crate::error::Result;
use crate::table::{SharedTable, Table};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<Mutex<Option<SharedTable>>>;

#[derive(Default)]
pub struct DatasetCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, name: &str) -> Slot {
        self.slots
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Return the cached table for `name`, running `load` first if there is
    /// none yet.
    ///
    /// Concurrent callers for the same name wait for the first one's load
    /// and then share its result. A failed load caches nothing: the error
    /// goes to the caller that ran it and the next caller loads again.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<SharedTable>
    where
        F: FnOnce() -> Result<Table>,
    {
        let slot = self.slot(name);
        let mut entry = slot.lock();
        if let Some(table) = entry.as_ref() {
            return Ok(table.clone());
        }
        match load() {
            Ok(table) => {
                let shared = table.into_shared();
                *entry = Some(shared.clone());
                Ok(shared)
            }
            Err(e) => {
                drop(entry);
                self.discard_if_unused(name, &slot);
                log::debug!("Load of '{}' failed, nothing cached: {}", name, e);
                Err(e)
            }
        }
    }

    /// Make `table` the entry for `name`, running `persist` under the same
    /// slot lock so no load of that name can observe a half-written file.
    ///
    /// Nothing is cached if `persist` fails. Replacing an existing entry is
    /// logged as a warning; views over the old table keep working.
    pub fn insert_with<F>(&self, name: &str, table: SharedTable, persist: F) -> Result<()>
    where
        F: FnOnce(&SharedTable) -> Result<()>,
    {
        let slot = self.slot(name);
        let mut entry = slot.lock();
        if let Err(e) = persist(&table) {
            drop(entry);
            self.discard_if_unused(name, &slot);
            return Err(e);
        }
        if entry.is_some() {
            log::warn!("Replacing cached data set '{}'", name);
        } else {
            log::info!("Created named data set '{}'", name);
        }
        *entry = Some(table);
        Ok(())
    }

    /// Forget the slot for `name` if it is still empty and no other caller
    /// holds it. New slot handles are only handed out under the map lock,
    /// so the count cannot grow while it is held.
    fn discard_if_unused(&self, name: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        let ours = slots.get(name).map_or(false, |s| Arc::ptr_eq(s, slot));
        if ours && Arc::strong_count(slot) == 2 && slot.lock().is_none() {
            slots.remove(name);
        }
    }

    /// The cached table for `name`, without loading.
    pub fn get(&self, name: &str) -> Option<SharedTable> {
        let slot = self.slots.lock().get(name).cloned()?;
        let entry = slot.lock();
        entry.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of names with a loaded table.
    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names with a loaded table, sorted.
    pub fn names(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .lock()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();
        let mut names: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("slots", &self.slots.lock().len())
            .finish()
    }
}
