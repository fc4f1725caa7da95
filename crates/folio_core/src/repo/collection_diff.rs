//! Minimal write sets for auxiliary collections.
//!
//! Tags and attributes are reconciled against their persisted state instead
//! of being rewritten wholesale, so untouched link rows keep their identity.

use std::collections::{BTreeMap, BTreeSet};

/// Rows to remove and rows to add to turn a persisted set into a desired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T: Ord> {
    pub to_delete: BTreeSet<T>,
    pub to_insert: BTreeSet<T>,
}

impl<T: Ord> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            to_delete: BTreeSet::new(),
            to_insert: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.to_delete.len() + self.to_insert.len()
    }

    /// Applies the diff to `set` in place.
    pub fn apply_to(&self, set: &mut BTreeSet<T>) {
        for value in &self.to_delete {
            set.remove(value);
        }
        set.extend(self.to_insert.iter().cloned());
    }
}

pub fn diff_sets<T: Ord + Clone>(persisted: &BTreeSet<T>, desired: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff {
        to_delete: persisted.difference(desired).cloned().collect(),
        to_insert: desired.difference(persisted).cloned().collect(),
    }
}

/// Keyed variant: keys to remove, keys to add, and keys whose value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDiff<K: Ord, V> {
    pub to_delete: BTreeSet<K>,
    pub to_insert: BTreeMap<K, V>,
    pub to_update: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for MapDiff<K, V> {
    fn default() -> Self {
        Self {
            to_delete: BTreeSet::new(),
            to_insert: BTreeMap::new(),
            to_update: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> MapDiff<K, V> {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty() && self.to_update.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.to_delete.len() + self.to_insert.len() + self.to_update.len()
    }

    pub fn apply_to(&self, map: &mut BTreeMap<K, V>) {
        for key in &self.to_delete {
            map.remove(key);
        }
        for (key, value) in self.to_insert.iter().chain(self.to_update.iter()) {
            map.insert(key.clone(), value.clone());
        }
    }
}

pub fn diff_maps<K, V>(persisted: &BTreeMap<K, V>, desired: &BTreeMap<K, V>) -> MapDiff<K, V>
where
    K: Ord + Clone,
    V: PartialEq + Clone,
{
    let mut diff = MapDiff::default();
    for key in persisted.keys() {
        if !desired.contains_key(key) {
            diff.to_delete.insert(key.clone());
        }
    }
    for (key, value) in desired {
        match persisted.get(key) {
            None => {
                diff.to_insert.insert(key.clone(), value.clone());
            }
            Some(current) if current != value => {
                diff.to_update.insert(key.clone(), value.clone());
            }
            Some(_) => {}
        }
    }
    diff
}
