//! Bidirectional value <-> small integer ID mapping

use crate::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;

/// Dense mapping between dimension values and 2-byte IDs.
///
/// IDs are handed out in first-seen order starting at 1. Inserting a value
/// that is already present returns its existing ID.
#[derive(Debug, Clone)]
pub struct IdMap<K> {
    ids: HashMap<K, i16>,
    /// values[id - 1] is the value with that ID
    values: Vec<K>,
}

impl<K: Eq + Hash + Clone> IdMap<K> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Return the ID for `value`, assigning the next one if unseen.
    pub fn intern(&mut self, value: &K) -> Result<i16> {
        if let Some(id) = self.ids.get(value) {
            return Ok(*id);
        }
        let id = i16::try_from(self.values.len() + 1).map_err(|_| {
            Error::InvalidSchema(format!(
                "dimension has more than {} distinct values",
                i16::MAX
            ))
        })?;
        self.ids.insert(value.clone(), id);
        self.values.push(value.clone());
        Ok(id)
    }

    pub fn id_of(&self, value: &K) -> Option<i16> {
        self.ids.get(value).copied()
    }

    pub fn value_of(&self, id: i16) -> Option<&K> {
        if id < 1 {
            return None;
        }
        self.values.get(id as usize - 1)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (id, value) pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (i16, &K)> {
        self.values
            .iter()
            .enumerate()
            .map(|(idx, value)| (idx as i16 + 1, value))
    }
}

impl<K: Eq + Hash + Clone> Default for IdMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
