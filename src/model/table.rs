//! Fixed-capacity tables with range-checked access and sparse serialization.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use log::debug;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::slot::Slot;

/// A table of exactly `N` entries.
///
/// Reads outside `0..N` return `None` rather than panicking; writes outside
/// the range are ignored. On disk only non-default entries are stored, keyed
/// by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T, const N: usize> {
    entries: Vec<T>,
}

impl<T: Default + Clone, const N: usize> Table<T, N> {
    pub fn new() -> Self {
        Self {
            entries: vec![T::default(); N],
        }
    }
}

impl<T, const N: usize> Table<T, N> {
    pub const LEN: usize = N;

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_slot(&self, slot: Slot) -> Option<&T> {
        slot.index().and_then(|i| self.get(i))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    /// Replace an entry. Returns `false` when the index is out of range.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }
}

impl<T: Default + Clone, const N: usize> Default for Table<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Serialize for Table<T, N>
where
    T: Serialize + Default + PartialEq,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let blank = T::default();
        let used: Vec<(usize, &T)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| **entry != blank)
            .collect();
        let mut map = serializer.serialize_map(Some(used.len()))?;
        for (index, entry) in used {
            map.serialize_entry(&index, entry)?;
        }
        map.end()
    }
}

struct TableVisitor<T, const N: usize>(PhantomData<T>);

impl<'de, T, const N: usize> Visitor<'de> for TableVisitor<T, N>
where
    T: Deserialize<'de> + Default + Clone,
{
    type Value = Table<T, N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of index to entry with indices below {N}")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = Table::new();
        while let Some((index, entry)) = access.next_entry::<i64, T>()? {
            let stored = usize::try_from(index)
                .map(|i| table.set(i, entry))
                .unwrap_or(false);
            if !stored {
                debug!("ignoring table entry at out-of-range index {index}");
            }
        }
        Ok(table)
    }
}

impl<'de, T, const N: usize> Deserialize<'de> for Table<T, N>
where
    T: Deserialize<'de> + Default + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor::<T, N>(PhantomData))
    }
}

/// Convert a sparse map into a table; used by tests and demo builders.
impl<T: Default + Clone, const N: usize> From<BTreeMap<usize, T>> for Table<T, N> {
    fn from(map: BTreeMap<usize, T>) -> Self {
        let mut table = Table::new();
        for (index, entry) in map {
            table.set(index, entry);
        }
        table
    }
}
