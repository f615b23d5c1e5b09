//! MemTable implementation
//!
//! BTreeMap-based memtable. Mutation goes through `&mut self`; callers
//! provide the locking.

use std::collections::btree_map;
use std::collections::BTreeMap;

use super::Entry;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    /// Sorted key → value-or-tombstone
    data: BTreeMap<Vec<u8>, Entry>,

    /// Approximate payload size in bytes (keys + live values)
    approximate_bytes: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for a key, tombstones included
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.data.get(key)
    }

    /// Put a key-value pair, returning the new entry count
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, Entry::Value(value))
    }

    /// Delete a key by inserting a tombstone, returning the new entry count
    ///
    /// Works for keys that were never written: the tombstone still has to
    /// shadow whatever older segments hold.
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(key, Entry::Tombstone)
    }

    fn insert(&mut self, key: Vec<u8>, entry: Entry) -> usize {
        let added = Self::entry_bytes(&key, &entry);
        let key_len = key.len();

        match self.data.insert(key, entry) {
            Some(old) => {
                // Key bytes were already counted
                self.approximate_bytes =
                    self.approximate_bytes + added - key_len - Self::value_bytes(&old);
            }
            None => self.approximate_bytes += added,
        }

        self.data.len()
    }

    fn value_bytes(entry: &Entry) -> usize {
        entry.value().map_or(0, <[u8]>::len)
    }

    fn entry_bytes(key: &[u8], entry: &Entry) -> usize {
        key.len() + Self::value_bytes(entry)
    }

    /// Number of keys held, tombstones included
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Alias of [`MemTable::size`]
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    /// Approximate payload size in bytes
    pub fn approximate_bytes(&self) -> usize {
        self.approximate_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in sorted key order
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Entry> {
        self.data.iter()
    }

    /// Borrow the whole mapping (used to encode a segment)
    pub fn entries(&self) -> &BTreeMap<Vec<u8>, Entry> {
        &self.data
    }

    /// Take every entry out, leaving the table empty
    pub fn drain(&mut self) -> BTreeMap<Vec<u8>, Entry> {
        self.approximate_bytes = 0;
        std::mem::take(&mut self.data)
    }
}
