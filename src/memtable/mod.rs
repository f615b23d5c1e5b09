//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Record deletes as tombstones so they shadow older segments
//! - Track entry count for flush triggers
//! - Ordered iteration for segment creation
//!
//! ## Data Structure Choice
//! A plain BTreeMap without its own lock:
//! - Ordered keys (segments are written in key order)
//! - The engine's RwLock already serializes writers against readers

mod table;

use serde::{Deserialize, Serialize};

pub use table::MemTable;

/// Value-or-tombstone stored in the MemTable and in segment tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl Entry {
    /// The live value, or None for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }
}
