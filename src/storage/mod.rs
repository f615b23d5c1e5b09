//! Storage Module
//!
//! Persistent storage layer: immutable segment tables, one per flush.
//!
//! ## Responsibilities
//! - Persist flushed memtables atomically (temp file + rename)
//! - Point lookups across segments, newest first
//! - Rediscover segments on startup
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                    │
//! │   Magic: "STKV" (4) | Version: u16 (2) | Seq: u64 (8)│
//! ├──────────────────────────────────────────────────────┤
//! │ Mapping Frame                                        │
//! │   Len (4) | CRC32 (4) | HdrCRC (4) | bincode(mapping)│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Files are named `segment-<seq>.db`; the header repeats the sequence
//! number so a renamed file is detected as corrupt.

mod manager;
mod segment;

pub use manager::StorageManager;
pub use segment::{SegmentMeta, SegmentTable};

// =============================================================================
// Shared Constants
// =============================================================================

/// Magic bytes identifying a StrataKV segment file
pub(crate) const MAGIC: &[u8; 4] = b"STKV";

/// Current segment format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Seq (8) = 14 bytes
pub(crate) const HEADER_SIZE: usize = 14;
