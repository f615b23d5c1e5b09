//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append log entries (synced) before any mutation is applied
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Entry 1                                             │
//! │ ┌─────────┬─────────┬────────────┬────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ HdrCRC (4) │ bincode(entry) │ │
//! │ └─────────┴─────────┴────────────┴────────────────┘ │
//! ├─────────────────────────────────────────────────────┤
//! │ Entry 2                                             │
//! │ ┌─────────┬─────────┬────────────┬────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ HdrCRC (4) │ bincode(entry) │ │
//! │ └─────────┴─────────┴────────────┴────────────────┘ │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Framing comes from [`crate::codec`]; the entry carries its own LSN.

/// File name of the log inside the data directory
pub const WAL_FILE_NAME: &str = "wal.log";

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{TailKind, WalIterator, WalReader};
pub use recovery::{WalRecovery, RecoveryResult};
