//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::TailKind;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of torn entries discarded at the tail (0 or 1)
    pub entries_corrupted: u64,

    /// Last valid LSN (0 when nothing was recovered)
    pub last_lsn: u64,

    /// Whether an invalid tail was found (and, for `recover`, cut off)
    pub was_truncated: bool,

    /// Bytes past the last valid entry
    pub bytes_discarded: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries in log order
    /// 2. Stop at a truncated or torn final entry
    /// 3. Truncate the file to the valid prefix
    /// 4. Return the entries in order
    ///
    /// A missing file recovers nothing. Corruption in the middle of the log
    /// is an error.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::default()));
        }

        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;

            tracing::warn!(
                path = %path.display(),
                valid_len,
                bytes_discarded = result.bytes_discarded,
                "Discarded incomplete WAL tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry()? {
            entries.push(entry);
        }

        let tail = reader.tail();
        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            entries_corrupted: u64::from(tail == Some(TailKind::Torn)),
            last_lsn: entries.last().map_or(0, |e| e.lsn),
            was_truncated: tail.is_some(),
            bytes_discarded: reader.discarded_bytes(),
        };

        Ok((entries, result, reader.valid_len()))
    }
}
