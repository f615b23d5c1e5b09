//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};

use super::{Operation, WalEntry};

/// Writes entries to the WAL file
///
/// Every append is synced before it returns; there is no buffered mode.
pub struct WalWriter {
    /// Log file, opened in append mode
    file: File,

    /// Path of the log file (needed to recreate it on reset)
    path: PathBuf,

    /// LSN assigned to the next appended entry
    next_lsn: u64,

    /// Bytes in the current log file
    len: u64,

    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// `next_lsn` continues numbering after whatever recovery found; pass 1
    /// for a fresh log.
    pub fn open(path: &Path, next_lsn: u64) -> Result<Self> {
        let file = Self::open_append(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file,
            path: path.to_path_buf(),
            next_lsn: next_lsn.max(1),
            len,
            poisoned: false,
        })
    }

    fn open_append(path: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        Ok(file)
    }

    /// Append an entry to the WAL and sync it to disk
    ///
    /// Returns the LSN assigned to the entry. The entry is durable once this
    /// returns `Ok`.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        if self.poisoned {
            return Err(StrataError::Storage(
                "WAL holds a partial entry that could not be removed".to_string(),
            ));
        }

        let lsn = self.next_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.write_synced(&bytes) {
            // Cut off whatever part of the frame reached the file, otherwise
            // the next append would land behind a bad frame
            if let Err(rollback) = self.file.set_len(self.len) {
                tracing::error!(error = %rollback, "Failed to roll back partial WAL append");
                self.poisoned = true;
            }
            return Err(e);
        }

        self.next_lsn += 1;
        self.len += bytes.len() as u64;

        Ok(lsn)
    }

    fn write_synced(&mut self, bytes: &[u8]) -> Result<()> {
        // One write per frame: a crash mid-append leaves a detectable tail
        self.file.write_all(bytes)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Replace the log with a fresh, empty file
    ///
    /// Only call once everything the log describes is durable elsewhere.
    pub fn reset(&mut self) -> Result<()> {
        let truncated = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        truncated.sync_all()?;
        drop(truncated);

        // Dropping the old handle closes it
        self.file = Self::open_append(&self.path)?;
        self.len = 0;
        self.poisoned = false;

        tracing::debug!(path = %self.path.display(), next_lsn = self.next_lsn, "WAL reset");
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(self) -> Result<()> {
        self.sync()
    }

    /// Get the LSN the next append will use
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Current log size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the log can no longer be appended to safely
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
