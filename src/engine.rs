//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup
//! - Track the open/close lifecycle

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::memtable::MemTable;
use crate::storage::{SegmentMeta, StorageManager};
use crate::wal::{Operation, RecoveryResult, WalRecovery, WalWriter, WAL_FILE_NAME};

/// Lifecycle of an engine: `Closed → Opening → Open → Closing → Closed`
///
/// Only `Open` accepts reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// The main storage engine
///
/// ## Concurrency Model: one RwLock over all mutable state
///
/// - **Writes** (put/delete/flush/close): exclusive lock
///   - WAL append → MemTable → (maybe) segment flush → WAL reset
///   - A flush runs inline on the writer that crossed the threshold
///
/// - **Reads** (get): shared lock
///   - Never observe a half-drained MemTable or a segment list mid-append
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the write-ahead log
    wal_path: PathBuf,

    /// MemTable, segment list, WAL writer and lifecycle state
    inner: RwLock<EngineInner>,
}

struct EngineInner {
    state: EngineState,

    /// In-memory table for recent writes
    memtable: MemTable,

    /// Segment table list
    storage: StorageManager,

    /// Write-ahead log; `Some` exactly while the engine is usable
    wal: Option<WalWriter>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load existing segments (oldest first)
    /// 3. Replay the WAL into a fresh MemTable
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(WAL_FILE_NAME);
        tracing::debug!(data_dir = %config.data_dir.display(), "Opening engine");

        let mut inner = EngineInner {
            state: EngineState::Opening,
            memtable: MemTable::new(),
            storage: StorageManager::open(&config.data_dir)?,
            wal: None,
        };

        let recovery = inner.recover(&wal_path)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            segments = inner.storage.segment_count(),
            wal_entries = recovery.entries_recovered,
            last_lsn = recovery.last_lsn,
            wal_tail_discarded = recovery.was_truncated,
            "Engine open"
        );

        // A lower threshold than the previous run may leave the replayed
        // MemTable already over the limit
        if inner.memtable.size() >= config.memtable_flush_threshold {
            inner.flush()?;
        }

        inner.state = EngineState::Open;

        Ok(Self {
            config,
            wal_path,
            inner: RwLock::new(inner),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::new(path))
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. Segments (newest to oldest)
    ///
    /// The first layer holding the key decides; a tombstone there means
    /// `Ok(None)` even if older segments still hold a value.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let key = key.as_ref();
        let inner = self.inner.read();
        inner.ensure_open()?;

        let entry = inner
            .memtable
            .get(key)
            .or_else(|| inner.storage.get(key));

        Ok(entry.and_then(|e| e.value()).map(<[u8]>::to_vec))
    }

    /// Put a key-value pair
    ///
    /// Returns once the WAL entry is synced; the write survives a crash
    /// from then on.
    ///
    /// # Errors
    ///
    /// An error from the flush that may follow the WAL append does not undo
    /// the write: it is already durable and visible to `get`. Repeating the
    /// same `put` is harmless.
    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.write(Operation::Put {
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        })
    }

    /// Delete a key
    ///
    /// Deleting a key that was never written still records a tombstone.
    ///
    /// # Errors
    ///
    /// As with [`Engine::put`], a failed flush after the WAL append leaves
    /// the tombstone in place; retrying is harmless.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.write(Operation::Delete {
            key: key.as_ref().to_vec(),
        })
    }

    /// Steps:
    /// 1. Acquire write lock
    /// 2. Write to WAL (durability gate)
    /// 3. Apply to MemTable
    /// 4. Flush if the MemTable reached the threshold
    ///
    /// Past step 2 the operation is committed; a step 4 error is reported
    /// but nothing is rolled back.
    fn write(&self, operation: Operation) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;

        if let Err(e) = inner.wal_mut()?.append(operation.clone()) {
            if inner.wal.as_ref().is_some_and(WalWriter::is_poisoned) {
                tracing::error!(error = %e, "WAL left inconsistent by failed append, closing engine");
                inner.fail_closed();
            }
            return Err(e);
        }

        let entry_count = inner.apply(operation);

        if entry_count >= self.config.memtable_flush_threshold {
            inner.flush()?;
        }

        Ok(())
    }

    /// Flush memtable to disk (public API)
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_open()?;
        inner.flush()
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data so the next open does not depend on WAL
    /// replay, then releases the WAL and segments. Closing a closed engine
    /// is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.state == EngineState::Closed {
            return Ok(());
        }

        inner.state = EngineState::Closing;

        if let Err(e) = inner.flush() {
            // Flush leaves MemTable and WAL intact unless it failed closed
            if inner.state == EngineState::Closing {
                inner.state = EngineState::Open;
            }
            return Err(e);
        }

        let wal_result = inner.wal.take().map_or(Ok(()), WalWriter::close);
        inner.storage.release();
        inner.state = EngineState::Closed;

        tracing::info!(data_dir = %self.config.data_dir.display(), "Engine closed");
        wal_result
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.inner.read().state
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Get the approximate memtable size in bytes
    pub fn memtable_size(&self) -> usize {
        self.inner.read().memtable.approximate_bytes()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.inner.read().memtable.entry_count()
    }

    /// Get the number of loaded segments
    pub fn segment_count(&self) -> usize {
        self.inner.read().storage.segment_count()
    }

    /// Metadata of the loaded segments, oldest first
    pub fn segments(&self) -> Vec<SegmentMeta> {
        self.inner
            .read()
            .storage
            .segments()
            .iter()
            .map(|segment| segment.meta().clone())
            .collect()
    }

    /// Sequence number the next flush will use
    pub fn next_segment_seq(&self) -> u64 {
        self.inner.read().storage.next_seq()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl EngineInner {
    fn ensure_open(&self) -> Result<()> {
        match self.state {
            EngineState::Open => Ok(()),
            state => Err(StrataError::NotOpen(state)),
        }
    }

    fn wal_mut(&mut self) -> Result<&mut WalWriter> {
        let state = self.state;
        self.wal.as_mut().ok_or(StrataError::NotOpen(state))
    }

    /// Replay the WAL into the MemTable and open it for appending
    fn recover(&mut self, wal_path: &Path) -> Result<RecoveryResult> {
        let (entries, recovery) = WalRecovery::recover(wal_path)?;

        // Log order: later entries overwrite earlier ones for the same key
        for entry in entries {
            self.apply(entry.operation);
        }

        self.wal = Some(WalWriter::open(wal_path, recovery.last_lsn + 1)?);
        Ok(recovery)
    }

    /// Apply a logged operation to the MemTable, returning its entry count
    fn apply(&mut self, operation: Operation) -> usize {
        match operation {
            Operation::Put { key, value } => self.memtable.put(key, value),
            Operation::Delete { key } => self.memtable.delete(key),
        }
    }

    /// Internal flush implementation (called with write lock held)
    ///
    /// The WAL is reset only after the new segment is durable. If the
    /// segment write fails nothing changed; if the reset fails the engine
    /// closes, since it can no longer vouch for the WAL.
    fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        // Step 1: MemTable → durable segment (MemTable drained on success)
        self.storage.flush(&mut self.memtable)?;

        // Step 2: Truncate WAL (entries are now durable in the segment)
        let reset = match self.wal.as_mut() {
            Some(wal) => wal.reset(),
            None => Ok(()),
        };

        if let Err(e) = reset {
            tracing::error!(error = %e, "WAL reset failed after flush, closing engine");
            self.fail_closed();
            return Err(e);
        }

        Ok(())
    }

    /// Release everything and refuse further operations
    ///
    /// Whatever is on disk stays recoverable: stale WAL entries replay to
    /// the same values the newest segment holds.
    fn fail_closed(&mut self) {
        self.wal = None;
        self.memtable.drain();
        self.storage.release();
        self.state = EngineState::Closed;
    }
}
