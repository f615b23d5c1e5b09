//! Storage Manager
//!
//! Manages the segment table list and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing segments on startup
//! - Search segments newest → oldest for reads
//! - Create new segments from MemTable flushes
//! - Track segment sequence numbers

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};
use crate::memtable::{Entry, MemTable};

use super::segment::{SegmentMeta, SegmentTable};

/// Manages the storage layer
///
/// ## Concurrency:
/// No internal locking. The engine owns the manager behind its RwLock:
/// `flush`/`release` need `&mut self`, lookups need `&self`.
pub struct StorageManager {
    /// Directory where segments are stored
    data_dir: PathBuf,

    /// Loaded segments, ordered oldest → newest (index order == recency)
    segments: Vec<SegmentTable>,

    /// Sequence number for the next segment
    next_seq: u64,
}

impl StorageManager {
    const SEGMENT_PREFIX: &'static str = "segment-";
    const SEGMENT_SUFFIX: &'static str = ".db";

    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove temp files left by an interrupted flush
    /// 3. Discover segment files and sort them by sequence number
    /// 4. Decode each one; any corrupt segment aborts the open
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let found = Self::discover(path, true)?;

        let mut segments = Vec::with_capacity(found.len());
        for (seq, segment_path) in &found {
            segments.push(SegmentTable::open(segment_path, *seq)?);
        }

        // Next seq = max + 1, or 1 if no segments exist
        let next_seq = found.last().map_or(1, |(seq, _)| seq + 1);

        Ok(Self {
            data_dir: path.to_path_buf(),
            segments,
            next_seq,
        })
    }

    /// Decode every segment in an existing directory without changing it
    ///
    /// Unlike [`StorageManager::open`] this neither creates the directory
    /// nor removes stale temp files. Returns metadata oldest first.
    pub fn list_segments(path: &Path) -> Result<Vec<SegmentMeta>> {
        Self::discover(path, false)?
            .iter()
            .map(|(seq, segment_path)| {
                SegmentTable::open(segment_path, *seq).map(|segment| segment.meta().clone())
            })
            .collect()
    }

    /// Segment files in `path` sorted by sequence number
    fn discover(path: &Path, remove_stale: bool) -> Result<Vec<(u64, PathBuf)>> {
        let mut found: Vec<(u64, PathBuf)> = Vec::new();

        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if !file_path.is_file() {
                continue;
            }

            if Self::is_stale_temp(&file_path) {
                if remove_stale {
                    tracing::warn!(path = %file_path.display(), "Removing stale segment temp file");
                    fs::remove_file(&file_path)?;
                }
                continue;
            }

            if let Some(seq) = Self::parse_segment_seq(&file_path) {
                found.push((seq, file_path));
            }
        }

        // Oldest first
        found.sort_unstable_by_key(|(seq, _)| *seq);

        if let Some(pair) = found.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(StrataError::CorruptSegment(format!(
                "{} and {} share sequence number {}",
                pair[0].1.display(),
                pair[1].1.display(),
                pair[0].0
            )));
        }

        Ok(found)
    }

    /// Get an entry by key (searches all segments newest → oldest)
    ///
    /// Returns the first hit, which may be a tombstone.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.segments.iter().rev().find_map(|segment| segment.get(key))
    }

    /// Flush a MemTable to a new segment
    ///
    /// The memtable is drained only after the segment file is durable, so
    /// on error it still holds every entry. The sequence number is consumed
    /// either way and never reused.
    pub fn flush(&mut self, memtable: &mut MemTable) -> Result<SegmentMeta> {
        if memtable.is_empty() {
            return Err(StrataError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let path = self.segment_path(seq);

        let meta = SegmentTable::write(&path, seq, memtable.entries())?;

        let entries = memtable.drain();
        self.segments.push(SegmentTable::from_parts(meta.clone(), entries));

        tracing::debug!(
            seq,
            entries = meta.entry_count,
            bytes = meta.file_size,
            "Flushed memtable to segment"
        );

        Ok(meta)
    }

    /// Drop every loaded segment
    pub fn release(&mut self) {
        self.segments.clear();
    }

    /// Get the number of loaded segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Loaded segments, oldest first
    pub fn segments(&self) -> &[SegmentTable] {
        &self.segments
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next segment sequence number (for testing/debugging)
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    // =========================================================================
    // File Naming
    // =========================================================================

    fn segment_path(&self, seq: u64) -> PathBuf {
        Self::segment_path_with_dir(&self.data_dir, seq)
    }

    /// Generate segment path given a directory and sequence number
    pub fn segment_path_with_dir(dir: &Path, seq: u64) -> PathBuf {
        dir.join(format!(
            "{}{:06}{}",
            Self::SEGMENT_PREFIX,
            seq,
            Self::SEGMENT_SUFFIX
        ))
    }

    /// Parse a sequence number from a segment filename
    /// "segment-000042.db" → Some(42)
    pub fn parse_segment_seq(path: &Path) -> Option<u64> {
        let name = path.file_name()?.to_str()?;
        let digits = name
            .strip_prefix(Self::SEGMENT_PREFIX)?
            .strip_suffix(Self::SEGMENT_SUFFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// "segment-000042.db.tmp", left behind by an interrupted flush
    fn is_stale_temp(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(".tmp"))
            .map_or(false, |name| Self::parse_segment_seq(Path::new(name)).is_some())
    }
}
