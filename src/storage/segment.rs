//! Segment Table
//!
//! Immutable on-disk snapshot of one flushed memtable. The whole mapping is
//! decoded into memory when the segment is opened, so lookups never touch
//! the file again.

use std::collections::btree_map;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec::{self, Mapping};
use crate::error::{Result, StrataError};
use crate::memtable::Entry;

use super::{HEADER_SIZE, MAGIC, VERSION};

/// Segment metadata, returned when a segment is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMeta {
    /// Sequence number (higher = newer)
    pub seq: u64,
    /// Path to the segment file
    pub path: PathBuf,
    /// Number of entries, tombstones included
    pub entry_count: u64,
    /// Smallest key (for range filtering)
    pub min_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SegmentMeta {
    fn describe(path: &Path, seq: u64, entries: &Mapping, file_size: u64) -> Self {
        Self {
            seq,
            path: path.to_path_buf(),
            entry_count: entries.len() as u64,
            min_key: entries.keys().next().cloned().unwrap_or_default(),
            max_key: entries.keys().next_back().cloned().unwrap_or_default(),
            file_size,
        }
    }
}

/// A loaded, immutable segment
#[derive(Debug)]
pub struct SegmentTable {
    meta: SegmentMeta,
    entries: Mapping,
}

impl SegmentTable {
    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode a segment file: header followed by one mapping frame
    pub fn encode(seq: u64, entries: &Mapping) -> Result<Vec<u8>> {
        let body = codec::encode_mapping(entries)?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&seq.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode a segment file into its sequence number and mapping
    pub fn decode(bytes: &[u8]) -> Result<(u64, Mapping)> {
        if bytes.len() < HEADER_SIZE {
            return Err(StrataError::CorruptSegment(format!(
                "file too short for header ({} bytes)",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(StrataError::CorruptSegment(format!(
                "invalid magic: expected STKV, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(StrataError::CorruptSegment(format!(
                "unsupported version: {}",
                version
            )));
        }

        let mut seq_bytes = [0u8; 8];
        seq_bytes.copy_from_slice(&bytes[6..HEADER_SIZE]);
        let seq = u64::from_le_bytes(seq_bytes);

        let (entries, consumed) = codec::decode_mapping(&bytes[HEADER_SIZE..])?;
        let trailing = bytes.len() - HEADER_SIZE - consumed;
        if trailing != 0 {
            return Err(StrataError::CorruptSegment(format!(
                "{} trailing bytes after mapping",
                trailing
            )));
        }

        Ok((seq, entries))
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Durably write a segment to `path`
    ///
    /// The bytes go to a temp file first, are synced, and the temp file is
    /// renamed over `path`; readers see either nothing or the whole segment.
    pub fn write(path: &Path, seq: u64, entries: &Mapping) -> Result<SegmentMeta> {
        let bytes = Self::encode(seq, entries)?;
        let tmp = temp_path(path);

        if let Err(e) = write_synced(&tmp, &bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            sync_dir(dir)?;
        }

        Ok(SegmentMeta::describe(path, seq, entries, bytes.len() as u64))
    }

    /// Open a segment file, checking it carries the expected sequence number
    pub fn open(path: &Path, expected_seq: u64) -> Result<Self> {
        let bytes = fs::read(path)?;

        let (seq, entries) = Self::decode(&bytes).map_err(|e| match e {
            StrataError::CorruptSegment(msg) => {
                StrataError::CorruptSegment(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        if seq != expected_seq {
            return Err(StrataError::CorruptSegment(format!(
                "{}: header sequence {} does not match file name sequence {}",
                path.display(),
                seq,
                expected_seq
            )));
        }

        let meta = SegmentMeta::describe(path, seq, &entries, bytes.len() as u64);
        Ok(Self { meta, entries })
    }

    /// Pair freshly written metadata with the entries it describes
    pub(crate) fn from_parts(meta: SegmentMeta, entries: Mapping) -> Self {
        Self { meta, entries }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Point lookup; tombstones are returned, not hidden
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        if !self.might_contain(key) {
            return None;
        }
        self.entries.get(key)
    }

    /// Quick check if a key might be in this segment (range check)
    pub fn might_contain(&self, key: &[u8]) -> bool {
        !self.entries.is_empty()
            && key >= self.meta.min_key.as_slice()
            && key <= self.meta.max_key.as_slice()
    }

    /// Entries in sorted key order
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Entry> {
        self.entries.iter()
    }

    pub fn seq(&self) -> u64 {
        self.meta.seq
    }

    pub fn path(&self) -> &Path {
        &self.meta.path
    }

    pub fn entry_count(&self) -> u64 {
        self.meta.entry_count
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.entries.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.entries.keys().next_back().map(|k| k.as_slice())
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }
}

/// `segment-000001.db` → `segment-000001.db.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Persist a rename by syncing the directory entry
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
