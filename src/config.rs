//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{Result, StrataError};

/// Default number of memtable entries that triggers a flush
pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

/// Main configuration for a StrataKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log              (write-ahead log)
    ///     └── segment-000001.db    (segment tables, one per flush)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of keys (tombstones included) the memtable may hold before
    /// it is flushed to a new segment
    pub memtable_flush_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            memtable_flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl Config {
    /// Default config rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memtable_flush_threshold == 0 {
            return Err(StrataError::Config(
                "memtable_flush_threshold must be at least 1".to_string(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(StrataError::Config("data_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the memtable flush threshold (in entries)
    pub fn memtable_flush_threshold(mut self, entries: usize) -> Self {
        self.config.memtable_flush_threshold = entries;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
