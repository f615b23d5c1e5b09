//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty or missing WAL
//! - Recovery with partial writes (truncated tail), including file repair
//! - Recovery with a torn final entry (CRC mismatch at the tail)
//! - Mid-log corruption is fatal
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use stratakv::wal::{Operation, WalEntry, WalRecovery, WalWriter, HEADER_SIZE};
use stratakv::StrataError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, 1).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

/// Write raw serialized entries directly to a file (for crafting corruption)
fn write_raw(path: &PathBuf, chunks: &[&[u8]]) {
    let mut file = File::create(path).unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
    }
    file.sync_all().unwrap();
}

fn entry_bytes(lsn: u64, key: &[u8], value: &[u8]) -> Vec<u8> {
    WalEntry::new(
        lsn,
        Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        },
    )
    .serialize()
    .unwrap()
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);

    // Verify entries are in order
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

#[test]
fn test_recover_preserves_operations() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, 1).unwrap();
        writer.append(Operation::Put { key: b"k1".to_vec(), value: b"v1".to_vec() }).unwrap();
        writer.append(Operation::Delete { key: b"k1".to_vec() }).unwrap();
        writer.append(Operation::Put { key: b"k2".to_vec(), value: b"v2".to_vec() }).unwrap();
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 3);
    assert!(matches!(entries[0].operation, Operation::Put { .. }));
    assert!(matches!(entries[1].operation, Operation::Delete { .. }));
    assert!(matches!(entries[2].operation, Operation::Put { .. }));
}

// =============================================================================
// Recover: Partial Write Tests (was_truncated = true)
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = entry_bytes(1, b"k", b"v");
    write_raw(&wal_path, &[&good, &[0x20, 0x00, 0x00, 0x00, 0x01]]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 1);
    assert_eq!(result.bytes_discarded, 5);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = entry_bytes(1, b"k", b"v");
    let second = entry_bytes(2, b"k2", b"v2");
    write_raw(&wal_path, &[&good, &second[..HEADER_SIZE + 4]]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // Only the first entry should be recovered
    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_truncates_file_to_valid_prefix() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = entry_bytes(1, b"k", b"v");
    let second = entry_bytes(2, b"k2", b"v2");
    write_raw(&wal_path, &[&good, &second[..second.len() - 1]]);

    WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

#[test]
fn test_appends_after_recovery_are_readable() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = entry_bytes(1, b"k", b"v");
    let second = entry_bytes(2, b"k2", b"v2");
    write_raw(&wal_path, &[&good, &second[..HEADER_SIZE + 1]]);

    let (_, result) = WalRecovery::recover(&wal_path).unwrap();
    {
        let mut writer = WalWriter::open(&wal_path, result.last_lsn + 1).unwrap();
        writer.append(Operation::Put { key: b"k3".to_vec(), value: b"v3".to_vec() }).unwrap();
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert!(!result.was_truncated);
    assert_eq!(entries[1].operation.key(), b"k3");
}

// =============================================================================
// Recover: Corruption Tests (CRC mismatch)
// =============================================================================

#[test]
fn test_recover_torn_last_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let good = entry_bytes(1, b"k1", b"v1");
    let mut bad = entry_bytes(2, b"k2", b"v2");

    // Corrupt a data byte in the second entry (flip last byte)
    if let Some(byte) = bad.last_mut() {
        *byte ^= 0xFF;
    }
    write_raw(&wal_path, &[&good, &bad]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // Only the first entry survives
    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_corruption_at_only_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut bytes = entry_bytes(1, b"k", b"v");
    bytes[HEADER_SIZE + 2] ^= 0xFF;
    write_raw(&wal_path, &[&bytes]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // Nothing recovered
    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

#[test]
fn test_recover_mid_log_corruption_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    let first = entry_bytes(1, b"k1", b"v1");
    let mut middle = entry_bytes(2, b"k2", b"v2");
    let last = entry_bytes(3, b"k3", b"v3");
    middle[HEADER_SIZE] ^= 0xFF;
    write_raw(&wal_path, &[&first, &middle, &last]);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let err = WalRecovery::recover(&wal_path).unwrap_err();

    assert!(matches!(err, StrataError::CorruptWalRecord(_)));
    // Nothing is cut off when the log cannot be trusted
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_recover_damaged_length_mid_log_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    let first = entry_bytes(1, b"k1", b"v1");
    let mut middle = entry_bytes(2, b"k2", b"v2");
    let last = entry_bytes(3, b"k3", b"v3");
    middle[3] = 0x7F;
    write_raw(&wal_path, &[&first, &middle, &last]);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let err = WalRecovery::recover(&wal_path).unwrap_err();

    assert!(matches!(err, StrataError::CorruptWalRecord(_)));
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
    assert!(WalRecovery::verify(&wal_path).is_err());
}

// =============================================================================
// Verify Tests (stats only, same logic as recover)
// =============================================================================

#[test]
fn test_verify_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 1);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0u8; 5]).unwrap(); // Trailing junk
    file.sync_all().unwrap();
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

// =============================================================================
// Recover + Verify Consistency Test
// =============================================================================

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 20);

    let verify_result = WalRecovery::verify(&wal_path).unwrap();
    let (entries, recover_result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), recover_result.entries_recovered as usize);
    assert_eq!(recover_result, verify_result);
}
