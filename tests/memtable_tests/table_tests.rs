//! MemTable Tests
//!
//! Tests verify:
//! - Basic put/get operations
//! - Size tracking across overwrites
//! - Save produces a complete, byte-ordered SSTable
//! - Save leaves the memtable untouched
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use layerkv::{Config, Cursor, LayerError, MemTable, SSTableReader};
use tempfile::TempDir;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.entry_count(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn test_put_and_get() {
    let memtable = MemTable::new();

    memtable.put(b"key1".to_vec(), b"value1".to_vec());

    assert_eq!(memtable.get(b"key1"), Some(b"value1".to_vec()));
    assert_eq!(memtable.get(b"nonexistent"), None);
}

#[test]
fn test_put_overwrites_existing() {
    let memtable = MemTable::new();

    memtable.put(b"key1".to_vec(), b"value1".to_vec());
    memtable.put(b"key1".to_vec(), b"v2".to_vec());

    assert_eq!(memtable.entry_count(), 1);
    assert_eq!(memtable.get(b"key1"), Some(b"v2".to_vec()));
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_counts_keys_and_values() {
    let memtable = MemTable::new();

    for i in 0..1000 {
        memtable.put(format!("key{}", i).into_bytes(), format!("value{}", i).into_bytes());
    }

    for i in 0..1000 {
        assert!(memtable.get(format!("key{}", i).as_bytes()).is_some());
    }
    assert_eq!(memtable.entry_count(), 1000);
    assert_eq!(memtable.size(), 13780);
}

#[test]
fn test_size_adjusts_on_overwrite() {
    let memtable = MemTable::new();

    memtable.put(b"k".to_vec(), b"0123456789".to_vec());
    assert_eq!(memtable.size(), 11);

    memtable.put(b"k".to_vec(), b"abc".to_vec());
    assert_eq!(memtable.size(), 4);

    memtable.put(b"other".to_vec(), Vec::new());
    assert_eq!(memtable.size(), 9);
}

#[test]
fn test_should_flush() {
    let memtable = MemTable::new();
    memtable.put(vec![b'k'; 10], vec![b'v'; 90]);

    assert!(memtable.should_flush(100));
    assert!(!memtable.should_flush(101));
}

#[test]
fn test_iter_is_bytewise_sorted() {
    let memtable = MemTable::new();
    memtable.put(vec![0xc3, 0xa9], b"e-acute".to_vec());
    memtable.put(b"z".to_vec(), b"z".to_vec());
    memtable.put(b"B".to_vec(), b"B".to_vec());
    memtable.put(b"a".to_vec(), b"a".to_vec());

    let keys: Vec<Vec<u8>> = memtable.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![b"B".to_vec(), b"a".to_vec(), b"z".to_vec(), vec![0xc3, 0xa9]]
    );
}

// =============================================================================
// Save Tests
// =============================================================================

#[test]
fn test_save_writes_every_entry_in_order() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("memtable.sst");

    let memtable = MemTable::new();
    // Inserted out of order on purpose
    for i in (0..1000).rev() {
        memtable.put(format!("{:04}", i).into_bytes(), format!("value{}", i).into_bytes());
    }

    let sstable = memtable.save(&path).unwrap();
    assert_eq!(sstable.entry_count(), 1000);

    let reader = SSTableReader::open(&path).unwrap();
    let entries = reader.cursor().unwrap().collect_remaining().unwrap();

    assert_eq!(entries.len(), 1000);
    for (i, (k, v)) in entries.iter().enumerate() {
        assert_eq!(k.as_ref(), format!("{:04}", i).as_bytes());
        assert_eq!(v.as_ref(), format!("value{}", i).as_bytes());
    }
    reader.close().unwrap();
}

#[test]
fn test_save_keeps_last_write() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("memtable.sst");

    let memtable = MemTable::new();
    memtable.put(b"k".to_vec(), b"first".to_vec());
    memtable.put(b"k".to_vec(), b"second".to_vec());
    memtable.save(&path).unwrap();

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.get(b"k").unwrap().unwrap().as_ref(), b"second");
}

#[test]
fn test_save_does_not_mutate() {
    let temp = TempDir::new().unwrap();

    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());
    memtable.put(b"b".to_vec(), b"2".to_vec());
    memtable.save(temp.path().join("one.sst")).unwrap();

    assert_eq!(memtable.entry_count(), 2);
    assert_eq!(memtable.size(), 4);

    // Can be saved again to a different path
    let again = memtable.save(temp.path().join("two.sst")).unwrap();
    assert_eq!(again.entry_count(), 2);
}

#[test]
fn test_save_with_small_blocks() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("small.sst");

    let memtable = MemTable::new();
    for i in 0..200 {
        memtable.put(format!("key{:05}", i).into_bytes(), vec![b'x'; i]);
    }

    let config = Config::builder().block_size_target(512).build();
    let sstable = memtable.save_with_config(&path, config).unwrap();
    assert!(sstable.data_block_count > 1);

    let reader = SSTableReader::open(&path).unwrap();
    for i in (0..200).step_by(17) {
        let value = reader.get(format!("key{:05}", i).as_bytes()).unwrap().unwrap();
        assert_eq!(value.len(), i);
    }
}

#[test]
fn test_save_empty_memtable_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.sst");

    let result = MemTable::new().save(&path);
    assert!(matches!(result, Err(LayerError::EmptyTable)));
    assert!(!path.exists());
}

#[test]
fn test_save_over_existing_file_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("taken.sst");
    std::fs::write(&path, b"x").unwrap();

    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());

    assert!(matches!(memtable.save(&path), Err(LayerError::AlreadyExists(_))));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let memtable = Arc::new(MemTable::new());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let memtable = Arc::clone(&memtable);
            thread::spawn(move || {
                for i in 0..250 {
                    memtable.put(format!("t{}-{:03}", t, i).into_bytes(), vec![b'v'; 4]);
                }
            })
        })
        .collect();
    let reader = {
        let memtable = Arc::clone(&memtable);
        thread::spawn(move || {
            for _ in 0..100 {
                let _ = memtable.get(b"t0-000");
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(memtable.entry_count(), 1000);
    // each key is 6 bytes ("tN-NNN") plus a 4-byte value
    assert_eq!(memtable.size(), 1000 * 10);
}
