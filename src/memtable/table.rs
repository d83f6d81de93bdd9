//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::Result;
use crate::storage::{SSTable, SSTableBuilder};

/// In-memory table for recent writes
pub struct MemTable {
    /// Entries ordered by byte-wise key comparison
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Sum of key and value lengths of live entries
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Insert or overwrite a key (write lock)
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        let mut data = self.data.write();
        let added = key.len() + value.len();

        // Size is only changed under the write lock, so load/store is enough
        let mut size = self.size.load(Ordering::Acquire);
        if let Some(old) = data.get(&key) {
            size -= key.len() + old.len();
        }
        size += added;

        data.insert(key, value);
        self.size.store(size, Ordering::Release);
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Aggregate size of keys and values in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Number of distinct keys
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot of all entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> {
        let snapshot: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        snapshot.into_iter()
    }

    /// Write every entry, in ascending key order, to a new SSTable at `path`
    ///
    /// The memtable itself is left untouched. Fails with `AlreadyExists` if
    /// `path` is present and `EmptyTable` if there is nothing to write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<SSTable> {
        self.save_with_config(path, Config::default())
    }

    /// [`save`](MemTable::save) with a custom table configuration
    pub fn save_with_config(&self, path: impl AsRef<Path>, config: Config) -> Result<SSTable> {
        let data = self.data.read();
        let mut builder = SSTableBuilder::with_config(path, config);
        for (key, value) in data.iter() {
            builder.add(key, value)?;
        }
        let table = builder.close()?;

        tracing::debug!(
            "Saved MemTable to {}: {} entries, {} bytes",
            table.path.display(),
            table.entry_count,
            self.size()
        );
        Ok(table)
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
