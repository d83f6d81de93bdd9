//! SSTable Reader
//!
//! Opens SSTable files lazily, loads the block index once, and answers point
//! lookups through a small block cache.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{LayerError, Result};
use crate::storage::block::Block;

use super::cache::BlockCache;
use super::iterator::SSTableCursor;
use super::{decode_index_value, read_offset, COUNT_SIZE, OFFSET_SIZE};

// =============================================================================
// Open Table (shared by the reader and its cursors)
// =============================================================================

/// File handle plus the flattened block index of an opened table
pub(crate) struct OpenTable {
    /// Positioned reads are seek + read, so the handle is serialized
    file: Mutex<File>,
    /// (first key, offset) of every data block, ascending
    entries: Vec<(Bytes, u64)>,
    /// Start of the index region = end of the last data block
    entries_end: u64,
}

impl OpenTable {
    /// Read the trailer and every index block of the file at `path`.
    fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size <= COUNT_SIZE as u64 {
            return Err(LayerError::CorruptTable(format!(
                "{} is {} bytes, too small for a table",
                path.display(),
                file_size
            )));
        }

        // Trailer: [offset: u48] * N, then N: u32
        let count_bytes = read_at(
            &mut file,
            file_size - COUNT_SIZE as u64,
            COUNT_SIZE,
            "index block count",
        )?;
        let index_count = u32::from_be_bytes([
            count_bytes[0],
            count_bytes[1],
            count_bytes[2],
            count_bytes[3],
        ]) as u64;

        let trailer_len = index_count * OFFSET_SIZE as u64 + COUNT_SIZE as u64;
        if trailer_len > file_size {
            return Err(LayerError::CorruptTable(format!(
                "trailer claims {} index blocks but file is {} bytes",
                index_count, file_size
            )));
        }
        let index_end = file_size - trailer_len;

        let offset_bytes = read_at(
            &mut file,
            index_end,
            (index_count as usize) * OFFSET_SIZE,
            "index block offsets",
        )?;
        let index_offsets: Vec<u64> = offset_bytes
            .chunks_exact(OFFSET_SIZE)
            .map(read_offset)
            .collect();

        // Load each index block and flatten its entries
        let mut entries = Vec::new();
        for (i, &start) in index_offsets.iter().enumerate() {
            let end = index_offsets.get(i + 1).copied().unwrap_or(index_end);
            if start > end || end > index_end {
                return Err(LayerError::CorruptTable(format!(
                    "index block {} has invalid range {}..{}",
                    i, start, end
                )));
            }

            let data = read_at(&mut file, start, (end - start) as usize, "index block")?;
            for (key, value) in Block::decode(data)?.entries() {
                entries.push((key.clone(), decode_index_value(value)?));
            }
        }

        let entries_end = index_offsets.first().copied().unwrap_or(index_end);
        if entries.windows(2).any(|w| w[0].1 > w[1].1)
            || entries.last().map_or(false, |(_, off)| *off > entries_end)
        {
            return Err(LayerError::CorruptTable(
                "data block offsets are out of order".to_string(),
            ));
        }

        tracing::debug!(
            "Opened SSTable {}: {} index blocks, {} data blocks",
            path.display(),
            index_offsets.len(),
            entries.len()
        );

        Ok(Self {
            file: Mutex::new(file),
            entries,
            entries_end,
        })
    }

    pub(crate) fn block_count(&self) -> usize {
        self.entries.len()
    }

    /// Index of the rightmost block whose first key is <= `key`, or `None`
    /// if `key` sorts before every block.
    pub(crate) fn block_idx(&self, key: &[u8]) -> Option<usize> {
        self.entries
            .partition_point(|(first, _)| first.as_ref() <= key)
            .checked_sub(1)
    }

    /// Byte range `[start, end)` of data block `idx`
    fn block_range(&self, idx: usize) -> (u64, u64) {
        let start = self.entries[idx].1;
        let end = self
            .entries
            .get(idx + 1)
            .map(|(_, off)| *off)
            .unwrap_or(self.entries_end);
        (start, end)
    }

    /// Read and decode data block `idx` from disk
    pub(crate) fn read_block(&self, idx: usize) -> Result<Block> {
        if idx >= self.entries.len() {
            return Err(LayerError::InvalidState(format!(
                "block {} out of range ({} blocks)",
                idx,
                self.entries.len()
            )));
        }
        let (start, end) = self.block_range(idx);
        let data = {
            let mut file = self.file.lock();
            read_at(&mut file, start, (end - start) as usize, "data block")?
        };
        Block::decode(data)
    }
}

/// Read exactly `len` bytes at `offset`
fn read_at(file: &mut File, offset: u64, len: usize, what: &str) -> Result<Bytes> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)
        .map_err(|e| LayerError::from_table_read(e, what))?;
    Ok(Bytes::from(buf))
}

// =============================================================================
// Reader
// =============================================================================

enum ReaderState {
    Unopened,
    Open(Arc<OpenTable>),
    Closed,
}

/// Reader for SSTable files
///
/// The file is opened and its index loaded on first use. All methods take
/// `&self`; the reader can be shared across threads.
pub struct SSTableReader {
    path: PathBuf,
    state: Mutex<ReaderState>,
    /// Decoded blocks for point lookups
    cache: Mutex<BlockCache>,
}

impl SSTableReader {
    /// Create a reader for `path`. Nothing is read until first use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, &Config::default())
    }

    /// Create a reader with a custom configuration. Nothing is read yet.
    pub fn with_config(path: impl AsRef<Path>, config: &Config) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(ReaderState::Unopened),
            cache: Mutex::new(BlockCache::new(config.block_cache_capacity)),
        }
    }

    /// Open an SSTable and load its index immediately
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = Self::new(path);
        reader.ensure_open()?;
        Ok(reader)
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a value by key
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found
    /// - `Ok(None)`: key not in this SSTable
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let table = self.ensure_open()?;
        let idx = match table.block_idx(key) {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let block = self.read_block(&table, idx)?;
        Ok(block.get(key).cloned())
    }

    /// Create a cursor positioned before the first entry
    pub fn cursor(&self) -> Result<SSTableCursor> {
        Ok(SSTableCursor::new(self.ensure_open()?))
    }

    /// Number of data blocks in the table
    pub fn block_count(&self) -> Result<usize> {
        Ok(self.ensure_open()?.block_count())
    }

    /// Number of decoded blocks currently held by the point-lookup cache
    pub fn cached_block_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Release the file. The reader must not be used afterwards; cursors
    /// already handed out keep their own reference to the open table.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if matches!(*state, ReaderState::Closed) {
            return Err(LayerError::InvalidState(format!(
                "{} is already closed",
                self.path.display()
            )));
        }
        *state = ReaderState::Closed;
        self.cache.lock().clear();
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Open the file and load the index on first call. Concurrent first
    /// callers are serialized on the state lock, so loading happens once.
    fn ensure_open(&self) -> Result<Arc<OpenTable>> {
        let mut state = self.state.lock();
        match &*state {
            ReaderState::Open(table) => Ok(Arc::clone(table)),
            ReaderState::Closed => Err(LayerError::InvalidState(format!(
                "{} is closed",
                self.path.display()
            ))),
            ReaderState::Unopened => {
                let table = Arc::new(OpenTable::load(&self.path)?);
                *state = ReaderState::Open(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    /// Fetch block `idx`, from the cache when possible
    fn read_block(&self, table: &OpenTable, idx: usize) -> Result<Arc<Block>> {
        if let Some(block) = self.cache.lock().get(idx) {
            tracing::trace!("Block cache hit: {} #{}", self.path.display(), idx);
            return Ok(block);
        }

        tracing::trace!("Block cache miss: {} #{}", self.path.display(), idx);
        let block = Arc::new(table.read_block(idx)?);
        self.cache.lock().insert(idx, Arc::clone(&block));
        Ok(block)
    }
}
