//! SSTable Builder
//!
//! Packs sorted key-value entries into data blocks, then writes the index
//! blocks and trailer that make up a finalized SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{LayerError, Result};
use crate::storage::block::BlockBuilder;

use super::{encode_index_value, put_offset, SSTable, COUNT_SIZE, OFFSET_SIZE};

/// Builder for creating new SSTables from sorted entries
///
/// The destination file is created on the first `add()`; it must not exist.
/// Call `add()` with strictly ascending keys, then `close()` to write the
/// index blocks and trailer.
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Block size target and friends
    config: Config,
    /// Buffered writer, opened lazily
    writer: Option<BufWriter<File>>,
    /// Current write position (start of the next block)
    current_offset: u64,
    /// Data block being filled
    block: Option<BlockBuilder>,
    /// First key of the data block being filled
    block_first_key: Option<Vec<u8>>,
    /// Index: first key of each written data block → file offset
    index: Vec<(Vec<u8>, u64)>,
    /// Last key ever added (table-wide ordering check, also the max key)
    previous_key: Option<Vec<u8>>,
    /// Track min key for metadata
    min_key: Option<Vec<u8>>,
    /// Number of entries added
    entry_count: u64,
}

impl SSTableBuilder {
    /// Create a builder with the default configuration. No I/O happens yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_config(path, Config::default())
    }

    /// Create a builder with a custom configuration. No I/O happens yet.
    pub fn with_config(path: impl AsRef<Path>, config: Config) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            writer: None,
            current_offset: 0,
            block: None,
            block_first_key: None,
            index: Vec::new(),
            previous_key: None,
            min_key: None,
            entry_count: 0,
        }
    }

    /// Add a key-value pair (keys must be strictly ascending across the table)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(prev) = &self.previous_key {
            if key <= prev.as_slice() {
                return Err(LayerError::ordering(prev, key));
            }
        }

        if self.writer.is_none() {
            self.writer = Some(create_exclusive(&self.path)?);
        }

        if !self.current_block().add(key, value)?.is_accepted() {
            self.flush_block()?;
            // A fresh block admits its first record regardless of size
            if !self.current_block().add(key, value)?.is_accepted() {
                return Err(LayerError::InvalidState(
                    "empty block rejected a record".to_string(),
                ));
            }
        }

        if self.block_first_key.is_none() {
            self.block_first_key = Some(key.to_vec());
        }
        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.previous_key = Some(key.to_vec());
        self.entry_count += 1;

        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finish building: write pending data, index blocks and trailer, then
    /// release the file.
    ///
    /// Fails with `EmptyTable` if nothing was ever added.
    pub fn close(mut self) -> Result<SSTable> {
        self.flush_block()?;

        if self.index.is_empty() {
            return Err(LayerError::EmptyTable);
        }
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| LayerError::InvalidState("table file was never opened".to_string()))?;

        // Index blocks use the same size-bounded packing as data blocks
        let target = self.config.block_size_target;
        let mut index_offsets = Vec::new();
        let mut index_block = BlockBuilder::with_target(target);

        for (first_key, offset) in &self.index {
            let value = encode_index_value(*offset)?;
            if !index_block.add(first_key, &value)?.is_accepted() {
                let full = std::mem::replace(&mut index_block, BlockBuilder::with_target(target));
                index_offsets.push(self.current_offset);
                write_block(&mut writer, &mut self.current_offset, &full.close())?;

                if !index_block.add(first_key, &value)?.is_accepted() {
                    return Err(LayerError::InvalidState(
                        "empty index block rejected a record".to_string(),
                    ));
                }
            }
        }
        if !index_block.is_empty() {
            index_offsets.push(self.current_offset);
            write_block(&mut writer, &mut self.current_offset, &index_block.close())?;
        }

        // Trailer: N offsets then N
        let mut trailer = Vec::with_capacity(index_offsets.len() * OFFSET_SIZE + COUNT_SIZE);
        for offset in &index_offsets {
            put_offset(&mut trailer, *offset)?;
        }
        trailer.extend_from_slice(&(index_offsets.len() as u32).to_be_bytes());
        write_block(&mut writer, &mut self.current_offset, &trailer)?;

        writer.flush()?;
        drop(writer);

        tracing::debug!(
            "Finalized SSTable {}: {} entries, {} data blocks, {} index blocks, {} bytes",
            self.path.display(),
            self.entry_count,
            self.index.len(),
            index_offsets.len(),
            self.current_offset
        );

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            data_block_count: self.index.len(),
            index_block_count: index_offsets.len(),
            min_key: self.min_key.unwrap_or_default(),
            max_key: self.previous_key.unwrap_or_default(),
            file_size: self.current_offset,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The data block being filled, started on demand
    fn current_block(&mut self) -> &mut BlockBuilder {
        let target = self.config.block_size_target;
        self.block
            .get_or_insert_with(|| BlockBuilder::with_target(target))
    }

    /// Write the current data block (if it holds anything) and record it in
    /// the index.
    fn flush_block(&mut self) -> Result<()> {
        let block = match self.block.take() {
            Some(b) if !b.is_empty() => b,
            _ => return Ok(()),
        };
        let first_key = self
            .block_first_key
            .take()
            .ok_or_else(|| LayerError::InvalidState("block without a first key".to_string()))?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LayerError::InvalidState("table file was never opened".to_string()))?;

        let offset = self.current_offset;
        let data = block.close();
        write_block(writer, &mut self.current_offset, &data)?;

        tracing::trace!(
            "Flushed data block #{} at offset {} ({} bytes)",
            self.index.len(),
            offset,
            data.len()
        );
        self.index.push((first_key, offset));
        Ok(())
    }
}

/// Create `path`, failing if it already exists
fn create_exclusive(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => LayerError::AlreadyExists(path.to_path_buf()),
            _ => LayerError::Io(e),
        })?;
    Ok(BufWriter::new(file))
}

/// Append `data` and advance the running offset
fn write_block(writer: &mut BufWriter<File>, offset: &mut u64, data: &[u8]) -> Result<()> {
    writer.write_all(data)?;
    *offset += data.len() as u64;
    Ok(())
}
