//! Block encoding
//!
//! A block is a size-bounded, key-sorted run of records followed by a 4-byte
//! zero trailer. Values are stored Snappy-compressed; keys are stored raw.
//!
//! ```text
//! [shared: u32 = 0][key_len: u32][val_len: u32][key][snappy(value)]
//! ... repeated ...
//! [trailer: u32 = 0]
//! ```
//!
//! All integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{LayerError, Result};

use super::cursor::Entry;

/// Soft size target for a block (128 KiB)
pub const BLOCK_SIZE_TARGET: usize = 128 * 1024;

/// Per-record header: shared (4) + key_len (4) + val_len (4)
pub(crate) const RECORD_HEADER_SIZE: usize = 12;

/// Trailer appended to every block
pub(crate) const BLOCK_TRAILER_SIZE: usize = 4;

/// Outcome of offering a record to a [`BlockBuilder`]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The record was appended
    Accepted,
    /// The block is at capacity; nothing was changed
    Full,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        self == Admission::Accepted
    }
}

/// Accumulates sorted records into a single block
pub struct BlockBuilder {
    /// Encoded records so far (trailer is appended on close)
    buf: BytesMut,
    /// Soft capacity in bytes
    target: usize,
    /// Number of records admitted
    count: usize,
    /// Last admitted key, for the ordering check
    previous_key: Option<Vec<u8>>,
}

impl BlockBuilder {
    /// Create a builder with the default 128 KiB target
    pub fn new() -> Self {
        Self::with_target(BLOCK_SIZE_TARGET)
    }

    /// Create a builder with a custom size target
    pub fn with_target(target: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            target,
            count: 0,
            previous_key: None,
        }
    }

    /// Offer a record to the block.
    ///
    /// Fails with `OrderingViolation` if `key` is not strictly greater than
    /// the previously admitted key. Returns [`Admission::Full`] without
    /// touching any state if the block already holds a record and the
    /// projected size would exceed the target.
    ///
    /// The projection uses the logical value length while the stored value is
    /// compressed, so a block can end up smaller than the check assumed.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<Admission> {
        if let Some(prev) = &self.previous_key {
            if key <= prev.as_slice() {
                return Err(LayerError::ordering(prev, key));
            }
        }

        check_field("key", key.len())?;
        check_field("value", value.len())?;

        let projected = self.buf.len() + RECORD_HEADER_SIZE + key.len() + value.len();
        if self.count > 0 && projected > self.target {
            return Ok(Admission::Full);
        }

        let compressed = compress(value)?;
        check_field("compressed value", compressed.len())?;

        self.buf.reserve(RECORD_HEADER_SIZE + key.len() + compressed.len());
        self.buf.put_u32(0); // shared prefix, reserved
        self.buf.put_u32(key.len() as u32);
        self.buf.put_u32(compressed.len() as u32);
        self.buf.put_slice(key);
        self.buf.put_slice(&compressed);

        self.count += 1;
        self.previous_key = Some(key.to_vec());
        Ok(Admission::Accepted)
    }

    /// Number of records admitted so far
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded size so far, excluding the trailer
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Finish the block and hand over its bytes (records + zero trailer).
    pub fn close(mut self) -> Bytes {
        self.buf.put_u32(0);
        self.buf.freeze()
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded block: its records in stored order
#[derive(Debug, Clone, Default)]
pub struct Block {
    entries: Vec<Entry>,
}

impl Block {
    /// Decode an encoded block.
    ///
    /// Keys are zero-copy slices of `data`; values are decompressed.
    pub fn decode(data: Bytes) -> Result<Self> {
        if data.len() < BLOCK_TRAILER_SIZE {
            return Err(LayerError::CorruptTable(format!(
                "block of {} bytes is smaller than its trailer",
                data.len()
            )));
        }

        let mut buf = data.slice(..data.len() - BLOCK_TRAILER_SIZE);
        let mut entries = Vec::new();

        while buf.has_remaining() {
            if buf.remaining() < RECORD_HEADER_SIZE {
                return Err(LayerError::CorruptTable(
                    "truncated record header".to_string(),
                ));
            }
            let shared = buf.get_u32();
            let key_len = buf.get_u32() as usize;
            let val_len = buf.get_u32() as usize;

            if shared != 0 {
                return Err(LayerError::CorruptTable(format!(
                    "unsupported shared prefix length {}",
                    shared
                )));
            }
            if buf.remaining() < key_len + val_len {
                return Err(LayerError::CorruptTable(format!(
                    "record needs {} bytes, {} left in block",
                    key_len + val_len,
                    buf.remaining()
                )));
            }

            let key = buf.split_to(key_len);
            let stored = buf.split_to(val_len);
            let value = Bytes::from(decompress(&stored)?);
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    /// Records in key order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match lookup within this block
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Position of the first record whose key is >= `key`
    /// (or `len()` if every key is smaller).
    pub fn lower_bound(&self, key: &[u8]) -> usize {
        self.entries.partition_point(|(k, _)| k.as_ref() < key)
    }
}

fn check_field(field: &'static str, len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(LayerError::OversizeField { field, len });
    }
    Ok(())
}

fn compress(value: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(value)
        .map_err(|_| LayerError::OversizeField {
            field: "value",
            len: value.len(),
        })
}

fn decompress(stored: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(stored)
        .map_err(|e| LayerError::CorruptTable(format!("snappy decode failed: {}", e)))
}
