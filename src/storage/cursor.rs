//! Cursor abstraction
//!
//! Sequential, seekable iteration over sorted `(key, value)` entries.
//! Implemented by [`SSTableCursor`](super::SSTableCursor) for one table and
//! by [`MergeCursor`](super::MergeCursor) for a priority-ordered union.

use bytes::Bytes;

use crate::error::Result;

/// A `(key, value)` pair as stored in a table
pub type Entry = (Bytes, Bytes);

/// Forward iterator with seek over ascending keys
pub trait Cursor {
    /// Return the entry at the current position and advance past it.
    /// `Ok(None)` means the cursor is exhausted.
    fn next(&mut self) -> Result<Option<Entry>>;

    /// Reposition so the next call to [`next`](Cursor::next) yields the
    /// smallest entry with key >= `key`, or `None` if there is none.
    fn seek(&mut self, key: &[u8]) -> Result<()>;

    /// Drain every remaining entry.
    fn collect_remaining(&mut self) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        while let Some(entry) = self.next()? {
            out.push(entry);
        }
        Ok(out)
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn next(&mut self) -> Result<Option<Entry>> {
        (**self).next()
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        (**self).seek(key)
    }
}
