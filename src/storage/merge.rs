//! Merged Table
//!
//! Presents several SSTables as one sorted view.
//!
//! ## Priority
//! Tables are listed highest priority first. When more than one table holds
//! a key, the earliest-listed table wins, both for point lookups and for
//! merged iteration; shadowed copies never surface.
//!
//! ## Concurrency
//! Per-table calls (`get`, `seek`, slot refills) fan out over scoped
//! threads whenever more than one table is involved. Distinct readers are
//! independent, so this is safe; one cursor is never driven by two threads.

use bytes::Bytes;

use crate::error::Result;

use super::cursor::{Cursor, Entry};
use super::sstable::SSTableReader;

/// A boxed cursor that can be driven from a worker thread
pub type BoxedCursor = Box<dyn Cursor + Send>;

/// Priority-ordered union of SSTables
pub struct MergedTable {
    /// Highest priority first
    tables: Vec<SSTableReader>,
}

impl MergedTable {
    /// Merge `tables`, highest priority first
    pub fn new(tables: Vec<SSTableReader>) -> Self {
        Self { tables }
    }

    /// Backing tables, highest priority first
    pub fn tables(&self) -> &[SSTableReader] {
        &self.tables
    }

    /// Get a value by key (every table is queried, the first listed hit wins)
    ///
    /// An error from any table is returned even if another table has the key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let tables: Vec<&SSTableReader> = self.tables.iter().collect();
        let results = fan_out(tables, |table| table.get(key));

        let mut found = None;
        for result in results {
            let value = result?;
            if found.is_none() {
                found = value;
            }
        }
        Ok(found)
    }

    /// Create a merge cursor with one source cursor per table
    pub fn cursor(&self) -> Result<MergeCursor> {
        let tables: Vec<&SSTableReader> = self.tables.iter().collect();
        let sources = fan_out(tables, |table| {
            table.cursor().map(|c| Box::new(c) as BoxedCursor)
        })
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        Ok(MergeCursor::new(sources))
    }

    /// Close every backing table. All tables are closed even if one fails;
    /// the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let mut first_err = None;
        for table in &self.tables {
            if let Err(e) = table.close() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Merge Cursor
// =============================================================================

/// Pending entry for one source
enum Slot {
    /// Needs a refill on the next call
    Empty,
    Pending(Entry),
    Exhausted,
}

impl Slot {
    fn key(&self) -> Option<&[u8]> {
        match self {
            Slot::Pending((key, _)) => Some(key.as_ref()),
            _ => None,
        }
    }
}

/// Cursor over a priority-ordered union of cursors
///
/// Yields each distinct key once, from the highest-priority source holding it.
pub struct MergeCursor {
    /// Highest priority first
    sources: Vec<BoxedCursor>,
    slots: Vec<Slot>,
}

impl MergeCursor {
    /// Merge `sources`, highest priority first
    pub fn new(sources: Vec<BoxedCursor>) -> Self {
        let slots = sources.iter().map(|_| Slot::Empty).collect();
        Self { sources, slots }
    }

    /// Pull the next entry into every empty slot
    fn fill_slots(&mut self) -> Result<()> {
        let pending: Vec<(&mut BoxedCursor, &mut Slot)> = self
            .sources
            .iter_mut()
            .zip(self.slots.iter_mut())
            .filter(|(_, slot)| matches!(slot, Slot::Empty))
            .collect();

        for result in fan_out(pending, |(source, slot)| {
            *slot = match source.next()? {
                Some(entry) => Slot::Pending(entry),
                None => Slot::Exhausted,
            };
            Ok(())
        }) {
            result?;
        }
        Ok(())
    }
}

impl Cursor for MergeCursor {
    fn next(&mut self) -> Result<Option<Entry>> {
        self.fill_slots()?;

        // Strict comparison keeps the lowest index among equal keys
        let mut winner: Option<usize> = None;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(key) = slot.key() {
                let better = match winner.and_then(|w| self.slots[w].key()) {
                    Some(best) => key < best,
                    None => true,
                };
                if better {
                    winner = Some(idx);
                }
            }
        }

        let winner = match winner {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let entry = match std::mem::replace(&mut self.slots[winner], Slot::Empty) {
            Slot::Pending(entry) => entry,
            _ => return Ok(None),
        };

        // Drop lower-priority copies of the same key
        for slot in self.slots.iter_mut() {
            if slot.key() == Some(entry.0.as_ref()) {
                *slot = Slot::Empty;
            }
        }

        Ok(Some(entry))
    }

    fn seek(&mut self, key: &[u8]) -> Result<()> {
        let sources: Vec<&mut BoxedCursor> = self.sources.iter_mut().collect();
        for result in fan_out(sources, |source| source.seek(key)) {
            result?;
        }
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        Ok(())
    }
}

/// Run `op` on every item, on scoped threads when there is more than one,
/// and return the results in item order.
fn fan_out<T, R, F>(items: Vec<T>, op: F) -> Vec<Result<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Sync,
{
    if items.len() <= 1 {
        return items.into_iter().map(op).collect();
    }

    let op = &op;
    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| scope.spawn(move |_| op(item)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
