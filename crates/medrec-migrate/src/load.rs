//! Batch loading with replace semantics.
//!
//! A [`BatchLoader`] owns the bounded window of normalized rows for
//! one table. The destination is fully deleted before the first row is
//! written, so the end state reflects only current source content.
//! Flushes happen on a full window and at end of stream; each flush is
//! one transaction, so no partial batch is ever left uncommitted on
//! success. An insert error aborts the table's load and surfaces the
//! underlying error.

use tracing::{debug, info};

use crate::core::Value;
use crate::error::{MigrateError, Result};
use crate::store::BatchWriter;

/// Default window capacity.
pub const DEFAULT_BATCH_CAPACITY: usize = 1000;

/// Accumulates normalized rows and flushes them in bounded,
/// transactional batches.
pub struct BatchLoader<'a> {
    writer: &'a dyn BatchWriter,
    capacity: usize,
    window: Vec<Vec<Value>>,
    written: u64,
}

impl<'a> BatchLoader<'a> {
    /// Create a loader over `writer` with the given window capacity.
    pub fn new(writer: &'a dyn BatchWriter, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            writer,
            capacity,
            window: Vec::with_capacity(capacity),
            written: 0,
        }
    }

    /// Delete the destination table's current contents.
    ///
    /// Must run before the first [`push`](Self::push). Failure here is
    /// fatal for the table: a destination that cannot be cleared
    /// cannot be trusted to hold a faithful replacement.
    pub async fn begin(&mut self) -> Result<u64> {
        let deleted = self
            .writer
            .delete_all()
            .await
            .map_err(|e| MigrateError::load(self.writer.table(), e.to_string()))?;
        info!("{}: deleted {} existing rows", self.writer.table(), deleted);
        Ok(deleted)
    }

    /// Append a row, flushing when the window reaches capacity.
    pub async fn push(&mut self, row: Vec<Value>) -> Result<()> {
        self.window.push(row);
        if self.window.len() >= self.capacity {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush the remaining partial window and return the total number
    /// of rows written.
    pub async fn finish(mut self) -> Result<u64> {
        self.flush().await?;
        Ok(self.written)
    }

    async fn flush(&mut self) -> Result<()> {
        if self.window.is_empty() {
            return Ok(());
        }
        let count = self
            .writer
            .write_batch(&self.window)
            .await
            .map_err(|e| MigrateError::load(self.writer.table(), e.to_string()))?;
        self.written += count;
        self.window.clear();
        debug!("{}: progress {} rows", self.writer.table(), self.written);
        Ok(())
    }
}
