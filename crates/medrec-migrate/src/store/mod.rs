//! Destination stores.
//!
//! The pipeline writes through the [`BatchWriter`] seam so the batch
//! loader never knows which backend it is feeding. The embedded store
//! doubles as the transfer source via [`SqliteStore::scan`].

pub mod postgres;
pub mod sqlite;

pub use postgres::{PgColumn, PgStore};
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::core::Value;
use crate::error::Result;

/// Write bounded batches into one destination table.
///
/// A writer is bound to a table and a column list at construction.
/// `write_batch` must be transactional: either the whole batch commits
/// or none of it does.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Destination table name.
    fn table(&self) -> &str;

    /// Delete every row currently in the table.
    async fn delete_all(&self) -> Result<u64>;

    /// Insert a batch of rows inside a single transaction.
    async fn write_batch(&self, rows: &[Vec<Value>]) -> Result<u64>;
}
