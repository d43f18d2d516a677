//! Embedded store (SQLite) access.
//!
//! Uses SQLx for connection pooling and async query execution. The
//! store is both the destination of the XML import and the source of
//! the server transfer.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::BatchWriter;
use crate::core::{RawRecord, Value};
use crate::error::{MigrateError, Result};

/// SQLite's historical per-statement bind parameter ceiling.
const MAX_BIND_PARAMS: usize = 999;

/// Embedded SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open an existing store file.
    ///
    /// A missing file is a precondition failure: the pipeline must not
    /// conjure an empty destination and then "successfully" migrate
    /// into it.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrateError::Precondition(format!(
                "embedded store not found: {}",
                path.display()
            )));
        }
        let options = SqliteConnectOptions::new().filename(path);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "opening embedded store"))?;
        info!("Opened embedded store: {}", path.display());
        Ok(Self { pool })
    }

    /// Create (or open) a store file, for provisioning and tests.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "creating embedded store"))?;
        Ok(Self { pool })
    }

    /// In-memory store, for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| MigrateError::pool(e, "opening in-memory store"))?;
        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Batch writer for one table.
    pub fn writer(&self, table: impl Into<String>, columns: Vec<String>) -> SqliteTableWriter {
        SqliteTableWriter {
            pool: self.pool.clone(),
            table: table.into(),
            columns,
        }
    }

    /// Full-table scan in storage order, one [`RawRecord`] per row.
    ///
    /// Reading never validates and never mutates; repeating a scan is
    /// safe across runs.
    pub async fn scan(&self, table: &str) -> Result<Vec<RawRecord>> {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = RawRecord::new();
            for (i, col) in row.columns().iter().enumerate() {
                let raw = row.try_get_raw(i)?;
                let value = if raw.is_null() {
                    Value::Null
                } else {
                    match raw.type_info().name() {
                        "INTEGER" => Value::Int(row.try_get(i)?),
                        "REAL" => Value::Real(row.try_get(i)?),
                        // the clinical schema carries no blobs
                        "BLOB" => Value::Null,
                        _ => Value::Text(row.try_get(i)?),
                    }
                };
                record.push(col.name(), value);
            }
            records.push(record);
        }
        debug!("{}: scanned {} rows", table, records.len());
        Ok(records)
    }

    /// Row count for a table.
    pub async fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }
}

/// Batch writer bound to one table of the embedded store.
pub struct SqliteTableWriter {
    pool: SqlitePool,
    table: String,
    columns: Vec<String>,
}

impl SqliteTableWriter {
    fn insert_sql(&self, row_count: usize) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let row = format!(
            "({})",
            vec!["?"; self.columns.len()].join(", ")
        );
        let values = vec![row; row_count].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(&self.table),
            cols,
            values
        )
    }

    fn rows_per_statement(&self) -> usize {
        (MAX_BIND_PARAMS / self.columns.len().max(1)).max(1)
    }
}

#[async_trait]
impl BatchWriter for SqliteTableWriter {
    fn table(&self) -> &str {
        &self.table
    }

    async fn delete_all(&self) -> Result<u64> {
        let sql = format!("DELETE FROM {}", quote_ident(&self.table));
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn write_batch(&self, rows: &[Vec<Value>]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for chunk in rows.chunks(self.rows_per_statement()) {
            let sql = self.insert_sql(chunk.len());
            let mut query = sqlx::query(&sql);
            for row in chunk {
                debug_assert_eq!(row.len(), self.columns.len());
                for value in row {
                    query = match value {
                        Value::Null => query.bind(None::<String>),
                        Value::Int(v) => query.bind(*v),
                        Value::Real(v) => query.bind(*v),
                        Value::Text(v) => query.bind(v.as_str()),
                    };
                }
            }
            written += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

/// Quote a SQLite identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_table() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        sqlx::query("CREATE TABLE items (id INTEGER, label TEXT, score REAL)")
            .execute(store.pool())
            .await
            .unwrap();
        store
    }

    fn row(id: i64, label: &str, score: f64) -> Vec<Value> {
        vec![Value::Int(id), Value::Text(label.into()), Value::Real(score)]
    }

    #[tokio::test]
    async fn test_missing_store_is_precondition() {
        let err = SqliteStore::open("/nonexistent/records.db").await.unwrap_err();
        assert!(matches!(err, MigrateError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_write_then_scan_round_trip() {
        let store = store_with_table().await;
        let writer = store.writer(
            "items",
            vec!["id".into(), "label".into(), "score".into()],
        );
        let written = writer
            .write_batch(&[row(1, "a", 0.5), row(2, "b", 1.5)])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let records = store.scan("items").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(records[0].get("label"), Some(&Value::Text("a".into())));
        assert_eq!(records[1].get("score"), Some(&Value::Real(1.5)));
        assert_eq!(store.row_count("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_all_replaces_prior_content() {
        let store = store_with_table().await;
        let writer = store.writer(
            "items",
            vec!["id".into(), "label".into(), "score".into()],
        );
        writer.write_batch(&[row(1, "old", 0.0)]).await.unwrap();
        assert_eq!(writer.delete_all().await.unwrap(), 1);
        assert_eq!(store.row_count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_null_values_round_trip() {
        let store = store_with_table().await;
        let writer = store.writer(
            "items",
            vec!["id".into(), "label".into(), "score".into()],
        );
        writer
            .write_batch(&[vec![Value::Int(1), Value::Null, Value::Null]])
            .await
            .unwrap();
        let records = store.scan("items").await.unwrap();
        assert_eq!(records[0].get("label"), Some(&Value::Null));
        assert_eq!(records[0].get("score"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_large_batch_spans_multiple_statements() {
        let store = store_with_table().await;
        let writer = store.writer(
            "items",
            vec!["id".into(), "label".into(), "score".into()],
        );
        // 999 / 3 = 333 rows per statement; 1000 rows forces four
        let rows: Vec<Vec<Value>> = (0..1000).map(|i| row(i, "x", 0.0)).collect();
        assert_eq!(writer.write_batch(&rows).await.unwrap(), 1000);
        assert_eq!(store.row_count("items").await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_insert_sql_shape() {
        let writer = SqliteTableWriter {
            pool: SqlitePool::connect_lazy("sqlite::memory:").unwrap(),
            table: "t".into(),
            columns: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            writer.insert_sql(2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?), (?, ?)"
        );
        assert_eq!(writer.rows_per_statement(), 499);
    }
}
