//! # medrec-migrate
//!
//! Clinical record migration engine. Moves structured records between
//! three representations:
//!
//! - **Import**: legacy XML exports into an embedded SQLite store,
//!   with per-record normalization and partial-failure tolerance
//! - **Transfer**: the embedded store into a server-grade PostgreSQL
//!   store, schema-agnostic, with row-count reconciliation
//!
//! Both runs share one pipeline shape: a source reader yields raw
//! records, a normalizer maps each to zero-or-one destination row, and
//! a batch loader replaces the destination table in bounded,
//! transactional batches. Derived state (the patient cache, sequence
//! watermarks, row-count parity) is rebuilt after bulk load.
//!
//! ## Example
//!
//! ```rust,no_run
//! use medrec_migrate::{Config, ImportRun};
//!
//! #[tokio::main]
//! async fn main() -> medrec_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let summary = ImportRun::new(config).await?.run().await?;
//!     println!("Import finished: {}", summary.verdict);
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod core;
pub mod error;
pub mod import;
pub mod load;
pub mod normalize;
pub mod report;
pub mod source;
pub mod store;
pub mod transfer;
pub mod verify;

// Re-exports for convenient access
pub use cache::PatientCache;
pub use config::{Config, MigrationConfig, ServerConfig, SourceConfig, StoreConfig};
pub use crate::core::{RawRecord, TableDescriptor, Value, CLINICAL_TABLES};
pub use error::{MigrateError, Result};
pub use import::ImportRun;
pub use load::BatchLoader;
pub use report::{RunSummary, RunVerdict, TableReport, TableStage};
pub use source::XmlSource;
pub use store::{BatchWriter, PgStore, SqliteStore};
pub use transfer::TransferRun;
pub use verify::TableParity;
