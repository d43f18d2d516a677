//! Post-load reconciliation.
//!
//! After every table has loaded in an inter-store run, the verifier
//! compares source and destination row counts table by table. Exact
//! equality is parity; anything else is a named table-level mismatch.
//! The sweep never halts: the report covers every table regardless of
//! individual failures. Sequence resets are the other reconciliation
//! duty and live on [`PgStore::reset_sequence`], driven by the same
//! declarative descriptors.

use tracing::{info, warn};

use crate::store::{PgStore, SqliteStore};

/// Row-count comparison for one table.
#[derive(Debug, Clone)]
pub struct TableParity {
    /// Table name.
    pub table: String,

    /// Source row count, if it could be read.
    pub source_count: Option<i64>,

    /// Destination row count, if it could be read.
    pub dest_count: Option<i64>,

    /// First error hit while counting, if any.
    pub error: Option<String>,
}

impl TableParity {
    /// True when both counts were read and agree exactly.
    #[must_use]
    pub fn matches(&self) -> bool {
        match (self.source_count, self.dest_count) {
            (Some(s), Some(d)) => s == d,
            _ => false,
        }
    }
}

/// Compare source and destination row counts for every table.
pub async fn check_parity(
    source: &SqliteStore,
    target: &PgStore,
    tables: &[String],
) -> Vec<TableParity> {
    let mut results = Vec::with_capacity(tables.len());

    for table in tables {
        let mut parity = TableParity {
            table: table.clone(),
            source_count: None,
            dest_count: None,
            error: None,
        };

        match source.row_count(table).await {
            Ok(count) => parity.source_count = Some(count),
            Err(e) => parity.error = Some(format!("source count failed: {}", e)),
        }
        match target.row_count(table).await {
            Ok(count) => parity.dest_count = Some(count),
            Err(e) => {
                if parity.error.is_none() {
                    parity.error = Some(format!("destination count failed: {}", e));
                }
            }
        }

        if parity.matches() {
            info!(
                "{}: {} rows (match)",
                table,
                parity.source_count.unwrap_or(0)
            );
        } else {
            warn!(
                "{}: source={:?} destination={:?} (MISMATCH)",
                table, parity.source_count, parity.dest_count
            );
        }

        results.push(parity);
    }

    results
}
