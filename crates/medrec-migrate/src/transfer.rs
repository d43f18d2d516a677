//! Inter-store transfer orchestrator.
//!
//! Moves the embedded store into the server store table by table, in
//! the configured dependency order. The transfer is schema-agnostic:
//! it reads the destination's column metadata and projects each source
//! row onto the columns the destination declares. After all tables
//! load, generated-id sequences are reset and row counts reconciled.

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::backup;
use crate::config::Config;
use crate::core::descriptor::descriptor_for;
use crate::core::Value;
use crate::error::{MigrateError, Result};
use crate::load::BatchLoader;
use crate::report::{RunSummary, TableReport, TableStage};
use crate::store::{PgStore, SqliteStore};
use crate::verify::{self, TableParity};

/// One transfer run: embedded store into the server store.
pub struct TransferRun {
    config: Config,
    source: SqliteStore,
    target: PgStore,
}

impl TransferRun {
    /// Check preconditions and connect both stores.
    ///
    /// An unreachable server or missing store file aborts here, before
    /// anything destructive happens.
    pub async fn new(config: Config) -> Result<Self> {
        let server = config.server.clone().ok_or_else(|| {
            MigrateError::Config("server configuration is required for transfer".into())
        })?;

        let source = SqliteStore::open(&config.store.path).await?;
        let target = PgStore::connect(&server).await.map_err(|e| {
            MigrateError::Precondition(format!("server store unreachable: {}", e))
        })?;

        Ok(Self {
            config,
            source,
            target,
        })
    }

    /// Run the transfer and report per-table outcomes including parity.
    pub async fn run(self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!("Starting transfer run: {}", run_id);

        // The embedded store is the authoritative copy; snapshot it
        // before the destination is replaced.
        let backup_path = backup::backup_store(
            &self.config.store.path,
            self.config.migration.backup_dir.as_deref(),
            started_at,
        )?;

        let mut tables = Vec::with_capacity(self.config.migration.tables.len());
        for table in &self.config.migration.tables {
            tables.push(self.transfer_table(table).await);
        }

        // Reconcile every table, including the ones that failed.
        let parities =
            verify::check_parity(&self.source, &self.target, &self.config.migration.tables).await;
        for parity in parities {
            if let Some(report) = tables.iter_mut().find(|r| r.table == parity.table) {
                report.source_count = parity.source_count;
                report.dest_count = parity.dest_count;
                let matched = parity.matches();
                report.parity = Some(matched);
                if report.stage == TableStage::Loaded {
                    report.stage = if matched {
                        TableStage::Verified
                    } else {
                        TableStage::Mismatch
                    };
                }
            }
        }

        let summary = RunSummary::new(
            "transfer",
            run_id,
            started_at,
            tables,
            Some(backup_path),
            None,
        );
        summary.log();
        Ok(summary)
    }

    /// Standalone parity check without touching any data.
    pub async fn verify(&self) -> Vec<TableParity> {
        verify::check_parity(&self.source, &self.target, &self.config.migration.tables).await
    }

    async fn transfer_table(&self, table: &str) -> TableReport {
        match self.try_transfer_table(table).await {
            Ok(report) => report,
            Err(e) => {
                error!("{}: transfer failed - {}", table, e);
                TableReport::failed(table, e.to_string())
            }
        }
    }

    async fn try_transfer_table(&self, table: &str) -> Result<TableReport> {
        info!("Transferring table: {}", table);

        let columns = self.target.columns(table).await?;
        if columns.is_empty() {
            return Err(MigrateError::load(
                table,
                "table does not exist in destination",
            ));
        }

        let records = self.source.scan(table).await?;

        let mut report = TableReport::new(table);
        let writer = self.target.writer(table, columns.clone());
        let mut loader = BatchLoader::new(&writer, self.config.migration.batch_capacity);

        report.stage = TableStage::Deleting;
        loader.begin().await?;

        report.stage = TableStage::Loading;
        for record in &records {
            report.attempted += 1;
            // Project onto the destination's columns: source fields the
            // destination does not declare are dropped, destination
            // columns the source lacks load as NULL.
            let row: Vec<Value> = columns
                .iter()
                .map(|col| record.get(&col.name).cloned().unwrap_or(Value::Null))
                .collect();
            loader.push(row).await?;
        }
        report.succeeded = loader.finish().await?;

        if let Some(desc) = descriptor_for(table) {
            if desc.generated_id.is_some() {
                report.stage = TableStage::SequenceReset;
                self.target.reset_sequence(desc).await?;
            }
        }

        report.stage = TableStage::Loaded;
        info!("{}: {} rows transferred", table, report.succeeded);
        Ok(report)
    }
}
