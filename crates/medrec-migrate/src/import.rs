//! XML import orchestrator.
//!
//! Moves the legacy XML exports into the embedded store, one table at
//! a time in dependency order: patients first, then the patient cache,
//! then visits, prescriptions and payments. A table that fails is
//! reported and skipped; it never blocks the tables after it.

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::backup;
use crate::cache::PatientCache;
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::load::BatchLoader;
use crate::normalize::{
    NormalizeContext, PatientNormalizer, PaymentNormalizer, PrescriptionNormalizer,
    RecordNormalizer, VisitNormalizer,
};
use crate::report::{RunSummary, TableReport, TableStage};
use crate::source::XmlSource;
use crate::store::SqliteStore;

/// One import run: XML exports into the embedded store.
#[derive(Debug)]
pub struct ImportRun {
    config: Config,
    store: SqliteStore,
}

impl ImportRun {
    /// Check preconditions and open the store.
    ///
    /// Every export file and the store itself must exist before any
    /// destructive step; a missing piece aborts the run here, with the
    /// destination untouched.
    pub async fn new(config: Config) -> Result<Self> {
        for table in ["patients", "visits", "prescriptions", "payments"] {
            let path = config
                .source
                .file_for(table)
                .expect("clinical tables all have export files");
            if !path.is_file() {
                return Err(MigrateError::Precondition(format!(
                    "export file not found: {}",
                    path.display()
                )));
            }
        }

        let store = SqliteStore::open(&config.store.path).await?;
        Ok(Self { config, store })
    }

    /// Run the import and report per-table outcomes.
    pub async fn run(self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!("Starting import run: {}", run_id);

        let backup_path = backup::backup_store(
            &self.config.store.path,
            self.config.migration.backup_dir.as_deref(),
            started_at,
        )?;

        let ctx = NormalizeContext::new(started_at.naive_utc());
        let mut tables = Vec::with_capacity(4);

        // Patients load first: payments join against them.
        tables.push(self.import_table(&PatientNormalizer, &ctx).await);

        let cache = PatientCache::load(&self.store).await?;
        let ctx = ctx.with_patients(&cache);

        tables.push(self.import_table(&VisitNormalizer, &ctx).await);
        tables.push(self.import_table(&PrescriptionNormalizer, &ctx).await);
        tables.push(self.import_table(&PaymentNormalizer, &ctx).await);

        let audit_copy = match &self.config.migration.audit_copy {
            Some(dest) => {
                backup::audit_copy(&self.config.store.path, dest)?;
                Some(dest.clone())
            }
            None => None,
        };

        let summary = RunSummary::new(
            "import",
            run_id,
            started_at,
            tables,
            Some(backup_path),
            audit_copy,
        );
        summary.log();
        Ok(summary)
    }

    async fn import_table(
        &self,
        normalizer: &dyn RecordNormalizer,
        ctx: &NormalizeContext<'_>,
    ) -> TableReport {
        let table = normalizer.table();
        match self.try_import_table(normalizer, ctx).await {
            Ok(report) => report,
            Err(e) => {
                error!("{}: import failed - {}", table, e);
                TableReport::failed(table, e.to_string())
            }
        }
    }

    async fn try_import_table(
        &self,
        normalizer: &dyn RecordNormalizer,
        ctx: &NormalizeContext<'_>,
    ) -> Result<TableReport> {
        let table = normalizer.table();
        let path = self
            .config
            .source
            .file_for(table)
            .expect("checked during construction");
        info!("Importing {} from {}", table, path.display());

        let source = XmlSource::open(&path, &self.config.source.record_element)?;
        let columns = normalizer.columns().iter().map(|c| c.to_string()).collect();
        let writer = self.store.writer(table, columns);

        let mut report = TableReport::new(table);
        let mut loader = BatchLoader::new(&writer, self.config.migration.batch_capacity);

        report.stage = TableStage::Deleting;
        loader.begin().await?;

        report.stage = TableStage::Loading;
        let sample_limit = self.config.migration.error_sample_limit;
        for record in source.records()? {
            let record = record?;
            report.attempted += 1;
            match normalizer.normalize(&record, ctx) {
                Ok(row) => loader.push(row).await?,
                Err(reject) => {
                    report.failed += 1;
                    if report.failed <= sample_limit {
                        tracing::warn!(
                            "{}: record {} rejected: {}",
                            table,
                            report.attempted,
                            reject
                        );
                    }
                }
            }
        }

        report.succeeded = loader.finish().await?;
        report.stage = TableStage::Loaded;
        info!(
            "{}: imported {} records, {} rejected",
            table, report.succeeded, report.failed
        );
        Ok(report)
    }
}
